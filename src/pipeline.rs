use std::path::PathBuf;

use serde::Serialize;

use crate::archive::{ArchiveClient, AssetDescriptor, DandisetInfo};
use crate::container::Container;
use crate::domain::{is_ecephys_asset_path, DandisetId, ProbeIndex, VersionId, WindowSpec};
use crate::error::ExplorerError;
use crate::metadata::{
    self, channel_count_matches, ElectrodeRow, ProbeDescriptor, SessionInfo, SubjectInfo,
};
use crate::remote::RemoteOpener;
use crate::render::RenderContext;
use crate::window::WindowSummary;

pub const DEFAULT_ASSET_LIMIT: usize = 5;
pub const DEFAULT_ELECTRODE_SAMPLE: usize = 5;

/// How far a run got. Stages only move forward; a run that stops early
/// reports the last stage it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Unconnected,
    Connected,
    FileOpened,
    Parsed,
    MetadataExtracted,
    WindowMaterialized,
}

/// Everything one run needs up front. Validation of ids and the window spec
/// happens before construction, in the domain types.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub dandiset: DandisetId,
    pub version: VersionId,
    /// Explicit asset path; when absent the first electrophysiology asset in
    /// listing order is used.
    pub asset_path: Option<String>,
    /// How many listing entries to echo into the report.
    pub asset_limit: usize,
    pub probe: ProbeIndex,
    pub window: Option<WindowSpec>,
    pub plot: Option<PathBuf>,
    /// How many electrode rows to echo into the report.
    pub electrode_sample: usize,
}

impl RunOptions {
    pub fn new(dandiset: DandisetId, version: VersionId) -> Self {
        Self {
            dandiset,
            version,
            asset_path: None,
            asset_limit: DEFAULT_ASSET_LIMIT,
            probe: ProbeIndex::default(),
            window: None,
            plot: None,
            electrode_sample: DEFAULT_ELECTRODE_SAMPLE,
        }
    }
}

/// What happened to the LFP slice step.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LfpOutcome {
    /// Window materialized and summarized.
    Materialized(WindowSummary),
    /// The requested probe's sections are absent from this file. Metadata is
    /// still complete; only the slice and plot are skipped.
    Missing { key: String, detail: String },
    /// No window was requested.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ElectrodeReport {
    pub row_count: usize,
    pub colnames: Vec<String>,
    pub location_counts: Vec<(String, usize)>,
    pub sample_rows: Vec<ElectrodeRow>,
    /// False when the electrode table's row count disagrees with the series'
    /// channel count. Absent when no series was resolved.
    pub matches_series_channels: Option<bool>,
}

/// Full result of one exploration run, serializable for `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub dandiset_id: String,
    pub version: String,
    pub dandiset: DandisetInfo,
    pub listing_prefix: Vec<AssetDescriptor>,
    pub asset: AssetDescriptor,
    pub file_size: u64,
    pub session: SessionInfo,
    pub subject: SubjectInfo,
    pub acquisition_keys: Vec<String>,
    pub probes: Vec<ProbeDescriptor>,
    pub electrodes: ElectrodeReport,
    pub lfp: LfpOutcome,
    pub plot_path: Option<PathBuf>,
    pub generated_at: String,
    pub stage: PipelineStage,
}

/// Drives one run end to end: archive lookup, asset selection, remote open,
/// container parse, metadata extraction, then the optional window and plot.
pub struct Pipeline<A, O> {
    archive: A,
    opener: O,
}

impl<A: ArchiveClient, O: RemoteOpener> Pipeline<A, O> {
    pub fn new(archive: A, opener: O) -> Self {
        Self { archive, opener }
    }

    pub fn run(&self, options: &RunOptions) -> Result<RunReport, ExplorerError> {
        let dandiset = self
            .archive
            .get_dandiset(&options.dandiset, &options.version)?;
        tracing::info!(
            dandiset = %options.dandiset,
            version = %options.version,
            name = %dandiset.name,
            "connected to archive"
        );

        let (listing_prefix, asset) = self.select_asset(options)?;
        let url = asset.download_url();
        let file = self.opener.open(&url)?;
        tracing::info!(path = %asset.path, size = file.size(), "opened remote asset");
        let file_size = file.size();

        // Header and index only; bulk arrays stay remote.
        let mut container = Container::parse(file)?;

        let session = metadata::extract_session(&container);
        let subject = metadata::extract_subject(&container)?;
        let probes = metadata::extract_probes(&container)?;
        let acquisition_keys = container.group_keys(&["acquisition"])?;
        let electrode_table = metadata::extract_electrodes(&container)?;
        tracing::info!(
            acquisition = acquisition_keys.len(),
            electrodes = electrode_table.row_count(),
            "extracted metadata"
        );

        let lfp_key = options.probe.lfp_key();
        let lfp_data_key = options.probe.lfp_data_key();
        let series_path: [&str; 4] = [
            "acquisition",
            &lfp_key,
            "electrical_series",
            &lfp_data_key,
        ];
        // Absence of this probe's sections is an expected per-file condition,
        // not a failure of the run. Anything else propagates.
        let series = match container.series(&series_path) {
            Ok(series) => series,
            Err(ExplorerError::MissingSection(path)) => {
                tracing::warn!(key = %lfp_key, "probe sections absent, skipping slice");
                return Ok(self.finish_report(
                    options,
                    dandiset,
                    listing_prefix,
                    asset,
                    file_size,
                    session,
                    subject,
                    acquisition_keys,
                    probes,
                    electrode_report(&electrode_table, None, options.electrode_sample),
                    LfpOutcome::Missing {
                        key: lfp_key,
                        detail: format!("container section missing: {path}"),
                    },
                    None,
                    PipelineStage::MetadataExtracted,
                ));
            }
            Err(err) => return Err(err),
        };

        let electrodes = electrode_report(
            &electrode_table,
            Some(channel_count_matches(&electrode_table, &series)),
            options.electrode_sample,
        );

        let (lfp, plot_path, stage) = match &options.window {
            Some(spec) => {
                let window = container.window(&series, spec)?;
                tracing::info!(
                    rows = window.row_count(),
                    channels = window.channel_count(),
                    "materialized window"
                );
                let plot_path = match &options.plot {
                    Some(path) => {
                        RenderContext::new(path.clone()).render(&window)?;
                        Some(path.clone())
                    }
                    None => None,
                };
                (
                    LfpOutcome::Materialized(window.summary()),
                    plot_path,
                    PipelineStage::WindowMaterialized,
                )
            }
            None => (LfpOutcome::Skipped, None, PipelineStage::MetadataExtracted),
        };

        Ok(self.finish_report(
            options,
            dandiset,
            listing_prefix,
            asset,
            file_size,
            session,
            subject,
            acquisition_keys,
            probes,
            electrodes,
            lfp,
            plot_path,
            stage,
        ))
    }

    /// Walks the listing once: buffers the display prefix and picks either
    /// the explicitly requested path or the first electrophysiology asset.
    fn select_asset(
        &self,
        options: &RunOptions,
    ) -> Result<(Vec<AssetDescriptor>, AssetDescriptor), ExplorerError> {
        let mut prefix = Vec::new();
        let mut selected = None;
        for descriptor in self.archive.assets(&options.dandiset, &options.version)? {
            let descriptor = descriptor?;
            if prefix.len() < options.asset_limit {
                prefix.push(descriptor.clone());
            }
            if selected.is_none() {
                let matches = match &options.asset_path {
                    Some(path) => descriptor.path == *path,
                    None => is_ecephys_asset_path(&descriptor.path),
                };
                if matches {
                    selected = Some(descriptor);
                }
            }
            if selected.is_some() && prefix.len() >= options.asset_limit {
                break;
            }
        }
        let selected = selected.ok_or_else(|| {
            ExplorerError::AssetNotFound(
                options
                    .asset_path
                    .clone()
                    .unwrap_or_else(|| "no electrophysiology asset in listing".to_string()),
            )
        })?;
        Ok((prefix, selected))
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_report(
        &self,
        options: &RunOptions,
        dandiset: DandisetInfo,
        listing_prefix: Vec<AssetDescriptor>,
        asset: AssetDescriptor,
        file_size: u64,
        session: SessionInfo,
        subject: SubjectInfo,
        acquisition_keys: Vec<String>,
        probes: Vec<ProbeDescriptor>,
        electrodes: ElectrodeReport,
        lfp: LfpOutcome,
        plot_path: Option<PathBuf>,
        stage: PipelineStage,
    ) -> RunReport {
        RunReport {
            dandiset_id: options.dandiset.to_string(),
            version: options.version.to_string(),
            dandiset,
            listing_prefix,
            asset,
            file_size,
            session,
            subject,
            acquisition_keys,
            probes,
            electrodes,
            lfp,
            plot_path,
            generated_at: chrono::Utc::now().to_rfc3339(),
            stage,
        }
    }
}

fn electrode_report(
    table: &metadata::ElectrodeTable,
    matches_series_channels: Option<bool>,
    sample: usize,
) -> ElectrodeReport {
    ElectrodeReport {
        row_count: table.row_count(),
        colnames: table.colnames().to_vec(),
        location_counts: table.location_counts(),
        sample_rows: table.sample_rows(sample),
        matches_series_channels,
    }
}
