use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{DandisetId, ProbeIndex, VersionId, WindowSpec};
use crate::error::ExplorerError;
use crate::pipeline::{RunOptions, DEFAULT_ASSET_LIMIT, DEFAULT_ELECTRODE_SAMPLE};

/// On-disk shape of `lfpscope.json`. Everything except the dandiset id and
/// version is optional; defaults match the CLI's.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub dandiset: String,
    pub version: String,
    #[serde(default)]
    pub asset_path: Option<String>,
    #[serde(default)]
    pub asset_limit: Option<usize>,
    #[serde(default)]
    pub probe: Option<u32>,
    #[serde(default)]
    pub window: Option<WindowEntry>,
    #[serde(default)]
    pub plot: Option<PathBuf>,
    #[serde(default)]
    pub electrode_sample: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WindowEntry {
    pub start: u64,
    pub end: u64,
    pub channels: Vec<usize>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<RunOptions, ExplorerError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("lfpscope.json"),
        };

        if path.is_none() && !config_path.exists() {
            return Err(ExplorerError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ExplorerError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ExplorerError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<RunOptions, ExplorerError> {
        let dandiset: DandisetId = config.dandiset.parse()?;
        let version: VersionId = config.version.parse()?;
        let window = config
            .window
            .map(|entry| WindowSpec::new(entry.start, entry.end, entry.channels))
            .transpose()?;

        Ok(RunOptions {
            dandiset,
            version,
            asset_path: config.asset_path,
            asset_limit: config.asset_limit.unwrap_or(DEFAULT_ASSET_LIMIT),
            probe: config.probe.map(ProbeIndex).unwrap_or_default(),
            window,
            plot: config.plot,
            electrode_sample: config
                .electrode_sample
                .unwrap_or(DEFAULT_ELECTRODE_SAMPLE),
        })
    }
}
