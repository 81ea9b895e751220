use std::io::{self, Write};

use crate::metadata::UNKNOWN;
use crate::pipeline::{LfpOutcome, RunReport};

/// Writes the human-readable run summary. Field order mirrors the pipeline:
/// dandiset, listing, file, session, subject, probes, electrodes, LFP slice.
pub fn write_text<W: Write>(out: &mut W, report: &RunReport) -> io::Result<()> {
    writeln!(
        out,
        "Dandiset {} (version {})",
        report.dandiset_id, report.version
    )?;
    writeln!(out, "  name: {}", report.dandiset.name)?;
    if let Some(url) = &report.dandiset.url {
        writeln!(out, "  url: {url}")?;
    }
    if let Some(count) = report.dandiset.asset_count {
        writeln!(out, "  assets: {count}")?;
    }
    if let Some(description) = &report.dandiset.description {
        writeln!(out, "  description: {}", snippet(description, 500))?;
    }

    writeln!(out)?;
    writeln!(out, "First {} assets:", report.listing_prefix.len())?;
    for descriptor in &report.listing_prefix {
        writeln!(out, "  {} ({})", descriptor.path, descriptor.identifier)?;
    }

    writeln!(out)?;
    writeln!(out, "Selected asset: {}", report.asset.path)?;
    writeln!(out, "  size: {} bytes", report.file_size)?;

    writeln!(out)?;
    writeln!(out, "Session:")?;
    write_field(out, "description", report.session.session_description.as_deref())?;
    write_field(out, "session id", report.session.session_id.as_deref())?;
    write_field(out, "identifier", report.session.identifier.as_deref())?;
    write_field(out, "institution", report.session.institution.as_deref())?;

    writeln!(out)?;
    writeln!(out, "Subject:")?;
    write_field(out, "id", report.subject.subject_id.as_deref())?;
    write_field(out, "species", report.subject.species.as_deref())?;
    write_field(out, "genotype", report.subject.genotype.as_deref())?;
    write_field(out, "sex", report.subject.sex.as_deref())?;
    write_field(out, "age", report.subject.age.as_deref())?;
    write_field(out, "strain", report.subject.strain.as_deref())?;

    writeln!(out)?;
    writeln!(out, "Acquisition sections:")?;
    for key in &report.acquisition_keys {
        writeln!(out, "  {key}")?;
    }

    if !report.probes.is_empty() {
        writeln!(out)?;
        writeln!(out, "Probes:")?;
        for probe in &report.probes {
            let rate = probe
                .sampling_rate
                .map(|rate| format!("{rate} Hz"))
                .unwrap_or_else(|| UNKNOWN.to_string());
            writeln!(out, "  {} (sampling rate {rate})", probe.name)?;
        }
    }

    writeln!(out)?;
    writeln!(
        out,
        "Electrodes: {} channels, {} columns",
        report.electrodes.row_count,
        report.electrodes.colnames.len()
    )?;
    writeln!(out, "  columns: {}", report.electrodes.colnames.join(", "))?;
    if report.electrodes.matches_series_channels == Some(false) {
        writeln!(out, "  warning: channel count disagrees with the LFP series")?;
    }
    writeln!(out, "  channels by location:")?;
    for (location, count) in &report.electrodes.location_counts {
        writeln!(out, "    {location}: {count}")?;
    }
    for row in &report.electrodes.sample_rows {
        let imp = row
            .imp
            .map(|v| format!("{v}"))
            .unwrap_or_else(|| UNKNOWN.to_string());
        writeln!(
            out,
            "  [{}] {} group={} imp={imp}",
            row.index, row.location, row.group_name
        )?;
    }

    writeln!(out)?;
    match &report.lfp {
        LfpOutcome::Materialized(summary) => {
            writeln!(
                out,
                "LFP window: rows {}..{}, channels {:?}",
                summary.start_row, summary.end_row, summary.channels
            )?;
            if let (Some(first), Some(last)) =
                (summary.first_timestamp, summary.last_timestamp)
            {
                writeln!(out, "  time range: {first:.4} s .. {last:.4} s")?;
            }
            writeln!(out, "  unit: {}", summary.unit)?;
        }
        LfpOutcome::Missing { key, detail } => {
            writeln!(out, "LFP window: {key} not present in this file ({detail})")?;
        }
        LfpOutcome::Skipped => {
            writeln!(out, "LFP window: not requested")?;
        }
    }
    if let Some(path) = &report.plot_path {
        writeln!(out, "  plot written to {}", path.display())?;
    }

    writeln!(out)?;
    writeln!(out, "Finished at stage {:?} ({})", report.stage, report.generated_at)?;
    Ok(())
}

fn write_field<W: Write>(out: &mut W, label: &str, value: Option<&str>) -> io::Result<()> {
    writeln!(out, "  {label}: {}", value.unwrap_or(UNKNOWN))
}

/// First `limit` characters of a description, on char boundaries.
fn snippet(text: &str, limit: usize) -> String {
    let mut collected: String = text.chars().take(limit).collect();
    if collected.len() < text.len() {
        collected.push_str("...");
    }
    collected
}
