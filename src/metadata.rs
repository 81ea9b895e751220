use serde::Serialize;

use crate::container::{ColumnData, Container, ElectricalSeries, IndexNode, TableNode};
use crate::error::ExplorerError;
use crate::remote::RangeTransport;

/// The electrode table's fixed column contract. Files that omit any of these
/// are rejected as schema mismatches.
pub const ELECTRODE_COLUMNS: [&str; 13] = [
    "location",
    "group",
    "group_name",
    "probe_vertical_position",
    "probe_horizontal_position",
    "probe_id",
    "local_index",
    "valid_data",
    "x",
    "y",
    "z",
    "imp",
    "filtering",
];

pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_description: Option<String>,
    pub session_id: Option<String>,
    pub identifier: Option<String>,
    pub institution: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectInfo {
    pub subject_id: Option<String>,
    pub species: Option<String>,
    pub genotype: Option<String>,
    pub sex: Option<String>,
    pub age: Option<String>,
    pub strain: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub manufacturer: Option<String>,
    pub probe_id: Option<i64>,
    pub sampling_rate: Option<f64>,
}

/// One channel's static metadata, display-ready. `imp` stays optional so an
/// unmeasured impedance renders as "unknown" rather than a number.
#[derive(Debug, Clone, Serialize)]
pub struct ElectrodeRow {
    pub index: usize,
    pub location: String,
    pub group_name: String,
    pub probe_vertical_position: Option<f64>,
    pub probe_horizontal_position: Option<f64>,
    pub probe_id: Option<i64>,
    pub local_index: Option<i64>,
    pub valid_data: Option<bool>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub imp: Option<f64>,
    pub filtering: String,
}

/// Read-only view over the container's electrode table.
#[derive(Debug, Clone)]
pub struct ElectrodeTable {
    table: TableNode,
}

impl ElectrodeTable {
    /// Validates the fixed column contract before handing out a view.
    pub fn from_table(table: &TableNode) -> Result<Self, ExplorerError> {
        for name in ELECTRODE_COLUMNS {
            if table.column(name).is_none() {
                return Err(ExplorerError::Schema(format!(
                    "electrode table is missing column {name}"
                )));
            }
        }
        Ok(Self {
            table: table.clone(),
        })
    }

    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    pub fn colnames(&self) -> &[String] {
        &self.table.colnames
    }

    pub fn row(&self, index: usize) -> Option<ElectrodeRow> {
        if index >= self.row_count() {
            return None;
        }
        let col = |name: &str| self.table.column(name);
        Some(ElectrodeRow {
            index,
            location: str_or_unknown(col("location"), index),
            group_name: str_or_unknown(col("group_name"), index),
            probe_vertical_position: col("probe_vertical_position")
                .and_then(|c| c.f64_at(index)),
            probe_horizontal_position: col("probe_horizontal_position")
                .and_then(|c| c.f64_at(index)),
            probe_id: col("probe_id").and_then(|c| c.i64_at(index)),
            local_index: col("local_index").and_then(|c| c.i64_at(index)),
            valid_data: col("valid_data").and_then(|c| c.bool_at(index)),
            x: col("x").and_then(|c| c.f64_at(index)),
            y: col("y").and_then(|c| c.f64_at(index)),
            z: col("z").and_then(|c| c.f64_at(index)),
            imp: col("imp").and_then(|c| c.f64_at(index)).filter(|v| !v.is_nan()),
            filtering: str_or_unknown(col("filtering"), index),
        })
    }

    pub fn sample_rows(&self, count: usize) -> Vec<ElectrodeRow> {
        (0..self.row_count().min(count))
            .filter_map(|index| self.row(index))
            .collect()
    }

    /// Channel counts grouped by anatomical location, in first-seen order.
    /// Counts are exact: they sum to the table's row count.
    pub fn location_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for index in 0..self.row_count() {
            let location = str_or_unknown(self.table.column("location"), index);
            match counts.iter_mut().find(|(name, _)| *name == location) {
                Some((_, count)) => *count += 1,
                None => counts.push((location, 1)),
            }
        }
        counts
    }
}

fn str_or_unknown(column: Option<&ColumnData>, index: usize) -> String {
    column
        .and_then(|c| c.str_at(index))
        .unwrap_or(UNKNOWN)
        .to_string()
}

pub fn extract_session<T: RangeTransport>(container: &Container<T>) -> SessionInfo {
    SessionInfo {
        session_description: container.scalar_str(&["session_description"]),
        session_id: container.scalar_str(&["session_id"]),
        identifier: container.scalar_str(&["identifier"]),
        institution: container.scalar_str(&["institution"]),
    }
}

pub fn extract_subject<T: RangeTransport>(
    container: &Container<T>,
) -> Result<SubjectInfo, ExplorerError> {
    container.require(&["subject"])?;
    let field = |name: &str| container.scalar_str(&["subject", name]);
    Ok(SubjectInfo {
        subject_id: field("subject_id"),
        species: field("species"),
        genotype: field("genotype"),
        sex: field("sex"),
        age: field("age"),
        strain: field("strain"),
    })
}

pub fn extract_probes<T: RangeTransport>(
    container: &Container<T>,
) -> Result<Vec<ProbeDescriptor>, ExplorerError> {
    let Some(IndexNode::Group(devices)) = container.lookup(&["devices"]) else {
        return Ok(Vec::new());
    };
    let mut probes = Vec::new();
    for name in devices.children.keys() {
        let field = |field: &str| container.scalar(&["devices", name.as_str(), field]);
        probes.push(ProbeDescriptor {
            name: name.clone(),
            description: field("description").and_then(|v| v.as_str()).map(str::to_string),
            manufacturer: field("manufacturer")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            probe_id: field("probe_id").and_then(|v| v.as_i64()),
            sampling_rate: field("sampling_rate").and_then(|v| v.as_f64()),
        });
    }
    Ok(probes)
}

pub fn extract_electrodes<T: RangeTransport>(
    container: &Container<T>,
) -> Result<ElectrodeTable, ExplorerError> {
    ElectrodeTable::from_table(container.table(&["electrodes"])?)
}

/// The electrode table describes one row per recording channel, so its row
/// count must match the series' column count for the same probe.
pub fn channel_count_matches(table: &ElectrodeTable, series: &ElectricalSeries) -> bool {
    table.row_count() as u64 == series.cols
}
