use std::collections::BTreeMap;

use byteorder::{LittleEndian, WriteBytesExt};

use lfpscope::container::{
    ColumnData, Dtype, GroupNode, IndexDoc, IndexNode, ScalarNode, ScalarValue, SeriesNode,
    TableNode, CONTAINER_MAGIC, CONTAINER_VERSION,
};
use lfpscope::metadata::ELECTRODE_COLUMNS;

/// Assembles container byte streams for tests: bulk arrays are pushed first
/// (offsets come back relative to the data segment), then `finish` prepends
/// the header and index.
pub struct ContainerBuilder {
    data: Vec<u8>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn push_f32(&mut self, values: &[f32]) -> u64 {
        let offset = self.data.len() as u64;
        for &value in values {
            self.data.write_f32::<LittleEndian>(value).unwrap();
        }
        offset
    }

    pub fn push_f64(&mut self, values: &[f64]) -> u64 {
        let offset = self.data.len() as u64;
        for &value in values {
            self.data.write_f64::<LittleEndian>(value).unwrap();
        }
        offset
    }

    pub fn finish(self, root: IndexNode) -> Vec<u8> {
        let index = serde_json::to_vec(&IndexDoc { root }).unwrap();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(CONTAINER_MAGIC);
        bytes.write_u32::<LittleEndian>(CONTAINER_VERSION).unwrap();
        bytes
            .write_u64::<LittleEndian>(index.len() as u64)
            .unwrap();
        bytes.extend_from_slice(&index);
        bytes.extend_from_slice(&self.data);
        bytes
    }
}

pub fn group(children: Vec<(&str, IndexNode)>) -> IndexNode {
    IndexNode::Group(GroupNode {
        children: children
            .into_iter()
            .map(|(name, node)| (name.to_string(), node))
            .collect(),
    })
}

pub fn scalar_str(value: &str) -> IndexNode {
    IndexNode::Scalar(ScalarNode {
        value: ScalarValue::Str(value.to_string()),
    })
}

pub fn scalar_f64(value: f64) -> IndexNode {
    IndexNode::Scalar(ScalarNode {
        value: ScalarValue::Float(value),
    })
}

pub fn scalar_i64(value: i64) -> IndexNode {
    IndexNode::Scalar(ScalarNode {
        value: ScalarValue::Int(value),
    })
}

/// Electrode table with the full column contract and `rows` channels split
/// over a couple of anatomical locations.
pub fn electrode_table(rows: usize) -> IndexNode {
    let locations = ["APN", "LP", "DG-mo"];
    let mut columns: BTreeMap<String, ColumnData> = BTreeMap::new();
    columns.insert(
        "location".to_string(),
        ColumnData::Str(
            (0..rows)
                .map(|row| locations[row % locations.len()].to_string())
                .collect(),
        ),
    );
    columns.insert(
        "group".to_string(),
        ColumnData::Str(vec!["probeA".to_string(); rows]),
    );
    columns.insert(
        "group_name".to_string(),
        ColumnData::Str(vec!["probeA".to_string(); rows]),
    );
    columns.insert(
        "probe_vertical_position".to_string(),
        ColumnData::Float((0..rows).map(|row| Some(row as f64 * 20.0)).collect()),
    );
    columns.insert(
        "probe_horizontal_position".to_string(),
        ColumnData::Float(vec![Some(0.0); rows]),
    );
    columns.insert("probe_id".to_string(), ColumnData::Int(vec![0; rows]));
    columns.insert(
        "local_index".to_string(),
        ColumnData::Int((0..rows as i64).collect()),
    );
    columns.insert(
        "valid_data".to_string(),
        ColumnData::Bool(vec![true; rows]),
    );
    for name in ["x", "y", "z"] {
        columns.insert(name.to_string(), ColumnData::Float(vec![Some(1.0); rows]));
    }
    columns.insert("imp".to_string(), ColumnData::Float(vec![None; rows]));
    columns.insert(
        "filtering".to_string(),
        ColumnData::Str(vec!["0.1-500 Hz".to_string(); rows]),
    );
    IndexNode::Table(TableNode {
        colnames: ELECTRODE_COLUMNS.iter().map(|s| s.to_string()).collect(),
        columns,
    })
}

/// Complete container holding one probe's LFP: sample value at (row, col) is
/// `row * cols + col` as f32, timestamps step by 1/625 s.
pub fn lfp_fixture(probe: u32, rows: usize, cols: usize) -> Vec<u8> {
    let mut builder = ContainerBuilder::new();

    let samples: Vec<f32> = (0..rows * cols).map(|i| i as f32).collect();
    let data_offset = builder.push_f32(&samples);
    let timestamps: Vec<f64> = (0..rows).map(|row| row as f64 / 625.0).collect();
    let timestamps_offset = builder.push_f64(&timestamps);

    let series = IndexNode::Series(SeriesNode {
        rows: rows as u64,
        cols: cols as u64,
        dtype: Dtype::F32,
        unit: "volts".to_string(),
        data_offset,
        timestamps_offset,
        timestamps_len: rows as u64,
    });

    let lfp_key = format!("probe_{probe}_lfp");
    let data_key = format!("probe_{probe}_lfp_data");
    let root = group(vec![
        ("session_description", scalar_str("LFP data and trials")),
        ("identifier", scalar_str("ecephys_session_1290510496")),
        ("session_id", scalar_str("1290510496")),
        ("institution", scalar_str("Allen Institute")),
        (
            "subject",
            group(vec![
                ("subject_id", scalar_str("681446")),
                ("species", scalar_str("Mus musculus")),
                ("genotype", scalar_str("wt/wt")),
                ("sex", scalar_str("M")),
                ("age", scalar_str("P154D")),
                ("strain", scalar_str("C57BL6J")),
            ]),
        ),
        (
            "devices",
            group(vec![(
                "probeA",
                group(vec![
                    ("description", scalar_str("Neuropixels 1.0 Probe")),
                    ("manufacturer", scalar_str("imec")),
                    ("probe_id", scalar_i64(0)),
                    ("sampling_rate", scalar_f64(625.0)),
                ]),
            )]),
        ),
        ("electrodes", electrode_table(cols)),
        (
            "acquisition",
            group(vec![(
                lfp_key.as_str(),
                group(vec![(
                    "electrical_series",
                    group(vec![(data_key.as_str(), series)]),
                )]),
            )]),
        ),
    ]);

    builder.finish(root)
}
