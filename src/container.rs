use std::collections::BTreeMap;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::domain::WindowSpec;
use crate::error::ExplorerError;
use crate::remote::{RangeTransport, RemoteFile};
use crate::window::{self, MaterializedWindow};

/// File magic for the flattened container layout: a fixed header, a JSON
/// index describing the section tree, then a little-endian data segment
/// holding the bulk arrays.
pub const CONTAINER_MAGIC: &[u8; 4] = b"NWX1";
pub const CONTAINER_VERSION: u32 = 1;
pub const HEADER_LEN: u64 = 16;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDoc {
    pub root: IndexNode,
}

/// One named node in the container tree. Lookups always go through
/// [`Container::lookup`]/[`Container::require`] so absence is an explicit
/// result, never a panic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexNode {
    Group(GroupNode),
    Scalar(ScalarNode),
    Table(TableNode),
    Series(SeriesNode),
}

impl IndexNode {
    pub fn kind_name(&self) -> &'static str {
        match self {
            IndexNode::Group(_) => "group",
            IndexNode::Scalar(_) => "scalar",
            IndexNode::Table(_) => "table",
            IndexNode::Series(_) => "series",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupNode {
    pub children: BTreeMap<String, IndexNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalarNode {
    pub value: ScalarValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ScalarValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Float(value) => Some(*value),
            ScalarValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Int(value) => Some(*value),
            _ => None,
        }
    }
}

/// Row-indexed table with a fixed column-name contract. Column payloads are
/// small (one entry per channel) and travel inside the index document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableNode {
    pub colnames: Vec<String>,
    pub columns: BTreeMap<String, ColumnData>,
}

impl TableNode {
    pub fn row_count(&self) -> usize {
        self.colnames
            .first()
            .and_then(|name| self.columns.get(name))
            .map(ColumnData::len)
            .unwrap_or(0)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.get(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnData {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    /// Floats with nulls for unset entries (e.g. unmeasured impedance).
    Float(Vec<Option<f64>>),
    Str(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Bool(values) => values.len(),
            ColumnData::Int(values) => values.len(),
            ColumnData::Float(values) => values.len(),
            ColumnData::Str(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn str_at(&self, index: usize) -> Option<&str> {
        match self {
            ColumnData::Str(values) => values.get(index).map(String::as_str),
            _ => None,
        }
    }

    pub fn f64_at(&self, index: usize) -> Option<f64> {
        match self {
            ColumnData::Float(values) => values.get(index).copied().flatten(),
            ColumnData::Int(values) => values.get(index).map(|v| *v as f64),
            _ => None,
        }
    }

    pub fn i64_at(&self, index: usize) -> Option<i64> {
        match self {
            ColumnData::Int(values) => values.get(index).copied(),
            _ => None,
        }
    }

    pub fn bool_at(&self, index: usize) -> Option<bool> {
        match self {
            ColumnData::Bool(values) => values.get(index).copied(),
            _ => None,
        }
    }
}

/// Sample element type of a series' data segment. Timestamps are always f64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    F32,
    F64,
}

impl Dtype {
    pub fn size(&self) -> usize {
        match self {
            Dtype::F32 => 4,
            Dtype::F64 => 8,
        }
    }
}

/// Index entry for a two-dimensional time series: rows are samples, columns
/// are channels. Offsets are relative to the data segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesNode {
    pub rows: u64,
    pub cols: u64,
    pub dtype: Dtype,
    pub unit: String,
    pub data_offset: u64,
    pub timestamps_offset: u64,
    pub timestamps_len: u64,
}

/// Handle to one electrical series, with offsets resolved to absolute file
/// positions. Bulk data stays remote until a window is materialized.
#[derive(Debug, Clone)]
pub struct ElectricalSeries {
    pub rows: u64,
    pub cols: u64,
    pub dtype: Dtype,
    pub unit: String,
    pub data_offset: u64,
    pub timestamps_offset: u64,
}

/// Parsed view over a remote container: the index tree plus the byte stream
/// the bulk arrays are fetched from on demand.
#[derive(Debug)]
pub struct Container<T: RangeTransport> {
    file: RemoteFile<T>,
    root: IndexNode,
    data_base: u64,
}

impl<T: RangeTransport> Container<T> {
    /// Reads and validates the header and index. Bulk data is not touched.
    pub fn parse(mut file: RemoteFile<T>) -> Result<Self, ExplorerError> {
        if file.size() < HEADER_LEN {
            return Err(ExplorerError::Schema(format!(
                "file of {} bytes is too short for a container header",
                file.size()
            )));
        }
        let header = file.read_range(0, HEADER_LEN as usize)?;
        if &header[0..4] != CONTAINER_MAGIC {
            return Err(ExplorerError::Schema(format!(
                "bad magic {:02x?}, expected {:02x?}",
                &header[0..4],
                CONTAINER_MAGIC
            )));
        }
        let version = LittleEndian::read_u32(&header[4..8]);
        if version != CONTAINER_VERSION {
            return Err(ExplorerError::Schema(format!(
                "unsupported container version {version}"
            )));
        }
        let index_len = LittleEndian::read_u64(&header[8..16]);
        if HEADER_LEN + index_len > file.size() {
            return Err(ExplorerError::Schema(format!(
                "index of {index_len} bytes extends past end of file"
            )));
        }
        let index_bytes = file.read_range(HEADER_LEN, index_len as usize)?;
        let doc: IndexDoc = serde_json::from_slice(&index_bytes)
            .map_err(|err| ExplorerError::Schema(format!("malformed index: {err}")))?;
        let data_base = HEADER_LEN + index_len;
        validate_node(&doc.root, data_base, file.size(), &mut Vec::new())?;
        tracing::debug!(index_len, data_base, "parsed container index");
        Ok(Self {
            file,
            root: doc.root,
            data_base,
        })
    }

    pub fn root(&self) -> &IndexNode {
        &self.root
    }

    pub fn file(&self) -> &RemoteFile<T> {
        &self.file
    }

    /// Walks group children along `path`; `None` when any segment is absent.
    pub fn lookup(&self, path: &[&str]) -> Option<&IndexNode> {
        let mut node = &self.root;
        for segment in path {
            match node {
                IndexNode::Group(group) => {
                    node = group.children.get(*segment)?;
                }
                _ => return None,
            }
        }
        Some(node)
    }

    pub fn require(&self, path: &[&str]) -> Result<&IndexNode, ExplorerError> {
        self.lookup(path)
            .ok_or_else(|| ExplorerError::MissingSection(path.join("/")))
    }

    /// Child names of a group, in stored (sorted) order.
    pub fn group_keys(&self, path: &[&str]) -> Result<Vec<String>, ExplorerError> {
        match self.require(path)? {
            IndexNode::Group(group) => Ok(group.children.keys().cloned().collect()),
            other => Err(ExplorerError::Schema(format!(
                "expected group at {}, found {}",
                path.join("/"),
                other.kind_name()
            ))),
        }
    }

    pub fn scalar(&self, path: &[&str]) -> Option<&ScalarValue> {
        match self.lookup(path)? {
            IndexNode::Scalar(scalar) => Some(&scalar.value),
            _ => None,
        }
    }

    pub fn scalar_str(&self, path: &[&str]) -> Option<String> {
        self.scalar(path)?.as_str().map(str::to_string)
    }

    pub fn table(&self, path: &[&str]) -> Result<&TableNode, ExplorerError> {
        match self.require(path)? {
            IndexNode::Table(table) => Ok(table),
            other => Err(ExplorerError::Schema(format!(
                "expected table at {}, found {}",
                path.join("/"),
                other.kind_name()
            ))),
        }
    }

    /// Resolves a series node into a handle with absolute byte offsets.
    pub fn series(&self, path: &[&str]) -> Result<ElectricalSeries, ExplorerError> {
        match self.require(path)? {
            IndexNode::Series(series) => Ok(ElectricalSeries {
                rows: series.rows,
                cols: series.cols,
                dtype: series.dtype,
                unit: series.unit.clone(),
                data_offset: self.data_base + series.data_offset,
                timestamps_offset: self.data_base + series.timestamps_offset,
            }),
            other => Err(ExplorerError::Schema(format!(
                "expected series at {}, found {}",
                path.join("/"),
                other.kind_name()
            ))),
        }
    }

    /// Materializes a bounded window of `series`. Validation happens before
    /// any fetch; a valid request issues exactly one fetch for sample rows
    /// and one for timestamps.
    pub fn window(
        &mut self,
        series: &ElectricalSeries,
        spec: &WindowSpec,
    ) -> Result<MaterializedWindow, ExplorerError> {
        window::materialize(&mut self.file, series, spec)
    }
}

fn validate_node(
    node: &IndexNode,
    data_base: u64,
    file_size: u64,
    path: &mut Vec<String>,
) -> Result<(), ExplorerError> {
    match node {
        IndexNode::Group(group) => {
            for (name, child) in &group.children {
                path.push(name.clone());
                validate_node(child, data_base, file_size, path)?;
                path.pop();
            }
            Ok(())
        }
        IndexNode::Scalar(_) => Ok(()),
        IndexNode::Table(table) => {
            let rows = table.row_count();
            for name in &table.colnames {
                let column = table.columns.get(name).ok_or_else(|| {
                    ExplorerError::Schema(format!(
                        "table {} lists column {name} but has no data for it",
                        path.join("/")
                    ))
                })?;
                if column.len() != rows {
                    return Err(ExplorerError::Schema(format!(
                        "table {} column {name} has {} rows, expected {rows}",
                        path.join("/"),
                        column.len()
                    )));
                }
            }
            Ok(())
        }
        IndexNode::Series(series) => {
            if series.timestamps_len != series.rows {
                return Err(ExplorerError::Schema(format!(
                    "series {} has {} timestamps for {} rows",
                    path.join("/"),
                    series.timestamps_len,
                    series.rows
                )));
            }
            let data_end = data_base
                + series.data_offset
                + series.rows * series.cols * series.dtype.size() as u64;
            let ts_end = data_base + series.timestamps_offset + series.timestamps_len * 8;
            if data_end > file_size || ts_end > file_size {
                return Err(ExplorerError::Schema(format!(
                    "series {} extends past end of file",
                    path.join("/")
                )));
            }
            Ok(())
        }
    }
}
