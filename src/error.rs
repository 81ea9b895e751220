use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Coarse failure classes used for exit codes and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Network,
    Io,
    Schema,
    OutOfRange,
    Usage,
}

#[derive(Debug, Error, Diagnostic)]
pub enum ExplorerError {
    #[error("invalid dandiset id: {0}")]
    InvalidDandisetId(String),

    #[error("invalid dandiset version: {0}")]
    InvalidVersion(String),

    #[error("invalid asset id: {0}")]
    InvalidAssetId(String),

    #[error("invalid channel list: {0}")]
    InvalidChannels(String),

    #[error("invalid window: {0}")]
    InvalidWindow(String),

    #[error("missing config file lfpscope.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("dandiset {id} version {version} not found")]
    DandisetNotFound { id: String, version: String },

    #[error("asset not found in listing: {0}")]
    AssetNotFound(String),

    #[error("archive request failed: {0}")]
    ArchiveHttp(String),

    #[error("archive returned status {status}: {message}")]
    ArchiveStatus { status: u16, message: String },

    #[error("remote read failed: {0}")]
    RemoteHttp(String),

    #[error("remote server returned status {status}: {message}")]
    RemoteStatus { status: u16, message: String },

    #[error("server does not support byte-range requests: {0}")]
    RangeUnsupported(String),

    #[error("read of {wanted} bytes at offset {offset} returned {got} bytes")]
    ShortRead {
        offset: u64,
        wanted: usize,
        got: usize,
    },

    #[error("read past end of file: offset {offset} + len {len} > size {size}")]
    ReadPastEnd { offset: u64, len: usize, size: u64 },

    #[error("container section missing: {0}")]
    MissingSection(String),

    #[error("container schema mismatch: {0}")]
    Schema(String),

    #[error("row range {start}..{end} is outside 0..{rows}")]
    RowRangeOutOfBounds { start: u64, end: u64, rows: u64 },

    #[error("column index {index} is outside 0..{cols}")]
    ColumnOutOfBounds { index: usize, cols: usize },

    #[error("render failed: {0}")]
    Render(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl ExplorerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExplorerError::InvalidDandisetId(_)
            | ExplorerError::InvalidVersion(_)
            | ExplorerError::InvalidAssetId(_)
            | ExplorerError::InvalidChannels(_)
            | ExplorerError::InvalidWindow(_)
            | ExplorerError::MissingConfig
            | ExplorerError::ConfigRead(_)
            | ExplorerError::ConfigParse(_) => ErrorKind::Usage,

            ExplorerError::DandisetNotFound { .. } | ExplorerError::AssetNotFound(_) => {
                ErrorKind::NotFound
            }

            ExplorerError::ArchiveHttp(_)
            | ExplorerError::ArchiveStatus { .. }
            | ExplorerError::RemoteHttp(_)
            | ExplorerError::RemoteStatus { .. } => ErrorKind::Network,

            ExplorerError::RangeUnsupported(_)
            | ExplorerError::ShortRead { .. }
            | ExplorerError::ReadPastEnd { .. }
            | ExplorerError::Render(_)
            | ExplorerError::Filesystem(_) => ErrorKind::Io,

            ExplorerError::MissingSection(_) | ExplorerError::Schema(_) => ErrorKind::Schema,

            ExplorerError::RowRangeOutOfBounds { .. } | ExplorerError::ColumnOutOfBounds { .. } => {
                ErrorKind::OutOfRange
            }
        }
    }
}
