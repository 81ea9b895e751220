use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ExplorerError;

/// Six-digit DANDI dataset identifier, e.g. "000563".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DandisetId(String);

impl DandisetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DandisetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DandisetId {
    type Err = ExplorerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let is_valid =
            normalized.len() == 6 && normalized.chars().all(|ch| ch.is_ascii_digit());
        if !is_valid {
            return Err(ExplorerError::InvalidDandisetId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Published dandiset version, e.g. "0.250311.2145", or the literal "draft".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionId(String);

impl VersionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VersionId {
    type Err = ExplorerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        if normalized == "draft" {
            return Ok(Self(normalized));
        }
        let is_valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_digit() || ch == '.');
        if !is_valid || normalized.split('.').any(str::is_empty) {
            return Err(ExplorerError::InvalidVersion(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Archive-assigned asset identifier (UUID-shaped in practice).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(String);

impl AssetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = ExplorerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        let is_valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_hexdigit() || ch == '-');
        if !is_valid {
            return Err(ExplorerError::InvalidAssetId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Numeric probe index embedded in acquisition key names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProbeIndex(pub u32);

impl ProbeIndex {
    /// Acquisition group name for this probe's LFP, e.g. "probe_0_lfp".
    pub fn lfp_key(&self) -> String {
        format!("probe_{}_lfp", self.0)
    }

    /// Electrical-series name inside the LFP group, e.g. "probe_0_lfp_data".
    pub fn lfp_data_key(&self) -> String {
        format!("probe_{}_lfp_data", self.0)
    }
}

impl fmt::Display for ProbeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Half-open row range plus a channel (column) selection.
///
/// Channel order is preserved as given and duplicates are allowed; bounds are
/// validated against a concrete series at materialization time, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub start: u64,
    pub end: u64,
    pub channels: Vec<usize>,
}

impl WindowSpec {
    pub fn new(start: u64, end: u64, channels: Vec<usize>) -> Result<Self, ExplorerError> {
        if start > end {
            return Err(ExplorerError::InvalidWindow(format!(
                "start {start} is after end {end}"
            )));
        }
        if channels.is_empty() {
            return Err(ExplorerError::InvalidWindow(
                "at least one channel index is required".to_string(),
            ));
        }
        Ok(Self {
            start,
            end,
            channels,
        })
    }

    pub fn row_count(&self) -> u64 {
        self.end - self.start
    }
}

/// Parses a comma-separated channel list, e.g. "0,10,20,30".
pub fn parse_channel_list(value: &str) -> Result<Vec<usize>, ExplorerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ExplorerError::InvalidChannels(value.to_string()));
    }
    trimmed
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| ExplorerError::InvalidChannels(value.to_string()))
        })
        .collect()
}

fn asset_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^sub-[^/]+/sub-[^/]+_ses-[^/]+_(probe-\d+_ecephys|ogen)\.nwb$")
            .expect("asset path regex")
    })
}

fn ecephys_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^sub-[^/]+/sub-[^/]+_ses-[^/]+_probe-\d+_ecephys\.nwb$")
            .expect("ecephys path regex")
    })
}

/// True when a path has the dandiset's session-file shape
/// (`sub-*/sub-*_ses-*_probe-*_ecephys.nwb` or `..._ogen.nwb`).
pub fn is_session_asset_path(path: &str) -> bool {
    asset_path_regex().is_match(path)
}

/// True for electrophysiology containers specifically (the ones holding LFP).
pub fn is_ecephys_asset_path(path: &str) -> bool {
    ecephys_path_regex().is_match(path)
}
