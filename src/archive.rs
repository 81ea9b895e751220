use std::collections::VecDeque;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{AssetId, DandisetId, VersionId};
use crate::error::ExplorerError;

pub const DANDI_API_BASE: &str = "https://api.dandiarchive.org/api";

const PAGE_SIZE: usize = 100;

/// One file entry in a versioned dandiset, in archive listing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetDescriptor {
    pub path: String,
    pub identifier: AssetId,
}

impl AssetDescriptor {
    /// Direct download URL: fixed API base plus the asset identifier.
    pub fn download_url(&self) -> String {
        format!("{DANDI_API_BASE}/assets/{}/download/", self.identifier)
    }
}

/// Dandiset-level metadata shown at the top of the report.
#[derive(Debug, Clone, Serialize)]
pub struct DandisetInfo {
    pub name: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub asset_count: Option<u64>,
}

/// Lazy, finite, non-restartable asset sequence. Consumers are expected to
/// take a bounded prefix rather than force the whole listing.
pub type AssetStream<'a> =
    Box<dyn Iterator<Item = Result<AssetDescriptor, ExplorerError>> + 'a>;

pub trait ArchiveClient: Send + Sync {
    fn get_dandiset(
        &self,
        id: &DandisetId,
        version: &VersionId,
    ) -> Result<DandisetInfo, ExplorerError>;

    fn assets<'a>(
        &'a self,
        id: &DandisetId,
        version: &VersionId,
    ) -> Result<AssetStream<'a>, ExplorerError>;
}

#[derive(Clone)]
pub struct DandiHttpClient {
    client: Client,
    base_url: String,
}

impl DandiHttpClient {
    pub fn new() -> Result<Self, ExplorerError> {
        Self::with_base_url(DANDI_API_BASE.to_string())
    }

    pub fn with_base_url(base_url: String) -> Result<Self, ExplorerError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("lfpscope/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ExplorerError::ArchiveHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| ExplorerError::ArchiveHttp(err.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn version_info_url(&self, id: &DandisetId, version: &VersionId) -> String {
        format!(
            "{}/dandisets/{}/versions/{}/info/",
            self.base_url, id, version
        )
    }

    fn assets_url(&self, id: &DandisetId, version: &VersionId) -> String {
        format!(
            "{}/dandisets/{}/versions/{}/assets/?page_size={PAGE_SIZE}",
            self.base_url, id, version
        )
    }

    fn get_json(
        &self,
        url: &str,
        id: &DandisetId,
        version: &VersionId,
    ) -> Result<Value, ExplorerError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| ExplorerError::ArchiveHttp(err.to_string()))?;
        let status = response.status();
        if status.as_u16() == 404 {
            return Err(ExplorerError::DandisetNotFound {
                id: id.to_string(),
                version: version.to_string(),
            });
        }
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "archive request failed".to_string());
            return Err(ExplorerError::ArchiveStatus {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .map_err(|err| ExplorerError::ArchiveHttp(err.to_string()))
    }
}

impl ArchiveClient for DandiHttpClient {
    fn get_dandiset(
        &self,
        id: &DandisetId,
        version: &VersionId,
    ) -> Result<DandisetInfo, ExplorerError> {
        let url = self.version_info_url(id, version);
        let raw = self.get_json(&url, id, version)?;
        Ok(parse_dandiset_info(&raw))
    }

    fn assets<'a>(
        &'a self,
        id: &DandisetId,
        version: &VersionId,
    ) -> Result<AssetStream<'a>, ExplorerError> {
        Ok(Box::new(AssetPages {
            client: self,
            id: id.clone(),
            version: version.clone(),
            next_url: Some(self.assets_url(id, version)),
            buffered: VecDeque::new(),
        }))
    }
}

/// Follows the archive's `next` links one page at a time.
struct AssetPages<'a> {
    client: &'a DandiHttpClient,
    id: DandisetId,
    version: VersionId,
    next_url: Option<String>,
    buffered: VecDeque<AssetDescriptor>,
}

impl Iterator for AssetPages<'_> {
    type Item = Result<AssetDescriptor, ExplorerError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(descriptor) = self.buffered.pop_front() {
                return Some(Ok(descriptor));
            }
            let url = self.next_url.take()?;
            let raw = match self.client.get_json(&url, &self.id, &self.version) {
                Ok(raw) => raw,
                Err(err) => return Some(Err(err)),
            };
            match parse_asset_page(&raw) {
                Ok((descriptors, next)) => {
                    tracing::debug!(count = descriptors.len(), "fetched asset page");
                    self.buffered.extend(descriptors);
                    self.next_url = next;
                    if self.buffered.is_empty() && self.next_url.is_none() {
                        return None;
                    }
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct AssetPage {
    next: Option<String>,
    results: Vec<AssetRecord>,
}

#[derive(Debug, Deserialize)]
struct AssetRecord {
    asset_id: String,
    path: String,
}

/// Parses one page of the asset listing into descriptors plus the next link.
pub fn parse_asset_page(
    raw: &Value,
) -> Result<(Vec<AssetDescriptor>, Option<String>), ExplorerError> {
    let page: AssetPage = serde_json::from_value(raw.clone())
        .map_err(|err| ExplorerError::ArchiveHttp(format!("malformed asset page: {err}")))?;
    let descriptors = page
        .results
        .into_iter()
        .map(|record| {
            Ok(AssetDescriptor {
                path: record.path,
                identifier: record.asset_id.parse()?,
            })
        })
        .collect::<Result<Vec<_>, ExplorerError>>()?;
    Ok((descriptors, page.next))
}

/// Pulls the display fields out of the version info payload; everything is
/// optional except the name.
pub fn parse_dandiset_info(raw: &Value) -> DandisetInfo {
    let name = raw
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    let metadata = raw.get("metadata");
    let url = metadata
        .and_then(|m| m.get("url"))
        .and_then(|v| v.as_str())
        .map(|v| v.to_string());
    let description = metadata
        .and_then(|m| m.get("description"))
        .and_then(|v| v.as_str())
        .map(|v| v.to_string());
    let asset_count = raw.get("asset_count").and_then(|v| v.as_u64());
    DandisetInfo {
        name,
        url,
        description,
        asset_count,
    }
}
