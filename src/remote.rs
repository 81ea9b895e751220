use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_RANGE, RANGE, USER_AGENT};

use crate::error::ExplorerError;

/// Byte-range access to one remote asset. Implementations satisfy each call
/// with a single request; coalescing and caching live in [`RemoteFile`].
pub trait RangeTransport {
    fn content_length(&self) -> Result<u64, ExplorerError>;
    fn fetch(&self, offset: u64, len: usize) -> Result<Vec<u8>, ExplorerError>;
}

/// HTTP implementation backed by `Range:` requests against a download URL.
pub struct HttpRangeTransport {
    client: Client,
    url: String,
}

impl HttpRangeTransport {
    pub fn new(url: String) -> Result<Self, ExplorerError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("lfpscope/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ExplorerError::RemoteHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| ExplorerError::RemoteHttp(err.to_string()))?;
        Ok(Self { client, url })
    }
}

impl RangeTransport for HttpRangeTransport {
    /// Probes with a one-byte ranged request; a plain 200 means the server
    /// ignored the range header and would stream the whole file.
    fn content_length(&self) -> Result<u64, ExplorerError> {
        let response = self
            .client
            .get(&self.url)
            .header(RANGE, "bytes=0-0")
            .send()
            .map_err(|err| ExplorerError::RemoteHttp(err.to_string()))?;
        let status = response.status().as_u16();
        match status {
            206 => {
                let header = response
                    .headers()
                    .get(CONTENT_RANGE)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("");
                parse_content_range_total(header).ok_or_else(|| {
                    ExplorerError::RemoteHttp(format!("unparseable Content-Range: {header:?}"))
                })
            }
            200 => Err(ExplorerError::RangeUnsupported(format!(
                "server answered a ranged probe with status 200 for {}",
                self.url
            ))),
            _ => Err(ExplorerError::RemoteStatus {
                status,
                message: response.text().unwrap_or_else(|_| "range probe failed".into()),
            }),
        }
    }

    fn fetch(&self, offset: u64, len: usize) -> Result<Vec<u8>, ExplorerError> {
        let last = offset + len as u64 - 1;
        let response = self
            .client
            .get(&self.url)
            .header(RANGE, format!("bytes={offset}-{last}"))
            .send()
            .map_err(|err| ExplorerError::RemoteHttp(err.to_string()))?;
        let status = response.status().as_u16();
        match status {
            206 => {
                let body = response
                    .bytes()
                    .map_err(|err| ExplorerError::RemoteHttp(err.to_string()))?;
                Ok(body.to_vec())
            }
            200 => Err(ExplorerError::RangeUnsupported(format!(
                "server answered a ranged read with status 200 for {}",
                self.url
            ))),
            _ => Err(ExplorerError::RemoteStatus {
                status,
                message: response.text().unwrap_or_else(|_| "range read failed".into()),
            }),
        }
    }
}

/// Parses the total size out of a `Content-Range: bytes 0-0/10168076` header.
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    let (unit, rest) = header.trim().split_once(' ')?;
    if unit != "bytes" {
        return None;
    }
    let (_range, total) = rest.split_once('/')?;
    total.trim().parse().ok()
}

/// In-memory transport, used by tests and fixtures.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    bytes: Vec<u8>,
}

impl MemoryTransport {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl RangeTransport for MemoryTransport {
    fn content_length(&self) -> Result<u64, ExplorerError> {
        Ok(self.bytes.len() as u64)
    }

    fn fetch(&self, offset: u64, len: usize) -> Result<Vec<u8>, ExplorerError> {
        let start = offset as usize;
        let end = start.saturating_add(len).min(self.bytes.len());
        if start > self.bytes.len() {
            return Ok(Vec::new());
        }
        Ok(self.bytes[start..end].to_vec())
    }
}

/// Range-cache eviction policy. The per-run read volume is small, so the
/// default keeps everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    #[default]
    None,
}

/// Open, seekable view over one remote asset, fetching byte ranges on demand
/// and caching them. Exclusively owned by a pipeline run; dropping it closes
/// the stream.
#[derive(Debug)]
pub struct RemoteFile<T: RangeTransport> {
    transport: T,
    size: u64,
    cache: HashMap<(u64, usize), Vec<u8>>,
    policy: EvictionPolicy,
    fetches: u64,
}

impl<T: RangeTransport> RemoteFile<T> {
    pub fn open(transport: T) -> Result<Self, ExplorerError> {
        let size = transport.content_length()?;
        tracing::debug!(size, "opened remote file");
        Ok(Self {
            transport,
            size,
            cache: HashMap::new(),
            policy: EvictionPolicy::default(),
            fetches: 0,
        })
    }

    pub fn with_policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of transport fetches issued so far (cache misses only).
    pub fn fetch_count(&self) -> u64 {
        self.fetches
    }

    /// Reads `len` bytes at `offset`, from cache when a cached range covers
    /// the request, otherwise via exactly one transport fetch.
    pub fn read_range(&mut self, offset: u64, len: usize) -> Result<Vec<u8>, ExplorerError> {
        if len == 0 {
            return Ok(Vec::new());
        }
        if offset + len as u64 > self.size {
            return Err(ExplorerError::ReadPastEnd {
                offset,
                len,
                size: self.size,
            });
        }
        if let Some(hit) = self.cached_slice(offset, len) {
            return Ok(hit);
        }
        let bytes = self.transport.fetch(offset, len)?;
        self.fetches += 1;
        if bytes.len() != len {
            return Err(ExplorerError::ShortRead {
                offset,
                wanted: len,
                got: bytes.len(),
            });
        }
        tracing::trace!(offset, len, "fetched byte range");
        match self.policy {
            EvictionPolicy::None => {
                self.cache.insert((offset, len), bytes.clone());
            }
        }
        Ok(bytes)
    }

    fn cached_slice(&self, offset: u64, len: usize) -> Option<Vec<u8>> {
        if let Some(exact) = self.cache.get(&(offset, len)) {
            return Some(exact.clone());
        }
        for ((cached_offset, cached_len), bytes) in &self.cache {
            let cached_end = cached_offset + *cached_len as u64;
            if *cached_offset <= offset && offset + len as u64 <= cached_end {
                let start = (offset - cached_offset) as usize;
                return Some(bytes[start..start + len].to_vec());
            }
        }
        None
    }
}

/// Seam between the pipeline and the transport layer; production code opens
/// HTTP transports, tests substitute in-memory ones.
pub trait RemoteOpener {
    type Transport: RangeTransport;

    fn open(&self, url: &str) -> Result<RemoteFile<Self::Transport>, ExplorerError>;
}

pub struct HttpRemoteOpener;

impl RemoteOpener for HttpRemoteOpener {
    type Transport = HttpRangeTransport;

    fn open(&self, url: &str) -> Result<RemoteFile<HttpRangeTransport>, ExplorerError> {
        RemoteFile::open(HttpRangeTransport::new(url.to_string())?)
    }
}
