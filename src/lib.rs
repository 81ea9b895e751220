//! Remote exploration of DANDI electrophysiology datasets: archive lookup,
//! byte-range access to one container file, metadata extraction, and bounded
//! LFP window materialization.

pub mod archive;
pub mod config;
pub mod container;
pub mod domain;
pub mod error;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod remote;
pub mod render;
pub mod report;
pub mod window;

pub use error::{ErrorKind, ExplorerError};
