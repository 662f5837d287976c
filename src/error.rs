use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::document::ParseError;
use crate::fetcher::FetchFailure;

/// Conditions that abort a mirror run.
///
/// Resource-level problems never show up here: they are recorded in the
/// [`MirrorSummary`](crate::summary::MirrorSummary) and the run continues.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("invalid page URL {url:?}: {reason}")]
    InvalidPageUrl { url: String, reason: String },

    #[error("failed to fetch page {url}: {source}")]
    PageFetch {
        url: String,
        #[source]
        source: FetchFailure,
    },

    #[error("failed to parse page {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: ParseError,
    },

    #[error("failed to prepare output directory {path:?}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize rewritten document: {0}")]
    Serialize(#[source] io::Error),

    #[error("failed to write document: {0:#}")]
    DocumentWrite(anyhow::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
