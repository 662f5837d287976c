pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod fetcher;
pub mod file_manager;
pub mod filename;
pub mod mirror;
pub mod rewriter;
pub mod summary;
pub mod throttle;
pub mod url_resolver;

// Re-export main types for convenience
pub use cli::MirrorCommand;
pub use config::{MirrorConfig, ResourceRule, ResourceRules};
pub use document::{Document, ParseError, ResourceReference};
pub use error::MirrorError;
pub use fetcher::{fetch, FetchFailure, FetchOutcome, Fetched, HttpClient, HttpResponse, ReqwestClient, TransportError};
pub use file_manager::FileManager;
pub use filename::{derive_filename, document_filename};
pub use mirror::{PageMirror, PageRequest};
pub use rewriter::{DocumentRewriter, LocalResource, Manifest};
pub use summary::{FailureStage, MirrorSummary, ResourceFailure};
pub use url_resolver::{resolve, Exclusion, Resolution, ResolvedUrl};
