use indicatif::{ProgressBar, ProgressStyle};
use mime::Mime;
use tracing::{info, warn};
use url::Url;

use crate::config::MirrorConfig;
use crate::document::Document;
use crate::error::MirrorError;
use crate::fetcher::{fetch, HttpClient, ReqwestClient};
use crate::file_manager::FileManager;
use crate::filename::document_filename;
use crate::rewriter::DocumentRewriter;
use crate::summary::MirrorSummary;
use crate::throttle::Throttle;

/// The page to mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    url: Url,
}

impl PageRequest {
    pub fn parse(url: &str) -> Result<Self, MirrorError> {
        let parsed = Url::parse(url).map_err(|e| MirrorError::InvalidPageUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        match parsed.scheme() {
            "http" | "https" => Ok(Self { url: parsed }),
            other => Err(MirrorError::InvalidPageUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme {other:?}"),
            }),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

fn is_html(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.parse::<Mime>().ok())
        .is_some_and(|m| m.type_() == mime::TEXT && m.subtype() == mime::HTML)
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner} [{bar:30}] {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

/// Fetches one page, mirrors its resources and writes the snapshot.
pub struct PageMirror<C = ReqwestClient> {
    config: MirrorConfig,
    client: C,
}

impl PageMirror<ReqwestClient> {
    pub fn new(config: MirrorConfig) -> Result<Self, MirrorError> {
        let client = ReqwestClient::new(&config)?;
        Ok(Self { config, client })
    }
}

impl<C: HttpClient> PageMirror<C> {
    pub fn with_client(config: MirrorConfig, client: C) -> Self {
        Self { config, client }
    }

    /// Nothing is written unless the page itself was fetched and parsed.
    /// Resource failures are reported in the summary, never as an error.
    pub async fn run(&self, request: &PageRequest) -> Result<MirrorSummary, MirrorError> {
        let page_url = request.url();
        info!("Mirroring {} into {:?}", page_url, self.config.output_dir);

        let mut throttle = Throttle::new(self.config.politeness_delay);
        throttle.wait().await;
        let page = fetch(&self.client, page_url)
            .await
            .map_err(|source| MirrorError::PageFetch {
                url: page_url.to_string(),
                source,
            })?;

        let html = is_html(page.content_type.as_deref());
        if !html {
            warn!(
                "Page content type {:?} is not text/html; saving without extension",
                page.content_type
            );
        }
        let document_name = document_filename(page_url, html);

        if page.url != *page_url {
            info!("Page was served from {}", page.url);
        }

        let document = Document::parse(&page.bytes, page.content_type.as_deref()).map_err(|source| MirrorError::Parse {
            url: page_url.to_string(),
            source,
        })?;
        let references = document.references(&self.config.rules);
        info!("Found {} resource references", references.len());

        let progress = progress_bar(references.len(), self.config.show_progress);
        let mut rewriter = DocumentRewriter::new(page_url, &page.url, &document_name, references);
        let resources = rewriter
            .fetch_resources(&self.client, &mut throttle, &progress)
            .await;
        progress.finish_and_clear();

        let writer = FileManager::new(&self.config.output_dir);
        writer.prepare().map_err(|source| MirrorError::OutputDir {
            path: self.config.output_dir.clone(),
            source,
        })?;
        for failure in writer.save_resources(&resources) {
            rewriter.record_persist_failure(&failure.url, format!("{:#}", failure.error));
        }

        let report = rewriter.apply();
        let serialized = document.serialize().map_err(MirrorError::Serialize)?;
        let document_path = writer
            .save_document(&document_name, &serialized)
            .map_err(MirrorError::DocumentWrite)?;
        info!("Page cloned: {:?}", document_path);

        Ok(MirrorSummary::new(
            page_url.as_str(),
            document_path,
            rewriter.manifest(),
            &report,
        ))
    }
}
