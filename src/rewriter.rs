//! The per-reference state machine.
//!
//! Every discovered reference is resolved; excluded ones are left alone.
//! Resolved URLs are looked up in the [`Manifest`] so each distinct URL is
//! fetched once per run. Attributes are only rewritten in [`apply`], after
//! the caller has persisted the fetched bytes, and only for URLs whose local
//! file actually exists.
//!
//! [`apply`]: DocumentRewriter::apply

use indicatif::ProgressBar;
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

use crate::document::ResourceReference;
use crate::fetcher::{fetch, FetchFailure, HttpClient};
use crate::filename::derive_filename;
use crate::throttle::Throttle;
use crate::url_resolver::{resolve, Exclusion, Resolution, ResolvedUrl};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    /// The mirrored page itself; its file is written last.
    Document,
    Fetched,
    FetchFailed(FetchFailure),
    PersistFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub url: Url,
    pub filename: String,
    pub status: EntryStatus,
}

impl ManifestEntry {
    /// Whether references to this URL may point at the local file.
    pub fn is_local(&self) -> bool {
        matches!(self.status, EntryStatus::Document | EntryStatus::Fetched)
    }
}

/// Absolute URL to local filename mappings accumulated during one run.
#[derive(Debug, Default)]
pub struct Manifest {
    index: HashMap<Url, usize>,
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    fn contains(&self, url: &Url) -> bool {
        self.index.contains_key(url)
    }

    pub fn get(&self, url: &Url) -> Option<&ManifestEntry> {
        self.index.get(url).map(|&i| &self.entries[i])
    }

    /// First write wins; later inserts for the same URL are ignored.
    pub fn insert(&mut self, url: Url, filename: String, status: EntryStatus) {
        if self.index.contains_key(&url) {
            return;
        }
        self.index.insert(url.clone(), self.entries.len());
        self.entries.push(ManifestEntry {
            url,
            filename,
            status,
        });
    }

    pub fn set_status(&mut self, url: &Url, status: EntryStatus) {
        if let Some(&i) = self.index.get(url) {
            self.entries[i].status = status;
        }
    }

    pub fn local_filename(&self, url: &Url) -> Option<&str> {
        self.get(url)
            .filter(|entry| entry.is_local())
            .map(|entry| entry.filename.as_str())
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter()
    }
}

/// Fetched bytes waiting to be written under their derived filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalResource {
    pub url: Url,
    pub filename: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Disposition {
    Pending,
    Excluded(Exclusion),
    Resolved {
        url: Url,
        fragment: Option<String>,
        reused: bool,
    },
}

/// Per-reference tallies from [`DocumentRewriter::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteReport {
    pub rewritten: usize,
    /// Rewritten from an existing manifest entry without a new fetch.
    pub reused: usize,
    pub excluded: usize,
    pub unchanged: usize,
}

pub struct DocumentRewriter {
    base_url: Url,
    references: Vec<ResourceReference>,
    dispositions: Vec<Disposition>,
    manifest: Manifest,
}

impl DocumentRewriter {
    /// `requested_url` is what the user asked for and `final_url` is where
    /// the page was served from after redirects. Relative references resolve
    /// against `final_url`. Both are pre-registered under
    /// `document_filename` so references back to the page point at the local
    /// copy instead of refetching it.
    pub fn new(
        requested_url: &Url,
        final_url: &Url,
        document_filename: &str,
        references: Vec<ResourceReference>,
    ) -> Self {
        let mut manifest = Manifest::new();
        let mut base_url = final_url.clone();
        base_url.set_fragment(None);

        for page_url in [requested_url, final_url] {
            let mut page_url = page_url.clone();
            page_url.set_fragment(None);
            manifest.insert(page_url, document_filename.to_string(), EntryStatus::Document);
        }

        Self {
            base_url,
            dispositions: vec![Disposition::Pending; references.len()],
            references,
            manifest,
        }
    }

    pub fn references(&self) -> &[ResourceReference] {
        &self.references
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Resolves every reference in document order and fetches each distinct
    /// URL once, spacing requests with `throttle`.
    pub async fn fetch_resources<C>(
        &mut self,
        client: &C,
        throttle: &mut Throttle,
        progress: &ProgressBar,
    ) -> Vec<LocalResource>
    where
        C: HttpClient + ?Sized,
    {
        let mut resources = Vec::new();

        for i in 0..self.references.len() {
            let raw = self.references[i].raw.clone();
            progress.set_message(raw.clone());

            let disposition = match resolve(&raw, &self.base_url) {
                Resolution::Excluded(reason) => {
                    debug!("Excluded {:?}: {}", raw, reason);
                    Disposition::Excluded(reason)
                }
                Resolution::Fetchable(ResolvedUrl { url, fragment }) => {
                    let reused = self.manifest.contains(&url);
                    if reused {
                        debug!("Reusing manifest entry for {}", url);
                    } else if let Some(resource) = self.fetch_one(client, throttle, &url).await {
                        resources.push(resource);
                    }
                    Disposition::Resolved {
                        url,
                        fragment,
                        reused,
                    }
                }
            };

            self.dispositions[i] = disposition;
            progress.inc(1);
        }

        resources
    }

    async fn fetch_one<C>(&mut self, client: &C, throttle: &mut Throttle, url: &Url) -> Option<LocalResource>
    where
        C: HttpClient + ?Sized,
    {
        throttle.wait().await;
        debug!("Fetching {}", url);

        let filename = derive_filename(url);
        match fetch(client, url).await {
            Ok(fetched) => {
                debug!("Fetched {} ({} bytes) as {}", url, fetched.bytes.len(), filename);
                self.manifest
                    .insert(url.clone(), filename.clone(), EntryStatus::Fetched);
                Some(LocalResource {
                    url: url.clone(),
                    filename,
                    content: fetched.bytes,
                })
            }
            Err(failure) => {
                warn!("Failed to fetch {}: {}", url, failure);
                self.manifest
                    .insert(url.clone(), filename, EntryStatus::FetchFailed(failure));
                None
            }
        }
    }

    /// Marks a fetched resource whose file could not be written, so its
    /// references keep their original URL.
    pub fn record_persist_failure(&mut self, url: &Url, reason: String) {
        self.manifest
            .set_status(url, EntryStatus::PersistFailed(reason));
    }

    /// Writes local filenames into the document for every reference whose
    /// resource is available locally. Everything else keeps its original value.
    pub fn apply(&self) -> RewriteReport {
        let mut report = RewriteReport::default();

        for (reference, disposition) in self.references.iter().zip(&self.dispositions) {
            match disposition {
                Disposition::Pending => report.unchanged += 1,
                Disposition::Excluded(_) => report.excluded += 1,
                Disposition::Resolved {
                    url,
                    fragment,
                    reused,
                } => match self.manifest.local_filename(url) {
                    Some(filename) => {
                        let value = match fragment {
                            Some(fragment) => format!("{filename}#{fragment}"),
                            None => filename.to_string(),
                        };
                        reference.set_value(&value);
                        report.rewritten += 1;
                        if *reused {
                            report.reused += 1;
                        }
                    }
                    None => report.unchanged += 1,
                },
            }
        }

        report
    }
}
