use colored::*;
use serde::Serialize;
use std::path::PathBuf;

use crate::rewriter::{EntryStatus, Manifest, RewriteReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Fetch,
    Persist,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceFailure {
    pub url: String,
    pub stage: FailureStage,
    pub reason: String,
}

/// End-of-run report. Resource counts are per distinct URL; `excluded` and
/// `reused` count references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorSummary {
    pub page_url: String,
    pub document: PathBuf,
    pub succeeded: usize,
    pub failed: usize,
    pub excluded: usize,
    pub reused: usize,
    pub failures: Vec<ResourceFailure>,
}

impl MirrorSummary {
    pub fn new(page_url: &str, document: PathBuf, manifest: &Manifest, report: &RewriteReport) -> Self {
        let mut succeeded = 0;
        let mut failures = Vec::new();

        for entry in manifest.iter() {
            let (stage, reason) = match &entry.status {
                EntryStatus::Document => continue,
                EntryStatus::Fetched => {
                    succeeded += 1;
                    continue;
                }
                EntryStatus::FetchFailed(failure) => (FailureStage::Fetch, failure.to_string()),
                EntryStatus::PersistFailed(reason) => (FailureStage::Persist, reason.clone()),
            };
            failures.push(ResourceFailure {
                url: entry.url.to_string(),
                stage,
                reason,
            });
        }

        Self {
            page_url: page_url.to_string(),
            document,
            succeeded,
            failed: failures.len(),
            excluded: report.excluded,
            reused: report.reused,
            failures,
        }
    }

    pub fn print_report(&self) {
        println!("✅ Page mirrored: {}", self.page_url.blue());
        println!("📄 Document: {:?}", self.document);
        println!(
            "📦 Resources: {} saved, {} failed, {} excluded, {} reused",
            self.succeeded.to_string().green(),
            if self.failed > 0 {
                self.failed.to_string().red()
            } else {
                self.failed.to_string().normal()
            },
            self.excluded,
            self.reused
        );
        for failure in &self.failures {
            let stage = match failure.stage {
                FailureStage::Fetch => "fetch",
                FailureStage::Persist => "write",
            };
            println!("  {} {} ({} failed: {})", "⚠️".yellow(), failure.url, stage, failure.reason);
        }
    }
}
