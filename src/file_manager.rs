use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

use crate::rewriter::LocalResource;

/// A resource whose bytes could not be written.
#[derive(Debug)]
pub struct PersistFailure {
    pub url: Url,
    pub path: PathBuf,
    pub error: anyhow::Error,
}

/// Writes the mirror into one flat output directory.
#[derive(Debug, Clone)]
pub struct FileManager {
    base_dir: PathBuf,
}

impl FileManager {
    /// Does not touch the filesystem; see [`prepare`](Self::prepare).
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
        }
    }

    /// Creates the output directory if it is missing.
    pub fn prepare(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.base_dir)
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.base_dir.join(filename)
    }

    /// Whole-file write of `content` under `filename`.
    pub fn save_file(&self, filename: &str, content: &[u8]) -> Result<PathBuf> {
        let file_path = self.path_for(filename);

        let mut file = fs::File::create(&file_path)
            .with_context(|| format!("Failed to create file: {:?}", file_path))?;

        file.write_all(content)
            .with_context(|| format!("Failed to write to file: {:?}", file_path))?;

        Ok(file_path)
    }

    /// Writes every resource, carrying on past individual failures.
    pub fn save_resources(&self, resources: &[LocalResource]) -> Vec<PersistFailure> {
        let mut failures = Vec::new();

        for resource in resources {
            match self.save_file(&resource.filename, &resource.content) {
                Ok(path) => debug!("Saved {} to {:?}", resource.url, path),
                Err(error) => {
                    warn!("Failed to save {}: {:#}", resource.url, error);
                    failures.push(PersistFailure {
                        url: resource.url.clone(),
                        path: self.path_for(&resource.filename),
                        error,
                    });
                }
            }
        }

        failures
    }

    pub fn save_document(&self, filename: &str, html: &[u8]) -> Result<PathBuf> {
        self.save_file(filename, html)
            .with_context(|| format!("Failed to save document {}", filename))
    }
}
