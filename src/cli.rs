use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    MirrorConfig, ResourceRule, ResourceRules, DEFAULT_DELAY_MS, DEFAULT_OUTPUT_DIR,
    DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};

#[derive(Parser, Debug)]
#[command(
    name = "page-mirror",
    about = "A CLI utility to snapshot a single web page for offline browsing",
    version,
    long_about = "Downloads one page together with its images, stylesheets and scripts, rewrites the page to reference the local copies and stores everything in a flat output directory."
)]
pub struct MirrorCommand {
    /// The URL of the page to mirror
    #[arg(required = true)]
    pub url: String,

    /// Output directory for the mirrored page
    #[arg(short, long, visible_alias = "save-dir", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Minimum delay between requests in milliseconds
    #[arg(long, default_value_t = DEFAULT_DELAY_MS)]
    pub delay_ms: u64,

    /// Timeout for requests in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// User agent string to use for requests
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Report redirects as failures instead of following them
    #[arg(long)]
    pub no_follow_redirects: bool,

    /// Also mirror <video>, <audio> and <iframe> sources
    #[arg(long)]
    pub include_media: bool,

    /// Extra resource rule as TAG:ATTR (repeatable), e.g. --resource source:src
    #[arg(long = "resource", value_name = "TAG:ATTR")]
    pub resources: Vec<ResourceRule>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl MirrorCommand {
    pub fn to_config(&self) -> MirrorConfig {
        let mut rules = if self.include_media {
            ResourceRules::with_media()
        } else {
            ResourceRules::standard()
        };
        for rule in &self.resources {
            rules.push(rule.clone());
        }

        MirrorConfig {
            output_dir: self.output_dir.clone(),
            politeness_delay: Duration::from_millis(self.delay_ms),
            request_timeout: Duration::from_secs(self.timeout),
            user_agent: self.user_agent.clone(),
            follow_redirects: !self.no_follow_redirects,
            rules,
            show_progress: !self.quiet && !self.json && self.verbose == 0,
        }
    }
}
