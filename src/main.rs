use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use page_mirror::{MirrorCommand, PageMirror, PageRequest};

#[tokio::main]
async fn main() -> Result<()> {
    let args = MirrorCommand::parse();
    setup_logging(args.verbose, args.quiet);

    let request = PageRequest::parse(&args.url)?;
    let mirror = PageMirror::new(args.to_config())?;

    let summary = mirror
        .run(&request)
        .await
        .with_context(|| format!("Failed to mirror {}", args.url))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        summary.print_report();
    }

    Ok(())
}

fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("page_mirror=info,warn"),
            1 => EnvFilter::new("page_mirror=debug,info"),
            _ => EnvFilter::new("page_mirror=trace,debug"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
