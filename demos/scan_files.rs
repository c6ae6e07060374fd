//! Scans files given on the command line as the attachments of one item.
//!
//! This demo shows how to:
//! - Load the task configuration from `CLAMAV_*` environment variables
//! - Run the ClamAV task through its `init`/`perform`/`finish` lifecycle
//! - Print the report a curation host would show
//!
//! Run with a daemon listening on 127.0.0.1:3310:
//!
//! ```text
//! CLAMAV_SCAN_FAILFAST=false RUST_LOG=clamstream=debug \
//!     cargo run --example scan_files -- 123456789/42 thesis.pdf data.zip
//! ```

use clamstream::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let handle = args
        .next()
        .ok_or("usage: scan_files <item-handle> <file>...")?;

    let mut item = CurationItem::new(handle);
    for (seq, path) in args.enumerate() {
        let name = std::path::Path::new(&path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        let label = ItemLabel::new(name).with_sequence_id(seq as u32 + 1);
        item = item.with_attachment(ScanRequest::new(label, ScanInput::from_path(path)));
    }

    let config = ClamScanConfig::from_env()?;
    println!("=== Scanning with clamd at {} ===\n", config.session.address);

    let mut task = ClamScanTask::from_config(&config)?;
    if let Err(e) = task.init().await {
        // perform reconnects on its own; report and carry on
        eprintln!("initial connect failed: {}", e);
    }

    let outcome = task.perform(item).await;
    task.finish().await;

    println!("Status: {}", outcome.status);
    println!("{}", outcome.result);

    if let Some(report) = task.last_report() {
        println!("\n=== Items ===");
        for entry in &report.items {
            let digest = entry
                .payload
                .as_ref()
                .map(|p| p.blake3.as_str())
                .unwrap_or("-");
            println!("  {} [{}] blake3={}", entry.label, entry.status.name(), digest);
        }
    }

    Ok(())
}
