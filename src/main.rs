// Scan a single site from the command line and print the result record.
//
// Usage: bannerscan <site_url> [worker_id]
//
// The external job queue normally drives `scan_site`; this binary covers
// one-off scans and dependency refreshes (`bannerscan --update-deps`).

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use bannerscan::{RetryScan, ScanMeta, ScanOptions, ScanResult, scan_site, update_dependencies};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(first) = args.next() else {
        eprintln!("usage: bannerscan <site_url> [worker_id] | bannerscan --update-deps");
        std::process::exit(2);
    };

    let mut options = ScanOptions::default();
    if let Ok(storage_path) = std::env::var("BANNERSCAN_STORAGE") {
        options = ScanOptions::builder().storage_path(storage_path).build();
    }

    if first == "--update-deps" {
        update_dependencies(&options).await?;
        return Ok(());
    }

    let worker_id: u16 = args.next().and_then(|arg| arg.parse().ok()).unwrap_or(0);
    let meta = ScanMeta {
        worker_id,
        is_first_try: true,
    };
    let mut result = ScanResult::new(first);

    if let Err(err) = scan_site(&mut result, &meta, &options).await {
        if let Some(retry) = err.downcast_ref::<RetryScan>() {
            eprintln!("retryable: {retry}");
            std::process::exit(75);
        }
        return Err(err);
    }

    println!("{}", serde_json::to_string_pretty(result.values())?);
    for file in result.files() {
        eprintln!("attachment: {} ({} bytes)", file.filename, file.contents.len());
    }
    Ok(())
}
