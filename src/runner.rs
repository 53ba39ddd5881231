//! The job entry point: run one site scan inside a scoped browser
//! acquisition and classify failures into retry/no-retry outcomes.

use std::io::Write;

use tracing::{error, info};

use crate::browser::ScanBrowser;
use crate::config::ScanOptions;
use crate::error::RetryScan;
use crate::results::ScanResult;
use crate::scanner::PageScanner;

/// Scheduling metadata handed down by the external job queue.
#[derive(Debug, Clone, Copy)]
pub struct ScanMeta {
    pub worker_id: u16,
    pub is_first_try: bool,
}

/// Scan one site. `result` must contain `site_url`.
///
/// On the first try, every terminal browser condition is raised as a
/// [`RetryScan`] (downcastable from the returned error) so the queue can
/// reschedule. On later tries the condition is recorded under
/// `chrome_error` and the call returns normally; `reachable` always ends
/// up consistent with it.
pub async fn scan_site(
    result: &mut ScanResult,
    meta: &ScanMeta,
    options: &ScanOptions,
) -> anyhow::Result<()> {
    let site_url = result
        .string("site_url")
        .ok_or_else(|| anyhow::anyhow!("result is missing site_url"))?;

    let browser = match ScanBrowser::launch(meta.worker_id, options).await {
        Ok(browser) => browser,
        Err(err) => {
            if meta.is_first_try {
                return Err(RetryScan::new(format!("Chrome startup problem: {err}")).into());
            }
            error!("browser startup failed: {err}");
            record_outcome(result, err.chrome_error(false).map(|c| c.as_str()));
            return Ok(());
        }
    };

    let mut scanner = PageScanner::new(options.clone());
    let scan_outcome = scanner.scan(&browser, result).await;
    let interacted = scanner.interacted() || result.contains_key("initial_result");
    browser.shutdown().await;

    let chrome_error = match scan_outcome {
        Ok(()) => result.string("chrome_error"),
        Err(err) => {
            if meta.is_first_try && err.is_retryable(interacted) {
                return Err(RetryScan::new(err.to_string()).into());
            }
            match err.chrome_error(interacted) {
                Some(code) => {
                    error!("scan of {site_url} failed: {err}");
                    Some(code.as_str().to_string())
                }
                None => return Err(err.into()),
            }
        }
    };
    record_outcome(result, chrome_error.as_deref());

    if options.save_logs()
        && let Err(err) = write_scan_log(result, &site_url)
    {
        error!("failed to write scan log: {err}");
    }
    Ok(())
}

fn record_outcome(result: &mut ScanResult, chrome_error: Option<&str>) {
    result.insert("chrome_error", chrome_error);
    result.insert("reachable", chrome_error.is_none());
}

/// Lower-cased, dash-separated form of a URL for filenames.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash && !slug.is_empty() {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Short stable hash so scans of the same site do not collide on filename.
pub fn short_hash(text: &str) -> String {
    let digest = xxhash_rust::xxh3::xxh3_64(text.as_bytes());
    format!("{digest:016x}")[..10].to_string()
}

/// Append a compact scan summary to `$HOME/cookiebanner_logs/<slug>_<hash>`.
fn write_scan_log(result: &ScanResult, site_url: &str) -> std::io::Result<()> {
    let Some(home) = dirs::home_dir() else {
        return Ok(());
    };
    let log_dir = home.join("cookiebanner_logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_name = format!("{}_{}", slugify(site_url), short_hash(site_url));
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(file_name))?;
    writeln!(file, "site_url: {site_url}")?;
    writeln!(
        file,
        "chrome_error: {}",
        result.string("chrome_error").unwrap_or_else(|| "null".into())
    )?;
    writeln!(
        file,
        "preferred_detector: {}",
        result
            .string("preferred_detector")
            .unwrap_or_else(|| "null".into())
    )?;
    if let Some(counts) = result.get("cookie_notice_count") {
        writeln!(file, "cookie_notice_count: {counts}")?;
    }
    info!("scan log written for {site_url}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_flattens_urls() {
        assert_eq!(slugify("https://www.example.com/"), "https-www-example-com");
        assert_eq!(slugify("Example.COM"), "example-com");
    }

    #[test]
    fn short_hash_is_stable_and_short() {
        assert_eq!(short_hash("a"), short_hash("a"));
        assert_ne!(short_hash("a"), short_hash("b"));
        assert_eq!(short_hash("https://example.com").len(), 10);
    }
}
