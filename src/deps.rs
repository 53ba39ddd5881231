//! Offline dependency refresh: filter lists and the tracker catalogue are
//! downloaded outside the scan path and cached under the storage path.

use tracing::info;

use crate::config::ScanOptions;
use crate::detectors::filter_list::FilterListDetector;
use crate::extractors::trackers::TrackerExtractor;

/// Refresh every cached auxiliary file: both cookie filter lists, and the
/// Disconnect catalogue (derived from `services.json` with the `Content`
/// category removed). The privacy-wording list ships with the deployment
/// and is not fetched.
pub async fn update_dependencies(options: &ScanOptions) -> anyhow::Result<()> {
    FilterListDetector::update_dependencies(options).await?;
    TrackerExtractor::update_dependencies(options).await?;
    info!(
        "dependencies refreshed under {}",
        options.storage_path().display()
    );
    Ok(())
}
