//! Post-detection analyzers.
//!
//! Extractors enrich the result after the detectors ran and at least one
//! HTTP response was observed. Each implements the same
//! `extract_information` capability; the tracker matcher and the offline
//! refresh path additionally expose `update_dependencies`.

pub mod cookie_sync;
pub mod privacy_policy;
pub mod trackers;

use tracing::warn;

use crate::config::ScanOptions;
use crate::page::SharedPageLogs;
use crate::results::ScanResult;

pub use cookie_sync::CookieSyncExtractor;
pub use privacy_policy::PrivacyPolicyExtractor;
pub use trackers::TrackerExtractor;

/// The always-on extractor set (the privacy-policy follower runs in its own
/// phase, driven by the controller).
pub struct Extractors {
    trackers: Option<TrackerExtractor>,
    cookie_sync: CookieSyncExtractor,
}

impl Extractors {
    pub fn from_options(options: &ScanOptions) -> Self {
        let trackers = match TrackerExtractor::new(options) {
            Ok(extractor) => Some(extractor),
            Err(err) => {
                warn!("Tracker extractor unavailable: {err}");
                None
            }
        };
        Self {
            trackers,
            cookie_sync: CookieSyncExtractor::new(),
        }
    }

    pub async fn extract_information(&self, logs: &SharedPageLogs, result: &mut ScanResult) {
        if let Some(trackers) = &self.trackers
            && let Err(err) = trackers.extract_information(logs, result).await
        {
            warn!("tracker extraction failed: {err}");
        }
        if let Err(err) = self.cookie_sync.extract_information(logs, result).await {
            warn!("cookie-sync extraction failed: {err}");
        }
    }
}
