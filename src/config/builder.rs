use std::path::PathBuf;

use super::types::{DetectorKind, DetectorToggles, Resolution, ScanOptions};

/// Builder for [`ScanOptions`]. All fields have working defaults; override
/// what the deployment needs.
#[derive(Debug, Default)]
pub struct ScanOptionsBuilder {
    options: ScanOptions,
}

impl ScanOptionsBuilder {
    #[must_use]
    pub fn storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.storage_path = path.into();
        self
    }

    #[must_use]
    pub fn detectors(mut self, toggles: DetectorToggles) -> Self {
        self.options.detectors = toggles;
        self
    }

    #[must_use]
    pub fn detector_priorities(mut self, priorities: Vec<DetectorKind>) -> Self {
        self.options.detector_priorities = priorities;
        self
    }

    #[must_use]
    pub fn disable_javascript(mut self, disable: bool) -> Self {
        self.options.disable_javascript = disable;
        self
    }

    #[must_use]
    pub fn take_screenshots(mut self, enabled: bool) -> Self {
        self.options.take_screenshots = enabled;
        self
    }

    #[must_use]
    pub fn take_screenshots_banner_only(mut self, enabled: bool) -> Self {
        self.options.take_screenshots_banner_only = enabled;
        self
    }

    #[must_use]
    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.options.resolution = Resolution { width, height };
        self
    }

    #[must_use]
    pub fn click_clickables(mut self, enabled: bool) -> Self {
        self.options.click_clickables = enabled;
        self
    }

    #[must_use]
    pub fn extract_privacy_policy(mut self, enabled: bool) -> Self {
        self.options.extract_privacy_policy = enabled;
        self
    }

    #[must_use]
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.options.timeout = seconds;
        self
    }

    #[must_use]
    pub fn page_load_delay(mut self, seconds: u64) -> Self {
        self.options.page_load_delay = seconds;
        self
    }

    #[must_use]
    pub fn random_user_agent(mut self, enabled: bool) -> Self {
        self.options.random_user_agent = enabled;
        self
    }

    #[must_use]
    pub fn old_kw_detection(mut self, enabled: bool) -> Self {
        self.options.old_kw_detection = enabled;
        self
    }

    #[must_use]
    pub fn save_logs(mut self, enabled: bool) -> Self {
        self.options.save_logs = enabled;
        self
    }

    #[must_use]
    pub fn perceptive_show_results(mut self, enabled: bool) -> Self {
        self.options.perceptive_show_results = enabled;
        self
    }

    #[must_use]
    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.chrome_executable = Some(path.into());
        self
    }

    #[must_use]
    pub fn build(self) -> ScanOptions {
        self.options
    }
}
