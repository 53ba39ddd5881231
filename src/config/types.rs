use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Tags for the banner detectors, matching the names used in
/// `detector_priorities` and as result keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectorKind {
    #[serde(rename = "bert")]
    Bert,
    #[serde(rename = "naive")]
    Naive,
    #[serde(rename = "perceptive")]
    Perceptive,
    #[serde(rename = "easylist-cookie")]
    EasylistCookie,
    #[serde(rename = "i-dont-care-about-cookies")]
    IDontCareAboutCookies,
}

impl DetectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorKind::Bert => "bert",
            DetectorKind::Naive => "naive",
            DetectorKind::Perceptive => "perceptive",
            DetectorKind::EasylistCookie => "easylist-cookie",
            DetectorKind::IDontCareAboutCookies => "i-dont-care-about-cookies",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bert" => Some(DetectorKind::Bert),
            "naive" => Some(DetectorKind::Naive),
            "perceptive" => Some(DetectorKind::Perceptive),
            "easylist-cookie" => Some(DetectorKind::EasylistCookie),
            "i-dont-care-about-cookies" => Some(DetectorKind::IDontCareAboutCookies),
            _ => None,
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enable flag per detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorToggles {
    pub bert: bool,
    pub easylist_cookie: bool,
    pub i_dont_care_about_cookies: bool,
    pub naive: bool,
    pub perceptive: bool,
}

impl Default for DetectorToggles {
    fn default() -> Self {
        Self {
            bert: true,
            easylist_cookie: true,
            i_dont_care_about_cookies: true,
            naive: true,
            perceptive: true,
        }
    }
}

impl DetectorToggles {
    pub fn is_enabled(&self, kind: DetectorKind) -> bool {
        match kind {
            DetectorKind::Bert => self.bert,
            DetectorKind::Naive => self.naive,
            DetectorKind::Perceptive => self.perceptive,
            DetectorKind::EasylistCookie => self.easylist_cookie,
            DetectorKind::IDontCareAboutCookies => self.i_dont_care_about_cookies,
        }
    }
}

/// Viewport size. Used both for device metrics emulation and to bound
/// visibility tests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Configuration for one site scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Root for cached auxiliary data (filter lists, tracker catalogue,
    /// privacy wording).
    pub(crate) storage_path: PathBuf,
    pub(crate) detectors: DetectorToggles,
    /// Priority order for selecting the preferred detector. Only one
    /// banner is clicked through during a scan attempt.
    pub(crate) detector_priorities: Vec<DetectorKind>,
    pub(crate) disable_javascript: bool,
    pub(crate) take_screenshots: bool,
    pub(crate) take_screenshots_banner_only: bool,
    pub(crate) resolution: Resolution,
    pub(crate) click_clickables: bool,
    pub(crate) extract_privacy_policy: bool,
    /// Per-navigation timeout in seconds.
    pub(crate) timeout: u64,
    /// Mandatory wait after load/click, in seconds.
    pub(crate) page_load_delay: u64,
    pub(crate) random_user_agent: bool,
    /// Accepted for configuration round-trips; has no observable effect.
    pub(crate) old_kw_detection: bool,
    pub(crate) save_logs: bool,
    /// Diagnostic flag; logs contour geometry during perceptive detection.
    pub(crate) perceptive_show_results: bool,
    pub(crate) chrome_executable: Option<PathBuf>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        let storage_path = dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("bannerscan");
        Self {
            storage_path,
            detectors: DetectorToggles::default(),
            detector_priorities: vec![
                DetectorKind::Bert,
                DetectorKind::Perceptive,
                DetectorKind::Naive,
                DetectorKind::IDontCareAboutCookies,
                DetectorKind::EasylistCookie,
            ],
            disable_javascript: false,
            take_screenshots: true,
            take_screenshots_banner_only: true,
            resolution: Resolution::default(),
            click_clickables: true,
            extract_privacy_policy: true,
            timeout: 60,
            page_load_delay: 5,
            random_user_agent: false,
            old_kw_detection: false,
            save_logs: false,
            perceptive_show_results: false,
            chrome_executable: None,
        }
    }
}

// Getters
impl ScanOptions {
    #[must_use]
    pub fn builder() -> super::ScanOptionsBuilder {
        super::ScanOptionsBuilder::default()
    }

    #[must_use]
    pub fn storage_path(&self) -> &PathBuf {
        &self.storage_path
    }

    #[must_use]
    pub fn detectors(&self) -> &DetectorToggles {
        &self.detectors
    }

    #[must_use]
    pub fn detector_priorities(&self) -> &[DetectorKind] {
        &self.detector_priorities
    }

    #[must_use]
    pub fn javascript_enabled(&self) -> bool {
        !self.disable_javascript
    }

    #[must_use]
    pub fn take_screenshots(&self) -> bool {
        self.take_screenshots
    }

    #[must_use]
    pub fn take_screenshots_banner_only(&self) -> bool {
        self.take_screenshots_banner_only
    }

    #[must_use]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    #[must_use]
    pub fn click_clickables(&self) -> bool {
        self.click_clickables
    }

    #[must_use]
    pub fn extract_privacy_policy(&self) -> bool {
        self.extract_privacy_policy
    }

    #[must_use]
    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    #[must_use]
    pub fn page_load_delay(&self) -> u64 {
        self.page_load_delay
    }

    #[must_use]
    pub fn random_user_agent(&self) -> bool {
        self.random_user_agent
    }

    #[must_use]
    pub fn old_kw_detection(&self) -> bool {
        self.old_kw_detection
    }

    #[must_use]
    pub fn save_logs(&self) -> bool {
        self.save_logs
    }

    #[must_use]
    pub fn perceptive_show_results(&self) -> bool {
        self.perceptive_show_results
    }

    #[must_use]
    pub fn chrome_executable(&self) -> Option<&PathBuf> {
        self.chrome_executable.as_ref()
    }

    /// Copy of these options with all screenshot capture switched off.
    /// Used during click replay, where only the post-click capture is kept.
    #[must_use]
    pub fn without_screenshots(&self) -> Self {
        let mut options = self.clone();
        options.take_screenshots = false;
        options.take_screenshots_banner_only = false;
        options
    }
}
