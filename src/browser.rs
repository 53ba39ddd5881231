//! Browser lifecycle: scoped acquisition of one headless Chromium per
//! worker, bound to a debugging port derived from the worker index, with a
//! fresh user profile and guaranteed termination on all exit paths.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use futures::StreamExt;
use serde_json::json;
use tempfile::TempDir;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

use crate::config::ScanOptions;
use crate::error::ScanError;

/// Base debugging port; worker `n` gets `9222 + n`.
pub const BASE_DEBUGGING_PORT: u16 = 9222;

// See https://github.com/GoogleChrome/chrome-launcher/blob/master/docs/chrome-flags-for-tools.md
const CHROME_ARGS: &[&str] = &[
    "--disable-background-networking",
    "--safebrowsing-disable-auto-update",
    "--disable-sync",
    "--metrics-recording-only",
    "--disable-default-apps",
    "--mute-audio",
    "--no-first-run",
    "--disable-background-timer-throttling",
    "--disable-client-side-phishing-detection",
    "--disable-popup-blocking",
    "--disable-prompt-on-repost",
    "--enable-automation",
    "--password-store=basic",
    "--use-mock-keychain",
    "--allow-running-insecure-content",
    "--disable-web-security",
    "--disable-component-update",
    "--autoplay-policy=no-user-gesture-required",
    "--disable-notifications",
    "--disable-hang-monitor",
    "--disable-gpu",
    "--no-sandbox",
];

/// Find a Chrome/Chromium executable on the system.
///
/// `CHROMIUM_PATH` overrides all other methods; then well-known install
/// locations per platform; finally `which` on Unix.
pub fn find_chrome_executable() -> Result<PathBuf, ScanError> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("Using browser from CHROMIUM_PATH: {}", path.display());
            return Ok(path);
        }
        warn!(
            "CHROMIUM_PATH points to non-existent file: {}",
            path.display()
        );
    }

    let paths: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };
    for path in paths {
        let path = PathBuf::from(path);
        if path.exists() {
            debug!("Found browser at: {}", path.display());
            return Ok(path);
        }
    }

    if !cfg!(target_os = "windows") {
        for cmd in &["google-chrome", "chromium", "chromium-browser", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    debug!("Found browser using 'which': {path}");
                    return Ok(PathBuf::from(path));
                }
            }
        }
    }

    Err(ScanError::Startup(
        "could not find google-chrome or chromium".into(),
    ))
}

/// Preferences written into the fresh profile: no startup UI, plugin
/// content allowed on all origins.
fn profile_preferences() -> serde_json::Value {
    json!({
        "profile": {
            "content_settings": {
                "exceptions": {
                    "plugins": {
                        "http://*,*": { "setting": 1 },
                        "https://*,*": { "setting": 1 }
                    }
                }
            }
        },
        "session": {
            "restore_on_startup": 4,
            "startup_urls": ["about:blank"]
        }
    })
}

/// One worker's browser process plus its CDP handler task and profile
/// directory. Dropping it kills the process; prefer [`ScanBrowser::shutdown`]
/// for an orderly exit.
pub struct ScanBrowser {
    browser: Browser,
    handler_task: JoinHandle<()>,
    temp_dir: Option<TempDir>,
    debugging_port: u16,
}

impl ScanBrowser {
    /// Launch a browser for the given worker with a fresh user profile.
    pub async fn launch(worker_id: u16, options: &ScanOptions) -> Result<Self, ScanError> {
        let debugging_port = BASE_DEBUGGING_PORT + worker_id;
        let chrome_executable = match options.chrome_executable() {
            Some(path) => path.clone(),
            None => find_chrome_executable()?,
        };

        let temp_dir = TempDir::new().map_err(|e| ScanError::Startup(e.to_string()))?;
        let user_data_dir = temp_dir.path().join("chrome-profile");
        let default_dir = user_data_dir.join("Default");
        std::fs::create_dir_all(&default_dir).map_err(|e| ScanError::Startup(e.to_string()))?;
        let preferences = serde_json::to_vec(&profile_preferences())
            .map_err(|e| ScanError::Startup(e.to_string()))?;
        std::fs::write(default_dir.join("Preferences"), preferences)
            .map_err(|e| ScanError::Startup(e.to_string()))?;

        let resolution = options.resolution();
        let mut config_builder = BrowserConfigBuilder::default()
            .chrome_executable(chrome_executable)
            .user_data_dir(user_data_dir)
            .port(debugging_port)
            .window_size(resolution.width, resolution.height)
            .request_timeout(Duration::from_secs(options.timeout().max(30)))
            .headless_mode(HeadlessMode::default());
        for arg in CHROME_ARGS {
            config_builder = config_builder.arg(*arg);
        }
        let browser_config = config_builder
            .build()
            .map_err(|e| ScanError::Startup(format!("failed to build browser config: {e}")))?;

        info!("Launching browser on port {debugging_port}");
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScanError::Startup(e.to_string()))?;

        let handler_task = task::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    let message = e.to_string();
                    // Chrome sends CDP events chromiumoxide does not know;
                    // their deserialization failures are not actionable.
                    let benign = message
                        .contains("data did not match any variant of untagged enum Message")
                        || message.contains("Failed to deserialize WS response");
                    if benign {
                        trace!("Suppressed benign CDP serialization error: {message}");
                    } else {
                        error!("Browser handler error: {message}");
                    }
                }
            }
            debug!("Browser handler task completed");
        });

        Ok(Self {
            browser,
            handler_task,
            temp_dir: Some(temp_dir),
            debugging_port,
        })
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    pub fn debugging_port(&self) -> u16 {
        self.debugging_port
    }

    /// Close the browser, wait for the process to exit, stop the handler
    /// task, and remove the profile directory.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {e}");
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {e}");
        }
        self.handler_task.abort();
        if let Some(temp_dir) = self.temp_dir.take()
            && let Err(e) = temp_dir.close()
        {
            warn!("Failed to remove browser profile directory: {e}");
        }
    }
}

impl Drop for ScanBrowser {
    fn drop(&mut self) {
        // Browser::drop kills the Chrome process; the handler task must not
        // outlive it.
        self.handler_task.abort();
    }
}
