//! The per-site scan controller: a state machine over one browser tab that
//! drives navigation, the detector ensemble, the extractors, the optional
//! privacy-policy phase and the per-clickable replay.

pub mod events;
mod replay;

use std::time::Duration;

use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::dom::GetDocumentParams;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetScriptExecutionDisabledParams,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::browser_protocol::security::SetIgnoreCertificateErrorsParams;
use chromiumoxide::cdp::browser_protocol::storage::ClearDataForOriginParams;
use chromiumoxide::cdp::browser_protocol::{network, page as page_domain, security};
use chromiumoxide::cdp::js_protocol::debugger::PauseParams;
use chromiumoxide::error::CdpError;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::bridge::{self, js};
use crate::browser::ScanBrowser;
use crate::capture;
use crate::config::{DetectorKind, ScanOptions};
use crate::detectors::{Detectors, notice};
use crate::error::ScanError;
use crate::extractors::{Extractors, PrivacyPolicyExtractor};
use crate::imaging;
use crate::page::{SharedPageLogs, shared_page_logs};
use crate::results::ScanResult;
use crate::useragent;

/// One tab with its shared logs and installed event hooks.
pub struct ScanTab {
    pub page: Page,
    pub logs: SharedPageLogs,
    pub hooks: events::EventHooks,
}

/// The per-site scan state machine. Owns one tab at a time; the browser
/// itself is owned by the caller's scoped acquisition.
pub struct PageScanner {
    options: ScanOptions,
    tab: Option<ScanTab>,
    clicked: bool,
}

impl PageScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options,
            tab: None,
            clicked: false,
        }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Whether the scan clicked anything yet; decides between the two
    /// transport-crash error codes.
    pub fn interacted(&self) -> bool {
        self.clicked
    }

    /// Run the full scan state machine for one site, populating `result`.
    pub async fn scan(
        &mut self,
        browser: &ScanBrowser,
        result: &mut ScanResult,
    ) -> Result<(), ScanError> {
        let site_url = result
            .string("site_url")
            .ok_or_else(|| anyhow::anyhow!("result is missing site_url"))?;
        self.clicked = false;
        self.setup_tab(browser).await?;

        if let Err(err) = self.navigate(&site_url).await {
            self.close_tab().await;
            return Err(err);
        }
        self.wait(self.options.page_load_delay()).await;

        let (page, logs) = self.tab_parts()?;
        let page_screenshot_bytes = capture::take_screenshot(&page).await;
        let baseline_screenshot = page_screenshot_bytes
            .as_deref()
            .and_then(imaging::decode_screenshot);

        let detectors = Detectors::from_options(&self.options);
        let extractors = Extractors::from_options(&self.options);

        result.insert("cookies", self.get_all_cookies(&page).await);
        result.insert("cookie_notice_count", serde_json::Map::new());
        info!("Currently scanning website: {site_url}");
        result.insert("TRACKING_BEFORE_ANY_ACTION", false);
        result.insert("BUTTONS_HAVE_DIFFERENT_COLOR", false);
        result.insert("BANNER_PRESENT_WITHOUT_TRACKING", false);
        result.insert("SAME_SSIM", false);
        result.insert("language", notice::detect_language(&page).await);
        result.insert("disconnect_num", 0);
        result.insert("cookie_syncs_num", 0);
        result.insert("total_tracker_num", 0);
        result.insert("screenshots", serde_json::Map::new());

        let has_responses = !logs.lock().response_log.is_empty();
        // Without this the DOM elements are "visible" but cannot be
        // accessed through node ids.
        let _ = page
            .execute(GetDocumentParams::builder().depth(-1).build())
            .await;

        if !has_responses {
            let dns_failure = {
                let logs = logs.lock();
                logs.failed_request_log
                    .first()
                    .map(|failed| failed.error_text == "net::ERR_NAME_NOT_RESOLVED")
                    .unwrap_or(false)
            };
            self.close_tab().await;
            return Err(if dns_failure {
                ScanError::DnsNotResolved
            } else {
                ScanError::NotReachable
            });
        }

        extractors.extract_information(&logs, result).await;
        detectors
            .extract_information(&page, &logs, result, &self.options)
            .await;

        let disconnect_num = result.u64("disconnect_num").unwrap_or(0);
        let cookie_syncs_num = result.u64("cookie_syncs_num").unwrap_or(0);
        if disconnect_num + cookie_syncs_num > 0 {
            result.insert("total_tracker_num", disconnect_num + cookie_syncs_num);
            result.insert("TRACKING_BEFORE_ANY_ACTION", true);
            info!("Trackers are loaded without any user action.");
        } else {
            result.insert("total_tracker_num", 0);
            result.insert("TRACKING_BEFORE_ANY_ACTION", false);
            info!("Trackers are not loaded with the initial page load.");
        }
        if let Some(contents) = &page_screenshot_bytes {
            let stripped = site_url
                .strip_prefix("https://")
                .or_else(|| site_url.strip_prefix("http://"))
                .unwrap_or(&site_url);
            let file_name = format!("{}.png", sanitize_filename::sanitize(stripped));
            result.add_screenshot("initial_page_load", &file_name, contents);
        }
        self.copy_logs(result, &logs, "");

        let preferred = self.preferred_detector(result);
        result.insert("preferred_detector", preferred.map(|kind| kind.as_str()));
        info!("The preferred detector is: {preferred:?}");

        let Some(preferred) = preferred.filter(|kind| {
            result
                .get(kind.as_str())
                .and_then(Value::as_array)
                .map(|list| !list.is_empty())
                .unwrap_or(false)
        }) else {
            info!("There has been no cookie banner detected.");
            self.close_tab().await;
            return Ok(());
        };

        logs.lock().reset();

        if self.options.extract_privacy_policy() {
            let policy_extractor = PrivacyPolicyExtractor::new();
            if let Err(err) = policy_extractor
                .extract_information(&page, &logs, result, &self.options)
                .await
            {
                warn!("privacy-policy extraction failed: {err}");
            }
            self.copy_logs(result, &logs, "privacy_policy_");
            logs.lock().reset();
        }

        if self.options.click_clickables() {
            self.run_click_replay(browser, result, baseline_screenshot.as_ref(), preferred)
                .await?;
            self.close_tab().await;
        } else {
            self.close_tab().await;
        }

        self.post_analysis(result, preferred);
        info!("Page scan finished.");
        Ok(())
    }

    async fn navigate(&mut self, site_url: &str) -> Result<(), ScanError> {
        let (page, _) = self.tab_parts()?;
        let timeout = self.options.timeout();
        match tokio::time::timeout(Duration::from_secs(timeout), page.goto(site_url)).await {
            Err(_) => Err(ScanError::NavigationTimeout(timeout)),
            Ok(Err(CdpError::Timeout)) => Err(ScanError::NavigationTimeout(timeout)),
            Ok(Err(CdpError::ChromeMessage(message))) => {
                // Navigation errors like unresolved names surface here and
                // again in the failed-request log, which drives the error
                // classification.
                debug!("navigation reported: {message}");
                Ok(())
            }
            Ok(Err(other)) => Err(ScanError::Cdp(other)),
            Ok(Ok(_)) => Ok(()),
        }
    }

    pub(crate) async fn wait(&self, seconds: u64) {
        tokio::time::sleep(Duration::from_secs(seconds)).await;
    }

    pub(crate) fn tab_parts(&self) -> Result<(Page, SharedPageLogs), ScanError> {
        let tab = self
            .tab
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no active tab"))?;
        Ok((tab.page.clone(), tab.logs.clone()))
    }

    /// Acquire a tab and enable the protocol domains: network, security,
    /// DOM, page, and the debugger when scripts run. Device metrics are
    /// emulated only when the browser is actually headless.
    pub(crate) async fn setup_tab(&mut self, browser: &ScanBrowser) -> Result<(), ScanError> {
        let page = browser
            .browser()
            .new_page("about:blank")
            .await
            .map_err(|e| ScanError::Startup(e.to_string()))?;
        let logs = shared_page_logs();
        let scripts_enabled = self.options.javascript_enabled();

        if !scripts_enabled {
            page.execute(SetScriptExecutionDisabledParams::new(true))
                .await?;
        }

        if self.is_headless(&page).await {
            let resolution = self.options.resolution();
            let metrics = SetDeviceMetricsOverrideParams::builder()
                .width(i64::from(resolution.width))
                .height(i64::from(resolution.height))
                .screen_width(i64::from(resolution.width))
                .screen_height(i64::from(resolution.height))
                .device_scale_factor(0.0)
                .mobile(false)
                .build()
                .map_err(|e| anyhow::anyhow!(e))?;
            page.execute(metrics).await?;
        }

        let user_agent = if self.options.random_user_agent() {
            useragent::random_user_agent().to_string()
        } else {
            match browser.browser().version().await {
                Ok(version) => version.user_agent.replace("Headless", ""),
                Err(_) => useragent::DEFAULT_USER_AGENT.to_string(),
            }
        };
        page.execute(SetUserAgentOverrideParams::new(user_agent))
            .await?;

        page.execute(network::EnableParams::default()).await?;
        page.execute(security::EnableParams::default()).await?;
        page.execute(SetIgnoreCertificateErrorsParams::new(true))
            .await?;

        let hooks = events::install(&page, logs.clone(), scripts_enabled).await?;

        let script = AddScriptToEvaluateOnNewDocumentParams::builder()
            .source(js::ON_NEW_DOCUMENT_JAVASCRIPT)
            .build()
            .map_err(|e| anyhow::anyhow!(e))?;
        page.execute(script).await?;
        page.execute(page_domain::EnableParams::default()).await?;

        if scripts_enabled {
            page.enable_debugger().await?;
            // Pause before navigating so the breakpoint is installed
            // before any page JavaScript runs.
            page.execute(PauseParams::default()).await?;
        }

        self.tab = Some(ScanTab { page, logs, hooks });
        Ok(())
    }

    /// Disable the enabled domains and close the tab. Errors during
    /// teardown are not interesting; the browser scope kills the process
    /// anyway.
    pub(crate) async fn close_tab(&mut self) {
        let Some(mut tab) = self.tab.take() else {
            return;
        };
        tab.hooks.abort_all();
        let _ = tab.page.execute(page_domain::DisableParams::default()).await;
        if self.options.javascript_enabled() {
            let _ = tab.page.disable_debugger().await;
        }
        let _ = tab.page.execute(network::DisableParams::default()).await;
        let _ = tab.page.execute(security::DisableParams::default()).await;
        if let Err(err) = tab.page.close().await {
            debug!("closing tab failed: {err}");
        }
    }

    /// `window.chrome` is missing in headless builds; a probe failure also
    /// counts as headless.
    async fn is_headless(&self, page: &Page) -> bool {
        match bridge::evaluate(page, js::HEADLESS_PROBE).await {
            Some(result) => result.value.and_then(|v| v.as_bool()).unwrap_or(true),
            None => true,
        }
    }

    pub(crate) async fn get_all_cookies(&self, page: &Page) -> Value {
        use chromiumoxide::cdp::browser_protocol::storage::GetCookiesParams;
        match page.execute(GetCookiesParams::default()).await {
            Ok(response) => serde_json::to_value(&response.result.cookies).unwrap_or(Value::Null),
            Err(err) => {
                warn!("failed to collect cookies: {err}");
                Value::Array(Vec::new())
            }
        }
    }

    /// Clear cache, cookies, local storage and origin-scoped storage for
    /// every first-level domain observed in the previous phase.
    pub(crate) async fn clear_browser(&self) {
        let Ok((page, logs)) = self.tab_parts() else {
            return;
        };
        let _ = page
            .execute(network::ClearBrowserCacheParams::default())
            .await;
        let _ = page
            .execute(network::ClearBrowserCookiesParams::default())
            .await;
        let _ = bridge::evaluate(&page, js::LOCAL_STORAGE_CLEAR).await;

        let mut first_level_domains = std::collections::BTreeSet::new();
        {
            let logs = logs.lock();
            for response in &logs.response_log {
                if let Ok(url) = Url::parse(&response.url)
                    && let Some(host) = url.host_str()
                    && let Some(domain) = psl::domain_str(host)
                {
                    first_level_domains.insert(domain.to_string());
                }
            }
        }
        for domain in first_level_domains {
            let params = ClearDataForOriginParams::builder()
                .origin(format!(".{domain}"))
                .storage_types("all")
                .build();
            if let Ok(params) = params {
                let _ = page.execute(params).await;
            }
        }
    }

    /// First name in the priority list that produced a banner.
    pub(crate) fn preferred_detector(&self, result: &ScanResult) -> Option<DetectorKind> {
        self.options
            .detector_priorities()
            .iter()
            .copied()
            .find(|kind| result.contains_key(kind.as_str()))
    }

    /// Copy the page logs into the result under the given key prefix.
    pub(crate) fn copy_logs(&self, result: &mut ScanResult, logs: &SharedPageLogs, prefix: &str) {
        let logs = logs.lock();
        result.insert(format!("{prefix}request_log"), &logs.request_log);
        result.insert(
            format!("{prefix}document_request_log"),
            &logs.document_request_log,
        );
        result.insert(
            format!("{prefix}failed_request_log"),
            &logs.failed_request_log,
        );
        result.insert(format!("{prefix}response_log"), &logs.response_log);
        result.insert(
            format!("{prefix}security_state_log"),
            &logs.security_state_log,
        );
        result.insert(format!("{prefix}response_lookup"), logs.response_lookup_value());
    }
}
