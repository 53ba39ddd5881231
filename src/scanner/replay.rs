//! Per-clickable replay: reload the page with a clean browser state for
//! every banner button, click it, and measure the tracking delta.

use chromiumoxide::cdp::browser_protocol::dom::{GetDocumentParams, NodeId};
use image::RgbImage;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::bridge::node;
use crate::browser::ScanBrowser;
use crate::capture;
use crate::config::DetectorKind;
use crate::detectors::clickable::{clickables_with_same_ssim, get_by_kind, get_by_text};
use crate::detectors::Detectors;
use crate::error::{ChromeError, ScanError};
use crate::extractors::Extractors;
use crate::imaging::ssim::calculate_ssim_score;
use crate::imaging;
use crate::results::{Clickable, ClickableKind, ScanResult, fetch_single_notice};

use super::PageScanner;

impl PageScanner {
    /// Move the initial result under `initial_result`, then replay every
    /// button of the preferred banner in a recycled tab. Each sub-result is
    /// stored under the button's original node id.
    pub(crate) async fn run_click_replay(
        &mut self,
        browser: &ScanBrowser,
        result: &mut ScanResult,
        baseline_screenshot: Option<&RgbImage>,
        preferred: DetectorKind,
    ) -> Result<(), ScanError> {
        let reloaded_options = self.options().without_screenshots();

        let Some(banner) = result
            .get(preferred.as_str())
            .and_then(fetch_single_notice)
        else {
            return Ok(());
        };
        let clickables = banner.clickables.clone();

        // Rehome the whole initial scan; site_url and language stay
        // available at the top level for the per-click phases.
        let initial = result.take_values();
        let site_url = initial
            .get("site_url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let language = initial.get("language").cloned().unwrap_or(Value::Null);
        result.insert("initial_result", Value::Object(initial));
        result.insert("site_url", site_url.clone());
        result.insert("language", language.clone());
        self.clear_browser().await;

        let buttons = get_by_kind(&clickables, ClickableKind::Button);

        for button in &buttons {
            self.close_tab().await;
            self.setup_tab(browser).await?;
            if let Err(err) = self.replay_navigate(&site_url).await {
                return Err(err);
            }
            self.wait(self.options().page_load_delay()).await;

            let (page, logs) = self.tab_parts()?;
            let mut clickable_result = ScanResult::default();
            clickable_result.insert("site_url", site_url.clone());
            clickable_result.insert("language", language.clone());
            clickable_result.insert("cookie_notice_count", Map::new());
            clickable_result.insert("screenshots", Value::Null);

            // Re-run only the preferred detector on the fresh load.
            let detectors = Detectors::single(&reloaded_options, preferred);
            let _ = page
                .execute(GetDocumentParams::builder().depth(-1).build())
                .await;
            detectors
                .extract_information(&page, &logs, &mut clickable_result, &reloaded_options)
                .await;

            // On some sites the banner disappears after interacting with
            // it; record the occurrence and stop.
            let Some(reloaded_banner) = clickable_result
                .get(preferred.as_str())
                .and_then(fetch_single_notice)
            else {
                result.insert("chrome_error", ChromeError::BannerGone.as_str());
                self.store_sub_result(result, button, clickable_result);
                return Ok(());
            };
            let Some(reloaded_clickable) =
                get_by_text(button, &reloaded_banner.clickables).cloned()
            else {
                result.insert("chrome_error", ChromeError::BannerGone.as_str());
                self.store_sub_result(result, button, clickable_result);
                return Ok(());
            };

            info!("The button '{}' has been clicked", button.text);
            self.click_and_wait(NodeId::new(reloaded_clickable.node_id))
                .await;

            clickable_result.insert("cookies", self.get_all_cookies(&page).await);
            let extractors = Extractors::from_options(self.options());
            extractors
                .extract_information(&logs, &mut clickable_result)
                .await;
            let total_tracker_num = clickable_result.u64("disconnect_num").unwrap_or(0)
                + clickable_result.u64("cookie_syncs_num").unwrap_or(0);
            clickable_result.insert("total_tracker_num", total_tracker_num);
            accumulate_initial_tracker_num(result, total_tracker_num);

            // Post-click capture and its similarity to the baseline.
            let file_name = sanitize_filename::sanitize(&button.text);
            let mut ssim_score = None;
            if let Some(contents) = capture::take_screenshot(&page).await {
                result.add_file(format!("{file_name}.png"), contents.clone());
                append_button_pressed_screenshot(result, &file_name, &contents);
                let clicked = imaging::decode_screenshot(&contents);
                if let (Some(baseline), Some(clicked)) = (baseline_screenshot, clicked.as_ref()) {
                    ssim_score = calculate_ssim_score(baseline, clicked);
                }
            }
            update_initial_button(
                result,
                preferred,
                &button.text,
                ssim_score,
                total_tracker_num,
            );

            self.copy_logs(&mut clickable_result, &logs, "");
            let visible_after_click =
                node::is_node_visible(&page, NodeId::new(reloaded_banner.node_id))
                    .await
                    .is_visible;
            clickable_result.insert("banner_visible_after_click", visible_after_click);

            self.store_sub_result(result, button, clickable_result);
            self.clear_browser().await;
        }
        Ok(())
    }

    async fn replay_navigate(&mut self, site_url: &str) -> Result<(), ScanError> {
        let (page, _) = self.tab_parts()?;
        let timeout = self.options().timeout();
        match tokio::time::timeout(
            std::time::Duration::from_secs(timeout),
            page.goto(site_url),
        )
        .await
        {
            Err(_) => Err(ScanError::NavigationTimeout(timeout)),
            Ok(Err(chromiumoxide::error::CdpError::Timeout)) => {
                Err(ScanError::NavigationTimeout(timeout))
            }
            Ok(Err(chromiumoxide::error::CdpError::ChromeMessage(message))) => {
                warn!("replay navigation reported: {message}");
                Ok(())
            }
            Ok(Err(other)) => Err(ScanError::Cdp(other)),
            Ok(Ok(_)) => Ok(()),
        }
    }

    /// Click a node and keep the interaction marker set for transport-crash
    /// classification.
    pub(crate) async fn click_and_wait(&mut self, node_id: NodeId) {
        self.clicked = true;
        let Ok((page, _)) = self.tab_parts() else {
            return;
        };
        node::click_node(&page, node_id).await;
        self.wait(self.options().page_load_delay()).await;
    }

    fn store_sub_result(&self, result: &mut ScanResult, button: &Clickable, sub: ScanResult) {
        for file in sub.files() {
            result.add_file(file.filename.clone(), file.contents.clone());
        }
        result.insert(button.node_id.to_string(), Value::Object(sub.into_values()));
    }

    /// Post-replay analytics over the preferred banner's buttons.
    pub(crate) fn post_analysis(&self, result: &mut ScanResult, preferred: DetectorKind) {
        if result.contains_key("initial_result") {
            let Some(Value::Object(initial)) =
                result.get("initial_result").cloned()
            else {
                return;
            };
            let banner_detected = initial
                .get("cookie_notice_count")
                .and_then(Value::as_object)
                .map(|counts| !counts.is_empty())
                .unwrap_or(false);
            let total = initial
                .get("total_tracker_num")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            if total == 0 && banner_detected {
                set_in_initial(result, "BANNER_PRESENT_WITHOUT_TRACKING", json!(true));
            }
            let Some(banner) = initial
                .get(preferred.as_str())
                .and_then(fetch_single_notice)
            else {
                return;
            };
            let buttons = get_by_kind(&banner.clickables, ClickableKind::Button);
            if let Some(first) = buttons.first() {
                if buttons
                    .iter()
                    .any(|b| b.background_color != first.background_color)
                {
                    set_in_initial(result, "BUTTONS_HAVE_DIFFERENT_COLOR", json!(true));
                }
                let same_ssim = clickables_with_same_ssim(&buttons);
                if !same_ssim.is_empty() {
                    set_in_initial(result, "SAME_SSIM", json!(true));
                    set_in_initial(
                        result,
                        "SAME_SSIM_BUTTONS",
                        serde_json::to_value(&same_ssim).unwrap_or(Value::Null),
                    );
                }
            }
        } else {
            let banner_detected = result
                .get("cookie_notice_count")
                .and_then(Value::as_object)
                .map(|counts| !counts.is_empty())
                .unwrap_or(false);
            let total = result.u64("total_tracker_num").unwrap_or(0);
            if total == 0 && banner_detected {
                result.insert("BANNER_PRESENT_WITHOUT_TRACKING", true);
                if let Some(banner) = result
                    .get(preferred.as_str())
                    .and_then(fetch_single_notice)
                {
                    let buttons = get_by_kind(&banner.clickables, ClickableKind::Button);
                    if let Some(first) = buttons.first()
                        && buttons
                            .iter()
                            .any(|b| b.background_color != first.background_color)
                    {
                        result.insert("BUTTONS_HAVE_DIFFERENT_COLOR", true);
                    }
                }
            }
        }
    }
}

fn set_in_initial(result: &mut ScanResult, key: &str, value: Value) {
    if let Some(Value::Object(initial)) = result.get_mut("initial_result") {
        initial.insert(key.to_string(), value);
    }
}

fn accumulate_initial_tracker_num(result: &mut ScanResult, additional: u64) {
    if let Some(Value::Object(initial)) = result.get_mut("initial_result") {
        let current = initial
            .get("total_tracker_num")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        initial.insert("total_tracker_num".to_string(), json!(current + additional));
    }
}

fn append_button_pressed_screenshot(result: &mut ScanResult, file_name: &str, contents: &[u8]) {
    use base64::Engine;
    let encoded = base64::engine::general_purpose::STANDARD.encode(contents);
    let entry = json!({ "filename": format!("{file_name}.png"), "contents": encoded });
    if let Some(Value::Object(initial)) = result.get_mut("initial_result") {
        let screenshots = initial
            .entry("screenshots".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = screenshots {
            match map.get_mut("button_pressed") {
                Some(Value::Array(list)) => list.push(entry),
                _ => {
                    map.insert("button_pressed".to_string(), Value::Array(vec![entry]));
                }
            }
        }
    }
}

/// Update the button inside the rehomed initial banner with its SSIM score
/// and tracker count, matched by text.
fn update_initial_button(
    result: &mut ScanResult,
    preferred: DetectorKind,
    text: &str,
    ssim: Option<f64>,
    total_tracker_num: u64,
) {
    let Some(Value::Object(initial)) = result.get_mut("initial_result") else {
        return;
    };
    let Some(banners) = initial.get_mut(preferred.as_str()) else {
        return;
    };
    let banner_list = match banners {
        Value::Array(list) => list.iter_mut().collect::<Vec<_>>(),
        single => vec![single],
    };
    for banner in banner_list {
        let Some(clickables) = banner.get_mut("clickables").and_then(Value::as_array_mut) else {
            continue;
        };
        for clickable in clickables {
            if clickable.get("text").and_then(Value::as_str) == Some(text) {
                if let Some(object) = clickable.as_object_mut() {
                    if let Some(score) = ssim {
                        object.insert("SSIM".to_string(), json!(score));
                    }
                    object.insert("total_tracker_num".to_string(), json!(total_tracker_num));
                }
            }
        }
    }
}
