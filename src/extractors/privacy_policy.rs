//! Privacy-policy follower: find the policy link inside the detected
//! banner, follow it, and extract the policy text.

use std::time::Duration;

use anyhow::Context;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::dom::{GetDocumentParams, NodeId};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::bridge::{self, js, node};
use crate::capture;
use crate::config::ScanOptions;
use crate::detectors::clickable::get_by_text;
use crate::page::SharedPageLogs;
use crate::results::{CookieNotice, ScanResult, fetch_single_notice};

pub const PRIVACY_WORDING_FILE: &str = "privacy_wording.json";

/// One entry of the keyword list. The file keys entries by `country`; the
/// lookup uses the detected language code, as the source data does.
#[derive(Debug, Clone, Deserialize)]
pub struct WordingEntry {
    pub country: String,
    pub words: Vec<String>,
}

pub struct PrivacyPolicyExtractor;

impl PrivacyPolicyExtractor {
    pub fn new() -> Self {
        Self
    }

    pub async fn extract_information(
        &self,
        page: &Page,
        _logs: &SharedPageLogs,
        result: &mut ScanResult,
        options: &ScanOptions,
    ) -> anyhow::Result<()> {
        let wording = load_wording(options)?;
        let language = result.string("language").unwrap_or_default();
        let Some(words) = words_for_language(&wording, &language) else {
            result.insert("privacy_policy_present", false);
            info!("There is no privacy policy present.");
            return Ok(());
        };
        info!("The language of the webpage is: {language}");
        info!("Keywords classifying a clickable as privacy policy: {words:?}");

        let Some(preferred) = result.string("preferred_detector") else {
            result.insert("privacy_policy_present", false);
            return Ok(());
        };
        let Some(notice) = result
            .get(&preferred)
            .and_then(fetch_single_notice)
        else {
            result.insert("privacy_policy_present", false);
            return Ok(());
        };

        let Some(matched) = search_through_clickables(&notice, &words) else {
            result.insert("privacy_policy_present", false);
            info!("There is no privacy policy present.");
            return Ok(());
        };

        // Re-fetch by text; node ids may have drifted since detection.
        let clicked = get_by_text(&matched, &notice.clickables)
            .context("privacy-policy clickable disappeared from the banner")?
            .clone();
        node::click_node(page, NodeId::new(clicked.node_id)).await;
        tokio::time::sleep(Duration::from_secs(options.page_load_delay())).await;

        let policy = self.extract_text_from_body(page).await;
        let word_count = policy
            .get("text")
            .and_then(Value::as_str)
            .map(|text| text.split(' ').count())
            .unwrap_or(0);
        let mut policy = policy;
        policy.insert("word_count".to_string(), word_count.into());
        result.insert("privacy_policy_present", true);
        result.insert("privacy_policy", Value::Object(policy));
        result.insert("word_count", word_count);
        info!("A privacy policy is present.");

        mark_clickable_role(result, &preferred, &clicked.text);

        let file_name = format!(
            "{}.png",
            sanitize_filename::sanitize(&clicked.text)
        );
        if let Some(contents) = capture::take_screenshot(page).await {
            result.add_file(&file_name, contents.clone());
            result.add_screenshot("privacy_policy", &file_name, &contents);
        }
        Ok(())
    }

    /// Body HTML and inner text of the current document.
    async fn extract_text_from_body(&self, page: &Page) -> serde_json::Map<String, Value> {
        let root = match page
            .execute(GetDocumentParams::builder().depth(-1).build())
            .await
        {
            Ok(response) => response.result.root.node_id,
            Err(_) => return serde_json::Map::new(),
        };
        bridge::call_on_node_to_map(page, root, js::GET_BODY_CONTENT_FUNCTION).await
    }
}

impl Default for PrivacyPolicyExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn load_wording(options: &ScanOptions) -> anyhow::Result<Vec<WordingEntry>> {
    let path = options.storage_path().join(PRIVACY_WORDING_FILE);
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("invalid wording list {}", path.display()))
}

/// Keywords for the detected page language, if listed.
pub fn words_for_language(wording: &[WordingEntry], language: &str) -> Option<Vec<String>> {
    wording
        .iter()
        .find(|entry| entry.country == language)
        .map(|entry| entry.words.clone())
}

/// First clickable whose lower-cased text contains any keyword.
pub fn search_through_clickables(
    notice: &CookieNotice,
    words: &[String],
) -> Option<crate::results::Clickable> {
    notice
        .clickables
        .iter()
        .find(|clickable| {
            let text = clickable.text.to_lowercase();
            words.iter().any(|word| text.contains(word.as_str()))
        })
        .cloned()
}

/// Mark the stored clickable as the privacy-policy link.
fn mark_clickable_role(result: &mut ScanResult, preferred: &str, text: &str) {
    let Some(mut notices) = result.notices(preferred) else {
        return;
    };
    for notice in &mut notices {
        for clickable in &mut notice.clickables {
            if clickable.text == text {
                clickable.role = "privacy policy".to_string();
            }
        }
    }
    result.set_notices(preferred, &notices);
}
