//! Classifier detector: submits candidate element texts to an external
//! consent-banner classifier over HTTP and accepts the first positive.

use std::time::Duration;

use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::dom::NodeId;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::bridge::{self, js, node};
use crate::capture;
use crate::config::ScanOptions;
use crate::detectors::notice;
use crate::imaging;
use crate::page::SharedPageLogs;
use crate::results::ScanResult;

pub const CLASSIFIER_ENDPOINT: &str = "http://127.0.0.1:9999";
const CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ClassifierResponse {
    is_consent_banner: i64,
}

pub struct ClassifierDetector {
    endpoint: String,
    client: reqwest::Client,
}

impl ClassifierDetector {
    pub fn new() -> Self {
        Self::with_endpoint(CLASSIFIER_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn extract_information(
        &self,
        page: &Page,
        _logs: &SharedPageLogs,
        result: &mut ScanResult,
        options: &ScanOptions,
    ) -> anyhow::Result<()> {
        let screenshot = capture::take_screenshot(page)
            .await
            .and_then(|bytes| imaging::decode_screenshot(&bytes));

        let candidate_ids = self.gather_candidate_elements(page).await;
        let lang = result.string("language").unwrap_or_else(|| "en".into());
        for candidate_id in candidate_ids {
            let text = node::node_text(page, candidate_id).await.unwrap_or_default();
            let Some(is_banner) = self.classify(&lang, &text).await else {
                info!("Classifier not reachable. Aborting detection...");
                return Ok(());
            };
            if is_banner {
                let properties = notice::cookie_notice_properties(
                    page,
                    candidate_id,
                    options,
                    screenshot.as_ref(),
                )
                .await;
                let notices = vec![properties];
                result.set_notices("bert", &notices);
                capture::attach_detector_screenshots(
                    page,
                    result,
                    &[candidate_id],
                    &notices,
                    "bert",
                    options,
                )
                .await;
                return Ok(());
            }
        }
        Ok(())
    }

    /// One classifier round trip. `None` when the service is unreachable
    /// or answers with something unusable; the caller aborts silently.
    pub async fn classify(&self, lang: &str, text: &str) -> Option<bool> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(CLASSIFIER_TIMEOUT)
            .json(&json!({ "lang": lang, "text": text }))
            .send()
            .await
            .ok()?;
        let verdict: ClassifierResponse = response.json().await.ok()?;
        Some(verdict.is_consent_banner == 1)
    }

    /// Candidate elements per Khandelwal et al.: visible elements with a
    /// positive stacking index plus the first and last three visible
    /// element children of the body.
    async fn gather_candidate_elements(&self, page: &Page) -> Vec<NodeId> {
        let Some(result) = bridge::evaluate(page, js::GATHER_CLASSIFIER_CANDIDATES).await else {
            return Vec::new();
        };
        match result.object_id {
            Some(array_id) => bridge::array_to_node_ids(page, &array_id).await,
            None => Vec::new(),
        }
    }
}

impl Default for ClassifierDetector {
    fn default() -> Self {
        Self::new()
    }
}
