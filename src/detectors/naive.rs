//! Naive keyword detector: seed on the literal string `cookie`, then walk
//! up the DOM until the candidate owns a button.

use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::dom::NodeId;
use tracing::info;

use crate::bridge::node;
use crate::capture;
use crate::config::ScanOptions;
use crate::detectors::clickable::get_by_kind;
use crate::detectors::notice;
use crate::imaging;
use crate::page::SharedPageLogs;
use crate::results::{ClickableKind, ScanResult};

pub struct NaiveDetector;

impl NaiveDetector {
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
        let screenshot = capture::take_screenshot(page)
            .await
            .and_then(|bytes| imaging::decode_screenshot(&bytes));

        let Some(seed) = notice::search_and_get_coordinates(page, options, "cookie").await else {
            return Ok(());
        };
        let mut properties =
            notice::cookie_notice_properties(page, seed.node_id, options, screenshot.as_ref())
                .await;

        // Walk towards <body> until the candidate carries at least one
        // button clickable.
        let mut current = seed.node_id;
        while get_by_kind(&properties.clickables, ClickableKind::Button).is_empty() {
            let Some(parent) = node::parent_node(page, current).await else {
                break;
            };
            current = parent;
            properties =
                notice::cookie_notice_properties(page, parent, options, screenshot.as_ref()).await;
            if !get_by_kind(&properties.clickables, ClickableKind::Button).is_empty() {
                break;
            }
        }

        info!(
            "naive detection selected node {} ({} clickables)",
            properties.node_id,
            properties.clickables.len()
        );
        let node_ids = [NodeId::new(properties.node_id)];
        let notices = vec![properties];
        result.set_notices("naive", &notices);
        capture::attach_detector_screenshots(page, result, &node_ids, &notices, "naive", options)
            .await;
        Ok(())
    }
}

impl Default for NaiveDetector {
    fn default() -> Self {
        Self::new()
    }
}
