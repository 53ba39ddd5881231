//! Perceptive detector: segment the rendered page around a keyword seed
//! and map the smallest enclosing contour back to a DOM node.

use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::dom::{GetNodeForLocationParams, NodeId};
use chromiumoxide::cdp::js_protocol::runtime::CallArgument;
use image::Rgb;
use serde_json::json;
use tracing::{debug, info};

use crate::bridge::{self, js};
use crate::capture;
use crate::config::ScanOptions;
use crate::detectors::notice;
use crate::imaging;
use crate::page::SharedPageLogs;
use crate::results::ScanResult;

pub struct PerceptiveDetector;

impl PerceptiveDetector {
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
        let Some(seed) = notice::search_and_get_coordinates(page, options, "cookie").await else {
            return Ok(());
        };

        // Embedded images would fragment the contour around the banner.
        let _ = bridge::evaluate(page, js::REMOVE_IMAGES_SNIPPET).await;

        let Some(screenshot_bytes) = capture::take_screenshot(page).await else {
            return Ok(());
        };
        let Some(page_screenshot) = imaging::decode_screenshot(&screenshot_bytes) else {
            return Ok(());
        };
        let bordered = imaging::add_border(&page_screenshot, 1, Rgb([0, 0, 0]));

        let Some(seed_color) = imaging::pixel_at(&page_screenshot, seed.x as i64, seed.y as i64)
        else {
            info!("Seed coordinate outside the screenshot - abort perceptive detection");
            return Ok(());
        };
        let masked = imaging::xor_with_color(&bordered, seed_color);
        let mask = imaging::to_binary_mask(&masked);

        let candidates =
            imaging::banner_contour_candidates(&mask, (seed.x as i32, seed.y as i32));
        let Some(candidate) = candidates.first() else {
            info!(
                "Unable to extract coordinates and consent notice dimensions - abort perceptive detection"
            );
            return Ok(());
        };
        if options.perceptive_show_results() {
            debug!(
                "perceptive contour at ({}, {}) size {}x{} area {}",
                candidate.bounding_rect.x,
                candidate.bounding_rect.y,
                candidate.bounding_rect.width,
                candidate.bounding_rect.height,
                candidate.area
            );
        }

        // The contour's first boundary point lies on the banner edge in the
        // bordered image; hit-testing maps it back to a DOM node.
        let params = GetNodeForLocationParams::builder()
            .x(i64::from(candidate.first_point.0))
            .y(i64::from(candidate.first_point.1))
            .build()
            .map_err(|e| anyhow::anyhow!(e))?;
        let located = match page.execute(params).await {
            Ok(response) => response.result.node_id,
            Err(err) => {
                info!("Unable to extract node at location ({err}) - abort perceptive detection");
                return Ok(());
            }
        };
        let Some(mut banner_node) = located else {
            info!("Unable to extract node at location - abort perceptive detection");
            return Ok(());
        };

        let rect = candidate.bounding_rect;
        if let Some(optimized) = self
            .widen_within_contour(
                page,
                banner_node,
                i64::from(rect.x),
                i64::from(rect.x + rect.width),
                i64::from(rect.y),
                i64::from(rect.y + rect.height),
                i64::from(rect.width) * i64::from(rect.height),
            )
            .await
        {
            banner_node = optimized;
        }

        let properties =
            notice::cookie_notice_properties(page, banner_node, options, Some(&page_screenshot))
                .await;
        let notices = vec![properties];
        result.set_notices("perceptive", &notices);
        capture::attach_detector_screenshots(
            page,
            result,
            &[banner_node],
            &notices,
            "perceptive",
            options,
        )
        .await;
        Ok(())
    }

    /// Walk up while the parent's rectangle stays inside the contour box
    /// (shifted by one pixel for the border) and its area stays between
    /// the current node's and the contour's.
    async fn widen_within_contour(
        &self,
        page: &Page,
        node_id: NodeId,
        min_x: i64,
        max_x: i64,
        min_y: i64,
        max_y: i64,
        max_area: i64,
    ) -> Option<NodeId> {
        let object_id = bridge::resolve_node(page, node_id).await?;
        let arguments = vec![
            CallArgument::builder().object_id(object_id.clone()).build(),
            CallArgument::builder().value(json!(min_x - 1)).build(),
            CallArgument::builder().value(json!(max_x - 1)).build(),
            CallArgument::builder().value(json!(min_y - 1)).build(),
            CallArgument::builder().value(json!(max_y - 1)).build(),
            CallArgument::builder().value(json!(max_area)).build(),
        ];
        let result = bridge::call_on(
            page,
            &object_id,
            js::PARENT_WHILE_AREA_INCREASES_FUNCTION,
            arguments,
        )
        .await?;
        match result.object_id {
            Some(handle) => bridge::request_node(page, &handle).await,
            None => None,
        }
    }
}

impl Default for PerceptiveDetector {
    fn default() -> Self {
        Self::new()
    }
}
