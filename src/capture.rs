//! Screenshot capture over CDP: viewport captures, banner-only clips and
//! highlighted captures used by the detectors.
//!
//! Capture failures never fail a scan; the result simply goes without the
//! attachment.

use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::dom::{NodeId, Rgba};
use chromiumoxide::cdp::browser_protocol::overlay;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams, Viewport,
};
use tracing::{debug, warn};

use crate::config::ScanOptions;
use crate::results::{CookieNotice, ScanResult};

/// PNG capture of the current layout viewport.
pub async fn take_screenshot(page: &Page) -> Option<Vec<u8>> {
    let metrics = match page.layout_metrics().await {
        Ok(metrics) => metrics,
        Err(err) => {
            warn!("Failed to read layout metrics: {err}");
            return None;
        }
    };
    let viewport = metrics.css_layout_viewport;
    let clip = Viewport {
        x: viewport.page_x as f64,
        y: viewport.page_y as f64,
        width: viewport.client_width as f64,
        height: viewport.client_height as f64,
        scale: 1.0,
    };
    capture(page, Some(clip)).await
}

/// PNG capture clipped to a banner rectangle. Zero-sized dimensions fall
/// back to a wide strip so a broken geometry still produces something.
pub async fn take_screenshot_banner_only(
    page: &Page,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) -> Option<Vec<u8>> {
    let width = if width == 0.0 { 1920.0 } else { width };
    let height = if height == 0.0 { 300.0 } else { height };
    let clip = Viewport {
        x,
        y,
        width,
        height,
        scale: 1.0,
    };
    capture(page, Some(clip)).await
}

/// Full capture with the given node highlighted through the Overlay domain.
pub async fn take_screenshot_highlighted(page: &Page, node_id: NodeId) -> Option<Vec<u8>> {
    if let Err(err) = highlight_node(page, node_id).await {
        debug!("Failed to highlight node {node_id:?}: {err}");
    }
    let shot = capture(page, None).await;
    if let Err(err) = hide_highlight(page).await {
        debug!("Failed to hide highlight: {err}");
    }
    shot
}

async fn capture(page: &Page, clip: Option<Viewport>) -> Option<Vec<u8>> {
    let params = CaptureScreenshotParams {
        format: Some(CaptureScreenshotFormat::Png),
        clip,
        ..Default::default()
    };
    match page.screenshot(params).await {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            warn!("Screenshot capture failed: {err}");
            None
        }
    }
}

async fn highlight_node(page: &Page, node_id: NodeId) -> anyhow::Result<()> {
    page.execute(overlay::EnableParams::default()).await?;
    let config = overlay::HighlightConfig::builder()
        .content_color(Rgba {
            r: 152,
            g: 196,
            b: 234,
            a: Some(0.5),
        })
        .padding_color(Rgba {
            r: 184,
            g: 226,
            b: 183,
            a: Some(0.5),
        })
        .margin_color(Rgba {
            r: 253,
            g: 201,
            b: 148,
            a: Some(0.5),
        })
        .build();
    let params = overlay::HighlightNodeParams::builder()
        .highlight_config(config)
        .node_id(node_id)
        .build()
        .map_err(|e| anyhow::anyhow!(e))?;
    page.execute(params).await?;
    Ok(())
}

async fn hide_highlight(page: &Page) -> anyhow::Result<()> {
    page.execute(overlay::HideHighlightParams::default())
        .await?;
    page.execute(overlay::DisableParams::default()).await?;
    Ok(())
}

/// Attach the per-detector captures to the result: highlighted full pages
/// and banner-only clips, per the screenshot options.
pub async fn attach_detector_screenshots(
    page: &Page,
    result: &mut ScanResult,
    node_ids: &[NodeId],
    notices: &[CookieNotice],
    detection_method: &str,
    options: &ScanOptions,
) {
    if options.take_screenshots() {
        for (index, node_id) in node_ids.iter().enumerate() {
            let file_name = format!("{detection_method}-{index}.png");
            if let Some(contents) = take_screenshot_highlighted(page, *node_id).await {
                result.add_file(&file_name, contents.clone());
                result.add_screenshot(detection_method, &file_name, &contents);
            }
        }
    }
    if options.take_screenshots_banner_only() {
        for (index, notice) in notices.iter().enumerate() {
            let file_name = format!("{detection_method}_banner_only-{index}.png");
            if let Some(contents) = take_screenshot_banner_only(
                page,
                notice.x,
                notice.y,
                notice.width as f64,
                notice.height as f64,
            )
            .await
            {
                result.add_file(&file_name, contents.clone());
                result.add_screenshot(detection_method, &file_name, &contents);
            }
        }
    }
}
