//! Clickable discovery and properties inside a banner candidate.

use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::dom::NodeId;
use image::RgbImage;
use serde_json::Value;

use crate::bridge::{self, js, node};
use crate::imaging;
use crate::results::{Clickable, ClickableKind, CookieNotice};

/// Node ids of the covering clickable elements inside a node.
pub async fn find_clickables_in_node(page: &Page, node_id: NodeId) -> Vec<NodeId> {
    let Some(object_id) = bridge::resolve_node(page, node_id).await else {
        return Vec::new();
    };
    let Some(result) = bridge::call_on(page, &object_id, js::FIND_CLICKABLES_FUNCTION, Vec::new()).await
    else {
        return Vec::new();
    };
    match result.object_id {
        Some(array_id) => bridge::array_to_node_ids(page, &array_id).await,
        None => Vec::new(),
    }
}

/// Structural properties plus visibility and sampled background colour for
/// one clickable.
pub async fn clickable_properties(
    page: &Page,
    node_id: NodeId,
    page_screenshot: Option<&RgbImage>,
) -> Clickable {
    let map = bridge::call_on_node_to_map(page, node_id, js::CLICKABLE_PROPERTIES_FUNCTION).await;
    if !map.contains_key("html") {
        return Clickable {
            node_id: node_id_value(node_id),
            is_visible: false,
            ..Clickable::default()
        };
    }
    let mut clickable: Clickable =
        serde_json::from_value(Value::Object(map)).unwrap_or_default();
    clickable.node_id = node_id_value(node_id);
    clickable.is_visible = node::is_node_visible(page, node_id).await.is_visible;
    clickable.role = String::new();

    if clickable.is_visible {
        if let Some(screenshot) = page_screenshot {
            clickable.background_color = imaging::most_frequent_color(
                screenshot,
                clickable.x as i64,
                clickable.y as i64,
                clickable.width as i64,
                clickable.height as i64,
            );
        }
    } else {
        clickable.background_color = "rgb(255,255,255)".to_string();
    }
    clickable
}

pub async fn clickables_properties(
    page: &Page,
    node_ids: &[NodeId],
    page_screenshot: Option<&RgbImage>,
) -> Vec<Clickable> {
    let mut clickables = Vec::with_capacity(node_ids.len());
    for node_id in node_ids {
        clickables.push(clickable_properties(page, *node_id, page_screenshot).await);
    }
    clickables
}

/// Node ids change between page reloads; the stable handle to a clickable
/// is its text.
pub fn get_by_text<'a>(target: &Clickable, clickables: &'a [Clickable]) -> Option<&'a Clickable> {
    clickables.iter().find(|c| c.text == target.text)
}

pub fn get_by_kind(clickables: &[Clickable], kind: ClickableKind) -> Vec<Clickable> {
    clickables
        .iter()
        .filter(|c| c.kind == kind)
        .cloned()
        .collect()
}

/// Clickables sharing an identical SSIM score with another clickable.
pub fn clickables_with_same_ssim(clickables: &[Clickable]) -> Vec<Clickable> {
    let mut same: Vec<Clickable> = Vec::new();
    for a in clickables {
        let Some(ssim_a) = a.ssim else { continue };
        for b in clickables {
            let Some(ssim_b) = b.ssim else { continue };
            if a.node_id != b.node_id && ssim_a == ssim_b {
                for candidate in [a, b] {
                    if !same.iter().any(|c| c.node_id == candidate.node_id) {
                        same.push(candidate.clone());
                    }
                }
            }
        }
    }
    same
}

pub fn remove_invisible_clickables(notice: &mut CookieNotice) {
    notice.clickables.retain(|c| c.is_visible);
}

pub fn node_id_value(node_id: NodeId) -> i64 {
    *node_id.inner()
}
