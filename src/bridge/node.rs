//! Node-level utilities on top of the remote-object bridge: visibility,
//! text extraction, clicking, geometry and the modality probe.

use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::dom::{DescribeNodeParams, NodeId};
use chromiumoxide::cdp::js_protocol::runtime::RemoteObjectType;
use serde_json::json;
use tracing::trace;

use super::js;

/// Lower-cased tag name of a node, e.g. `div`.
pub async fn node_name(page: &Page, node_id: NodeId) -> Option<String> {
    let params = DescribeNodeParams::builder().node_id(node_id).build();
    match page.execute(params).await {
        Ok(response) => Some(response.result.node.node_name.to_lowercase()),
        Err(err) => {
            trace!("describeNode failed for {:?}: {err}", node_id);
            None
        }
    }
}

pub async fn is_script_or_style_node(page: &Page, node_id: NodeId) -> bool {
    matches!(
        node_name(page, node_id).await.as_deref(),
        Some("script") | Some("style")
    )
}

/// Outcome of the visibility test. When the element itself fails on
/// size/centre but a descendant passes, the descendant is the proxy.
#[derive(Debug, Default, Clone, Copy)]
pub struct Visibility {
    pub is_visible: bool,
    pub visible_node: Option<NodeId>,
}

pub async fn is_node_visible(page: &Page, node_id: NodeId) -> Visibility {
    let Some(object_id) = super::resolve_node(page, node_id).await else {
        return Visibility::default();
    };
    let Some(result) = super::call_on(page, &object_id, js::IS_VISIBLE_FUNCTION, Vec::new()).await
    else {
        return Visibility::default();
    };

    // A boolean means invisible (or visible without proxy); an element
    // handle means the node or one of its children is visible.
    if matches!(result.r#type, RemoteObjectType::Boolean) {
        return Visibility {
            is_visible: result.value.and_then(|v| v.as_bool()).unwrap_or(false),
            visible_node: None,
        };
    }
    let visible_node = match result.object_id {
        Some(ref handle) => super::request_node(page, handle).await,
        None => None,
    };
    Visibility {
        is_visible: true,
        visible_node,
    }
}

pub async fn filter_visible_nodes(page: &Page, node_ids: Vec<NodeId>) -> Vec<NodeId> {
    let mut visible = Vec::with_capacity(node_ids.len());
    for node_id in node_ids {
        if is_node_visible(page, node_id).await.is_visible {
            visible.push(node_id);
        }
    }
    visible
}

/// Inner text of a node, `None` when the node is gone or has no text.
pub async fn node_text(page: &Page, node_id: NodeId) -> Option<String> {
    let map = super::call_on_node_to_map(page, node_id, js::GET_TEXT_FUNCTION).await;
    map.get("text")?.as_str().map(str::to_owned)
}

/// Click an element through its own `click()` handler.
pub async fn click_node(page: &Page, node_id: NodeId) -> bool {
    let Some(object_id) = super::resolve_node(page, node_id).await else {
        return false;
    };
    super::call_on(page, &object_id, js::CLICK_NODE_FUNCTION, Vec::new())
        .await
        .is_some()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Dimensions {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

pub async fn node_dimensions(page: &Page, node_id: NodeId) -> Option<Dimensions> {
    let map = super::call_on_node_to_map(page, node_id, js::GET_DIMENSIONS_FUNCTION).await;
    if map.is_empty() {
        return None;
    }
    let field = |name: &str| map.get(name).and_then(|v| v.as_f64()).unwrap_or(0.0);
    Some(Dimensions {
        x: field("x"),
        y: field("y"),
        width: field("width"),
        height: field("height"),
    })
}

/// Parent node id, or `None` once the walk reaches `<body>`.
pub async fn parent_node(page: &Page, node_id: NodeId) -> Option<NodeId> {
    let object_id = super::resolve_node(page, node_id).await?;
    let result = super::call_on(page, &object_id, js::GET_PARENT_NODE_FUNCTION, Vec::new()).await?;
    match result.object_id {
        Some(handle) => super::request_node(page, &handle).await,
        None => None,
    }
}

/// Probe eight viewport-margin points; the banner is modal when every probe
/// outside its rectangle hits the same element.
pub async fn is_page_modal(page: &Page, banner_rect: &serde_json::Value) -> bool {
    let script = js::MODALITY_PROBE_TEMPLATE.replace(
        "__cookie_notice__",
        &serde_json::to_string(banner_rect).unwrap_or_else(|_| "null".into()),
    );
    match super::evaluate(page, &script).await {
        Some(result) => result.value.and_then(|v| v.as_bool()).unwrap_or(false),
        None => false,
    }
}

/// Rectangle as the modality probe expects it: `width`/`height` may carry
/// the literal `full`.
pub fn banner_rect(x: f64, y: f64, width: &serde_json::Value, height: &serde_json::Value) -> serde_json::Value {
    json!({ "x": x, "y": y, "width": width, "height": height })
}
