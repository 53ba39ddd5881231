//! Remote-object bridge: the thin semantic layer between node identifiers,
//! remote-object handles and plain value trees.
//!
//! Every operation that can fail on a stale handle, a cross-origin
//! restriction or a transport hiccup returns a neutral default (`None`,
//! empty list, empty map) instead of propagating the failure. Detectors and
//! extractors rely on this to stay linear.

pub mod js;
pub mod node;

use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::dom::{NodeId, RequestNodeParams, ResolveNodeParams};
use chromiumoxide::cdp::js_protocol::runtime::{
    CallArgument, CallFunctionOnParams, GetPropertiesParams, PropertyDescriptor, RemoteObject,
    RemoteObjectId, RemoteObjectSubtype, RemoteObjectType,
};
use serde_json::{Map, Value};
use tracing::trace;

/// Remote-object handle for a node id. `None` on a stale id.
pub async fn resolve_node(page: &Page, node_id: NodeId) -> Option<RemoteObjectId> {
    let params = ResolveNodeParams::builder().node_id(node_id).build();
    match page.execute(params).await {
        Ok(response) => response.result.object.object_id.clone(),
        Err(err) => {
            trace!("resolveNode failed for {:?}: {err}", node_id);
            None
        }
    }
}

/// Node id for a remote-object handle.
pub async fn request_node(page: &Page, object_id: &RemoteObjectId) -> Option<NodeId> {
    match page.execute(RequestNodeParams::new(object_id.clone())).await {
        Ok(response) => Some(response.result.node_id),
        Err(err) => {
            trace!("requestNode failed: {err}");
            None
        }
    }
}

/// Evaluate an expression in the page's global scope.
pub async fn evaluate(page: &Page, expression: &str) -> Option<RemoteObject> {
    match page.evaluate(expression).await {
        Ok(result) => Some(result.object().clone()),
        Err(err) => {
            trace!("evaluate failed: {err}");
            None
        }
    }
}

/// Call a function with `this` bound to the element behind `object_id`.
pub async fn call_on(
    page: &Page,
    object_id: &RemoteObjectId,
    function_declaration: &str,
    arguments: Vec<CallArgument>,
) -> Option<RemoteObject> {
    let params = CallFunctionOnParams::builder()
        .function_declaration(function_declaration)
        .object_id(object_id.clone())
        .arguments(arguments)
        .silent(true)
        .build()
        .ok()?;
    match page.execute(params).await {
        Ok(response) => Some(response.result.result.clone()),
        Err(err) => {
            trace!("callFunctionOn failed: {err}");
            None
        }
    }
}

/// Own properties of a remote object; empty on failure.
pub async fn properties_of(page: &Page, object_id: &RemoteObjectId) -> Vec<PropertyDescriptor> {
    let params = match GetPropertiesParams::builder()
        .object_id(object_id.clone())
        .own_properties(true)
        .build()
    {
        Ok(params) => params,
        Err(_) => return Vec::new(),
    };
    match page.execute(params).await {
        Ok(response) => response.result.result.clone(),
        Err(err) => {
            trace!("getProperties failed: {err}");
            Vec::new()
        }
    }
}

/// An attribute holding a plain value: enumerable and not object-typed, or
/// a null subtype.
pub fn is_primitive_attribute(attribute: &PropertyDescriptor) -> bool {
    let Some(value) = attribute.value.as_ref() else {
        return false;
    };
    let non_object = !matches!(value.r#type, RemoteObjectType::Object);
    let null_subtype = matches!(value.subtype, Some(RemoteObjectSubtype::Null));
    (attribute.enumerable && non_object) || null_subtype
}

/// An attribute holding an array.
pub fn is_array_attribute(attribute: &PropertyDescriptor) -> bool {
    let Some(value) = attribute.value.as_ref() else {
        return false;
    };
    attribute.enumerable
        && matches!(value.r#type, RemoteObjectType::Object)
        && matches!(value.subtype, Some(RemoteObjectSubtype::Array))
}

/// Plain values of an array handle, in order.
pub async fn array_to_value_list(page: &Page, object_id: &RemoteObjectId) -> Vec<Value> {
    properties_of(page, object_id)
        .await
        .into_iter()
        .filter(|attribute| attribute.enumerable)
        .filter_map(|attribute| attribute.value)
        .map(|value| value.value.unwrap_or(Value::Null))
        .collect()
}

/// Node ids for an array of elements. Stale entries are silently dropped.
pub async fn array_to_node_ids(page: &Page, object_id: &RemoteObjectId) -> Vec<NodeId> {
    let element_ids: Vec<RemoteObjectId> = properties_of(page, object_id)
        .await
        .into_iter()
        .filter(|attribute| attribute.enumerable)
        .filter_map(|attribute| attribute.value)
        .filter_map(|value| value.object_id)
        .collect();
    let mut node_ids = Vec::with_capacity(element_ids.len());
    for element_id in &element_ids {
        if let Some(node_id) = request_node(page, element_id).await {
            node_ids.push(node_id);
        }
    }
    node_ids
}

/// Plain mapping of an object handle. Primitives are copied, nested arrays
/// are converted to value lists, deeper object graphs are dropped.
pub async fn object_to_value_map(page: &Page, object_id: &RemoteObjectId) -> Map<String, Value> {
    let attributes = properties_of(page, object_id).await;
    let mut map = Map::new();
    for attribute in &attributes {
        if is_primitive_attribute(attribute) {
            let value = attribute
                .value
                .as_ref()
                .and_then(|v| v.value.clone())
                .unwrap_or(Value::Null);
            map.insert(attribute.name.clone(), value);
        }
    }
    for attribute in &attributes {
        if is_array_attribute(attribute) {
            if let Some(array_id) = attribute.value.as_ref().and_then(|v| v.object_id.clone()) {
                let list = array_to_value_list(page, &array_id).await;
                map.insert(attribute.name.clone(), Value::Array(list));
            }
        }
    }
    map
}

/// Shorthand: call a function on a node and convert the returned object
/// into a plain value map.
pub async fn call_on_node_to_map(
    page: &Page,
    node_id: NodeId,
    function_declaration: &str,
) -> Map<String, Value> {
    let Some(object_id) = resolve_node(page, node_id).await else {
        return Map::new();
    };
    let Some(result) = call_on(page, &object_id, function_declaration, Vec::new()).await else {
        return Map::new();
    };
    match result.object_id {
        Some(result_id) => object_to_value_map(page, &result_id).await,
        None => Map::new(),
    }
}
