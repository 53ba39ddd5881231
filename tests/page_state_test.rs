//! Invariants of the per-navigation page state.

use bannerscan::page::{
    FailedRequestEntry, PageLogs, RequestEntry, ResponseEntry, truncate_post_data,
};
use serde_json::{Map, Value, json};

fn request(id: &str, url: &str, resource_type: &str, frame: &str, redirect: bool) -> RequestEntry {
    RequestEntry {
        request_id: id.to_string(),
        url: url.to_string(),
        method: "GET".to_string(),
        headers: json!({}),
        document_url: Some(url.to_string()),
        resource_type: Some(resource_type.to_string()),
        frame_id: Some(frame.to_string()),
        post_data: None,
        is_redirect_response: redirect,
    }
}

fn response(id: &str, url: &str, status: i64) -> ResponseEntry {
    ResponseEntry {
        request_id: id.to_string(),
        url: url.to_string(),
        status,
        mime_type: "text/html".to_string(),
        headers: json!({"Content-Type": "text/html"}),
        headers_lower: {
            let mut map = Map::new();
            map.insert("content-type".to_string(), Value::String("text/html".into()));
            map
        },
    }
}

#[test]
fn first_frame_becomes_primary_and_documents_are_tracked() {
    let mut logs = PageLogs::new();
    logs.add_request(request("1", "https://example.com/", "Document", "frame-a", false));
    logs.add_request(request("2", "https://example.com/app.js", "Script", "frame-a", false));
    // A document load in a different frame is not a navigation boundary.
    logs.add_request(request("3", "https://ads.example/frame", "Document", "frame-b", false));
    // A redirect hop in the main frame is not one either.
    logs.add_request(request("4", "https://example.com/next", "Document", "frame-a", true));

    assert_eq!(logs.frame_id(), Some("frame-a"));
    assert_eq!(logs.request_log.len(), 4);
    assert_eq!(logs.document_request_log.len(), 1);
    assert_eq!(logs.document_request_log[0].request_id, "1");
}

#[test]
fn redirect_chain_final_response_is_last_element() {
    let mut logs = PageLogs::new();
    logs.add_response(response("1", "https://example.com/", 301));
    logs.add_response(response("1", "https://www.example.com/", 200));
    logs.add_response(response("2", "https://cdn.example.com/a.css", 200));

    let chain = logs.response_chain_by_id("1").unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(
        logs.final_response_by_id("1").unwrap().url,
        chain.last().unwrap().url
    );
    assert_eq!(logs.final_response_by_id("1").unwrap().status, 200);
    assert!(logs.response_chain_by_id("unknown").is_none());
}

#[test]
fn final_response_follows_current_document() {
    let mut logs = PageLogs::new();
    logs.add_request(request("1", "https://example.com/", "Document", "frame-a", false));
    logs.add_response(response("1", "https://example.com/", 200));
    assert_eq!(logs.final_response().unwrap().request_id, "1");
}

#[test]
fn reset_clears_all_logs_and_frame_id() {
    let mut logs = PageLogs::new();
    logs.add_request(request("1", "https://example.com/", "Document", "frame-a", false));
    logs.add_response(response("1", "https://example.com/", 200));
    logs.add_failed_request(FailedRequestEntry {
        request_id: "2".to_string(),
        error_text: "net::ERR_NAME_NOT_RESOLVED".to_string(),
        canceled: Some(false),
        resource_type: Some("Image".to_string()),
    });
    logs.add_security_state(json!({"securityState": "secure"}));

    logs.reset();

    assert!(logs.request_log.is_empty());
    assert!(logs.document_request_log.is_empty());
    assert!(logs.failed_request_log.is_empty());
    assert!(logs.response_log.is_empty());
    assert!(logs.security_state_log.is_empty());
    assert!(logs.frame_id().is_none());
    assert!(logs.final_response().is_none());
}

#[test]
fn post_data_truncation_respects_char_boundaries() {
    let ascii = "x".repeat(100_000);
    assert_eq!(truncate_post_data(ascii, 65_536).len(), 65_536);

    let short = "short".to_string();
    assert_eq!(truncate_post_data(short.clone(), 65_536), short);

    // A multi-byte character straddling the limit is dropped entirely.
    let mut tricky = "a".repeat(65_535);
    tricky.push('é');
    let truncated = truncate_post_data(tricky, 65_536);
    assert_eq!(truncated.len(), 65_535);
    assert!(truncated.is_char_boundary(truncated.len()));
}
