//! In-memory record of one navigation's network activity.
//!
//! [`PageLogs`] is written exclusively by the CDP event tasks (see
//! `scanner::events`) and read between protocol calls. `reset()` clears the
//! logs while keeping the tab, so the privacy-policy navigation and every
//! click replay observe only their own traffic.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Post data is truncated to avoid excessive memory usage per request.
pub const POST_DATA_LIMIT: usize = 64 * 1024;

/// One `requestWillBeSent` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEntry {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub url: String,
    pub method: String,
    pub headers: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<String>,
    pub post_data: Option<String>,
    /// Set when the event carried a `redirectResponse`.
    #[serde(default)]
    pub is_redirect_response: bool,
}

/// One received response (including redirect responses, which arrive
/// attached to the follow-up request event).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEntry {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub url: String,
    pub status: i64,
    pub mime_type: String,
    pub headers: Value,
    pub headers_lower: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRequestEntry {
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "errorText")]
    pub error_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canceled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

#[derive(Debug, Default)]
pub struct PageLogs {
    pub request_log: Vec<RequestEntry>,
    pub document_request_log: Vec<RequestEntry>,
    pub failed_request_log: Vec<FailedRequestEntry>,
    pub response_log: Vec<ResponseEntry>,
    pub security_state_log: Vec<Value>,
    response_lookup: HashMap<String, Vec<ResponseEntry>>,
    frame_id: Option<String>,
}

impl PageLogs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request. The first observed frameId identifies the tab's
    /// primary frame; thereafter a `Document` request in that frame that is
    /// not itself a redirect response marks a navigation boundary.
    pub fn add_request(&mut self, request: RequestEntry) {
        if self.frame_id.is_none() {
            self.frame_id = request.frame_id.clone();
        }
        let document_changed = request.resource_type.as_deref() == Some("Document")
            && request.frame_id.is_some()
            && request.frame_id == self.frame_id
            && !request.is_redirect_response;
        if document_changed {
            self.document_request_log.push(request.clone());
        }
        self.request_log.push(request);
    }

    pub fn add_response(&mut self, response: ResponseEntry) {
        self.response_lookup
            .entry(response.request_id.clone())
            .or_default()
            .push(response.clone());
        self.response_log.push(response);
    }

    pub fn add_failed_request(&mut self, failed: FailedRequestEntry) {
        self.failed_request_log.push(failed);
    }

    pub fn add_security_state(&mut self, state: Value) {
        self.security_state_log.push(state);
    }

    pub fn response_chain_by_id(&self, request_id: &str) -> Option<&[ResponseEntry]> {
        self.response_lookup
            .get(request_id)
            .map(|chain| chain.as_slice())
    }

    pub fn final_response_by_id(&self, request_id: &str) -> Option<&ResponseEntry> {
        self.response_chain_by_id(request_id)
            .and_then(|chain| chain.last())
    }

    /// Final response of the current document request, if any.
    pub fn final_response(&self) -> Option<&ResponseEntry> {
        let request_id = &self.document_request_log.last()?.request_id;
        self.final_response_by_id(request_id)
    }

    pub fn frame_id(&self) -> Option<&str> {
        self.frame_id.as_deref()
    }

    pub fn response_lookup_value(&self) -> Value {
        serde_json::to_value(&self.response_lookup).unwrap_or(Value::Null)
    }

    /// Clear all logs but keep the tab. Required before navigating to the
    /// privacy-policy page and before each click replay.
    pub fn reset(&mut self) {
        self.request_log.clear();
        self.document_request_log.clear();
        self.failed_request_log.clear();
        self.response_log.clear();
        self.security_state_log.clear();
        self.response_lookup.clear();
        self.frame_id = None;
    }
}

/// Handle shared between the scan task and the CDP event tasks.
pub type SharedPageLogs = Arc<Mutex<PageLogs>>;

pub fn shared_page_logs() -> SharedPageLogs {
    Arc::new(Mutex::new(PageLogs::new()))
}

/// Truncate to at most `limit` bytes without splitting a UTF-8 character.
pub fn truncate_post_data(mut data: String, limit: usize) -> String {
    if data.len() > limit {
        let mut cut = limit;
        while cut > 0 && !data.is_char_boundary(cut) {
            cut -= 1;
        }
        data.truncate(cut);
    }
    data
}
