//! CDP event wiring for one tab.
//!
//! Event streams are drained on background tasks that mutate the shared
//! page logs; the scan task reads the logs only between protocol calls.
//! Four flags coordinate the two sides: `page_loaded`,
//! `document_will_change`, `debugger_attached` and `debugger_paused`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventRequestWillBeSent, EventResponseReceived, GetRequestPostDataParams,
    Response,
};
use chromiumoxide::cdp::browser_protocol::page::{
    EventFrameClearedScheduledNavigation, EventFrameScheduledNavigation, EventLoadEventFired,
};
use chromiumoxide::cdp::browser_protocol::security::EventSecurityStateChanged;
use chromiumoxide::cdp::js_protocol::debugger::{
    EvaluateOnCallFrameParams, EventPaused, EventResumed, EventScriptParsed, Location,
    ResumeParams, SetBreakpointParams,
};
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::bridge::js;
use crate::error::ScanError;
use crate::page::{
    FailedRequestEntry, POST_DATA_LIMIT, RequestEntry, ResponseEntry, SharedPageLogs,
    truncate_post_data,
};

/// Scheduled navigations further out than this are ignored; the scan is
/// assumed to finish within the margin.
const SCHEDULED_NAVIGATION_HORIZON_SECONDS: f64 = 60.0;

#[derive(Debug, Clone, Default)]
pub struct EventFlags {
    pub page_loaded: Arc<AtomicBool>,
    pub document_will_change: Arc<AtomicBool>,
    pub debugger_attached: Arc<AtomicBool>,
    pub debugger_paused: Arc<AtomicBool>,
}

impl EventFlags {
    pub fn clear(&self) {
        self.page_loaded.store(false, Ordering::SeqCst);
        self.document_will_change.store(false, Ordering::SeqCst);
        self.debugger_attached.store(false, Ordering::SeqCst);
        self.debugger_paused.store(false, Ordering::SeqCst);
    }
}

/// Installed event handlers for one tab. Aborting the tasks detaches the
/// tab from the shared logs.
pub struct EventHooks {
    pub flags: EventFlags,
    tasks: Vec<JoinHandle<()>>,
}

impl EventHooks {
    pub fn abort_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for EventHooks {
    fn drop(&mut self) {
        self.abort_all();
    }
}

fn resource_type_name<T: serde::Serialize>(resource_type: &T) -> Option<String> {
    serde_json::to_value(resource_type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
}

fn response_entry(request_id: String, response: &Response) -> ResponseEntry {
    let headers = serde_json::to_value(&response.headers).unwrap_or(Value::Null);
    let mut headers_lower = serde_json::Map::new();
    if let Value::Object(map) = &headers {
        for (name, value) in map {
            headers_lower.insert(name.to_lowercase(), value.clone());
        }
    }
    ResponseEntry {
        request_id,
        url: response.url.clone(),
        status: response.status,
        mime_type: response.mime_type.clone(),
        headers,
        headers_lower,
    }
}

/// Install all event handlers on a tab. The debugger handlers are only
/// installed when script execution is enabled.
pub async fn install(
    page: &Page,
    logs: SharedPageLogs,
    scripts_enabled: bool,
) -> Result<EventHooks, ScanError> {
    let flags = EventFlags::default();
    let mut tasks = Vec::new();

    // Network: requests (and the redirect responses they carry).
    {
        let mut events = page.event_listener::<EventRequestWillBeSent>().await?;
        let logs = logs.clone();
        let page = page.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let request_id = event.request_id.inner().clone();
                let has_post_data = event.request.has_post_data.unwrap_or(false);
                let post_data = if has_post_data {
                    match event.request.post_data.clone() {
                        Some(data) => Some(truncate_post_data(data, POST_DATA_LIMIT)),
                        None => {
                            // Large bodies are not inlined in the event.
                            let params = GetRequestPostDataParams::new(event.request_id.clone());
                            match page.execute(params).await {
                                Ok(response) => Some(truncate_post_data(
                                    response.result.post_data.clone(),
                                    POST_DATA_LIMIT,
                                )),
                                Err(_) => None,
                            }
                        }
                    }
                } else {
                    None
                };
                let entry = RequestEntry {
                    request_id: request_id.clone(),
                    url: event.request.url.clone(),
                    method: event.request.method.clone(),
                    headers: serde_json::to_value(&event.request.headers)
                        .unwrap_or(Value::Null),
                    document_url: Some(event.document_url.clone()),
                    resource_type: event.r#type.as_ref().and_then(resource_type_name),
                    frame_id: event.frame_id.as_ref().map(|id| id.inner().clone()),
                    post_data,
                    is_redirect_response: event.redirect_response.is_some(),
                };
                let mut logs = logs.lock();
                logs.add_request(entry);
                // Redirect requests have no received-response event; the
                // redirect response rides along here instead.
                if let Some(redirect_response) = &event.redirect_response {
                    logs.add_response(response_entry(request_id, redirect_response));
                }
            }
        }));
    }

    // Network: responses.
    {
        let mut events = page.event_listener::<EventResponseReceived>().await?;
        let logs = logs.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let entry = response_entry(event.request_id.inner().clone(), &event.response);
                logs.lock().add_response(entry);
            }
        }));
    }

    // Network: failures.
    {
        let mut events = page.event_listener::<EventLoadingFailed>().await?;
        let logs = logs.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let entry = FailedRequestEntry {
                    request_id: event.request_id.inner().clone(),
                    error_text: event.error_text.clone(),
                    canceled: event.canceled,
                    resource_type: resource_type_name(&event.r#type),
                };
                logs.lock().add_failed_request(entry);
            }
        }));
    }

    // Security state transitions.
    {
        let mut events = page.event_listener::<EventSecurityStateChanged>().await?;
        let logs = logs.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let state = serde_json::to_value(&*event).unwrap_or(Value::Null);
                logs.lock().add_security_state(state);
            }
        }));
    }

    // Page load.
    {
        let mut events = page.event_listener::<EventLoadEventFired>().await?;
        let page_loaded = flags.page_loaded.clone();
        tasks.push(tokio::spawn(async move {
            while events.next().await.is_some() {
                page_loaded.store(true, Ordering::SeqCst);
            }
        }));
    }

    // Scheduled navigations within the scan horizon.
    {
        let mut events = page.event_listener::<EventFrameScheduledNavigation>().await?;
        let document_will_change = flags.document_will_change.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.delay <= SCHEDULED_NAVIGATION_HORIZON_SECONDS {
                    document_will_change.store(true, Ordering::SeqCst);
                }
            }
        }));
    }
    {
        let mut events = page
            .event_listener::<EventFrameClearedScheduledNavigation>()
            .await?;
        let document_will_change = flags.document_will_change.clone();
        tasks.push(tokio::spawn(async move {
            while events.next().await.is_some() {
                document_will_change.store(false, Ordering::SeqCst);
            }
        }));
    }

    if scripts_enabled {
        install_debugger_hooks(page, &flags, &mut tasks).await?;
    }

    Ok(EventHooks { flags, tasks })
}

/// Debugger channel: attach to the on-new-document script when it first
/// parses, set a breakpoint on its `log` line, and keep the pause state in
/// step. Call-site arguments are extracted on every breakpoint hit.
async fn install_debugger_hooks(
    page: &Page,
    flags: &EventFlags,
    tasks: &mut Vec<JoinHandle<()>>,
) -> Result<(), ScanError> {
    // `hitBreakpoints` in the paused event is a list of plain strings.
    let log_breakpoint: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    {
        let mut events = page.event_listener::<EventScriptParsed>().await?;
        let page = page.clone();
        let attached = flags.debugger_attached.clone();
        let paused = flags.debugger_paused.clone();
        let log_breakpoint = log_breakpoint.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                // The first script parsed is the one installed through
                // Page.addScriptToEvaluateOnNewDocument.
                if attached.load(Ordering::SeqCst) {
                    continue;
                }
                let location = Location::builder()
                    .script_id(event.script_id.clone())
                    .line_number(js::ON_NEW_DOCUMENT_JAVASCRIPT_LINENO)
                    .build();
                let Ok(location) = location else { continue };
                let params = SetBreakpointParams::builder().location(location).build();
                let Ok(params) = params else { continue };
                match page.execute(params).await {
                    Ok(response) => {
                        *log_breakpoint.lock() =
                            Some(response.result.breakpoint_id.inner().clone());
                        if paused.load(Ordering::SeqCst) {
                            let _ = page.execute(ResumeParams::default()).await;
                        }
                        attached.store(true, Ordering::SeqCst);
                    }
                    Err(err) => trace!("setBreakpoint failed: {err}"),
                }
            }
        }));
    }

    {
        let mut events = page.event_listener::<EventPaused>().await?;
        let page = page.clone();
        let attached = flags.debugger_attached.clone();
        let paused = flags.debugger_paused.clone();
        let log_breakpoint = log_breakpoint.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                paused.store(true, Ordering::SeqCst);
                let hit_log_breakpoint = {
                    let breakpoint = log_breakpoint.lock();
                    match (&*breakpoint, &event.hit_breakpoints) {
                        (Some(id), Some(hits)) => hits.contains(id),
                        _ => false,
                    }
                };
                if hit_log_breakpoint {
                    for call_frame in &event.call_frames {
                        let params = EvaluateOnCallFrameParams::builder()
                            .call_frame_id(call_frame.call_frame_id.clone())
                            .expression(js::EXTRACT_ARGUMENTS_JAVASCRIPT)
                            .build();
                        let Ok(params) = params else { continue };
                        if let Ok(response) = page.execute(params).await {
                            let args = response
                                .result
                                .result
                                .value
                                .clone()
                                .unwrap_or(Value::Null);
                            trace!(
                                "log call at {} ({}): {args}",
                                call_frame.url, call_frame.function_name
                            );
                        }
                    }
                }
                if attached.load(Ordering::SeqCst) {
                    let _ = page.execute(ResumeParams::default()).await;
                }
            }
        }));
    }

    {
        let mut events = page.event_listener::<EventResumed>().await?;
        let paused = flags.debugger_paused.clone();
        tasks.push(tokio::spawn(async move {
            while events.next().await.is_some() {
                paused.store(false, Ordering::SeqCst);
            }
        }));
    }

    debug!("debugger hooks installed");
    Ok(())
}
