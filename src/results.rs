//! The scan result record: an insertion-ordered mapping with a binary file
//! side-channel, plus the typed banner and clickable records stored in it.
//!
//! The consumer (the external job-queue writer) persists both the mapping
//! and the attachments; nothing in here touches the filesystem.

use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::config::Resolution;

/// Kind of a clickable control inside a banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClickableKind {
    #[default]
    #[serde(rename = "button")]
    Button,
    #[serde(rename = "link")]
    Link,
    #[serde(rename = "checkbox")]
    Checkbox,
}

/// A clickable control discovered inside a banner candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Clickable {
    #[serde(rename = "localName", default)]
    pub local_name: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub fontsize: Option<String>,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(rename = "type", default)]
    pub kind: ClickableKind,
    #[serde(rename = "backgroundColor", default)]
    pub background_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub is_visible: bool,
    #[serde(default)]
    pub node_id: i64,
    #[serde(rename = "SSIM", default, skip_serializing_if = "Option::is_none")]
    pub ssim: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tracker_num: Option<u64>,
}

/// Structural and visual properties of one detected cookie notice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CookieNotice {
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub has_id: Option<bool>,
    #[serde(default)]
    pub has_class: Option<bool>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub fontsize: Option<String>,
    /// Pixels; a page-filling dimension is clamped to the configured
    /// resolution.
    #[serde(default)]
    pub width: i64,
    #[serde(default)]
    pub height: i64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub is_page_modal: bool,
    #[serde(default)]
    pub node_id: i64,
    #[serde(default)]
    pub clickables: Vec<Clickable>,
}

impl CookieNotice {
    /// Clamp a `full`-valued dimension to the configured resolution.
    pub fn clamp_full(value: &Value, full: u32) -> i64 {
        match value {
            Value::String(s) if s == "full" => i64::from(full),
            Value::Number(n) => n.as_f64().unwrap_or(0.0) as i64,
            _ => 0,
        }
    }

    pub fn buttons(&self) -> Vec<&Clickable> {
        self.clickables
            .iter()
            .filter(|c| c.kind == ClickableKind::Button)
            .collect()
    }
}

/// A binary attachment (screenshot) keyed by filename.
#[derive(Debug, Clone)]
pub struct ResultFile {
    pub filename: String,
    pub contents: Vec<u8>,
}

/// The result mapping with ordered updates and a file-attachment
/// side-channel. `serde_json` is built with `preserve_order`, so iteration
/// follows insertion order.
#[derive(Debug, Default)]
pub struct ScanResult {
    values: Map<String, Value>,
    files: Vec<ResultFile>,
}

impl ScanResult {
    pub fn new(site_url: impl Into<String>) -> Self {
        let mut result = Self::default();
        result.insert("site_url", site_url.into());
        result
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Serialize) {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.values.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(Value::as_str).map(str::to_owned)
    }

    pub fn u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn typed<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Banner records a detector stored under its own name, if any.
    pub fn notices(&self, detector: &str) -> Option<Vec<CookieNotice>> {
        self.typed(detector)
    }

    /// Store a detector's banner list and keep `cookie_notice_count` in
    /// step: the count always equals the list length.
    pub fn set_notices(&mut self, detector: &str, notices: &[CookieNotice]) {
        let count = notices.len();
        self.insert(detector, notices);
        let counts = self
            .values
            .entry("cookie_notice_count".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = counts {
            map.insert(detector.to_string(), json!(count));
        }
    }

    pub fn cookie_notice_count(&self, detector: &str) -> Option<u64> {
        self.get("cookie_notice_count")?
            .as_object()?
            .get(detector)?
            .as_u64()
    }

    /// Move the entire mapping out, leaving it empty. Used by the click
    /// replay to rehome the initial scan under `initial_result`.
    pub fn take_values(&mut self) -> Map<String, Value> {
        std::mem::take(&mut self.values)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }

    pub fn add_file(&mut self, filename: impl Into<String>, contents: Vec<u8>) {
        self.files.push(ResultFile {
            filename: filename.into(),
            contents,
        });
    }

    pub fn files(&self) -> &[ResultFile] {
        &self.files
    }

    /// Append a base64-embedded screenshot under `screenshots.<section>`.
    pub fn add_screenshot(&mut self, section: &str, filename: &str, contents: &[u8]) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(contents);
        let entry = json!({ "filename": filename, "contents": encoded });
        let screenshots = self
            .values
            .entry("screenshots".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = screenshots {
            match map.get_mut(section) {
                Some(Value::Array(list)) => list.push(entry),
                _ => {
                    map.insert(section.to_string(), Value::Array(vec![entry]));
                }
            }
        }
    }
}

/// Fetch a single banner from a detector entry: the first element when the
/// detector produced a list. Node ids may drift between reloads, so callers
/// re-match clickables by text afterwards.
pub fn fetch_single_notice(value: &Value) -> Option<CookieNotice> {
    let raw = match value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    serde_json::from_value(raw.clone()).ok()
}

/// Integer width/height with the `full` literal resolved against the
/// configured resolution.
pub fn notice_dimensions(map: &Map<String, Value>, resolution: Resolution) -> (i64, i64) {
    let width = map
        .get("width")
        .map(|v| CookieNotice::clamp_full(v, resolution.width))
        .unwrap_or(0);
    let height = map
        .get("height")
        .map(|v| CookieNotice::clamp_full(v, resolution.height))
        .unwrap_or(0);
    (width, height)
}
