//! Shared banner-property computation, page-language detection and the
//! keyword search that seeds the naive and perceptive detectors.

use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::dom::{
    GetSearchResultsParams, NodeId, PerformSearchParams,
};
use chromiumoxide::cdp::browser_protocol::emulation::SetScriptExecutionDisabledParams;
use image::RgbImage;
use serde_json::Value;
use tracing::trace;

use crate::bridge::{self, js, node};
use crate::config::ScanOptions;
use crate::detectors::clickable;
use crate::results::{CookieNotice, notice_dimensions};

/// Full banner-property record for a candidate node: clickable discovery,
/// geometry, modality, language and the `full` dimension clamping.
pub async fn cookie_notice_properties(
    page: &Page,
    node_id: NodeId,
    options: &ScanOptions,
    page_screenshot: Option<&RgbImage>,
) -> CookieNotice {
    let mut clickable_ids = clickable::find_clickables_in_node(page, node_id).await;
    dedupe_preserving_order(&mut clickable_ids);
    let clickables =
        clickable::clickables_properties(page, &clickable_ids, page_screenshot).await;

    let map = bridge::call_on_node_to_map(page, node_id, js::COOKIE_NOTICE_PROPERTIES_FUNCTION).await;
    if map.is_empty() {
        return CookieNotice {
            node_id: clickable::node_id_value(node_id),
            clickables,
            ..CookieNotice::default()
        };
    }

    let (width, height) = notice_dimensions(&map, options.resolution());
    let x = map.get("x").and_then(Value::as_f64).unwrap_or(0.0);
    let y = map.get("y").and_then(Value::as_f64).unwrap_or(0.0);
    let raw_width = map.get("width").cloned().unwrap_or(Value::Null);
    let raw_height = map.get("height").cloned().unwrap_or(Value::Null);
    let text = map
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut notice = CookieNotice {
        html: map.get("html").and_then(Value::as_str).map(str::to_owned),
        has_id: map.get("has_id").and_then(Value::as_bool),
        has_class: map.get("has_class").and_then(Value::as_bool),
        id: map.get("id").and_then(Value::as_str).map(str::to_owned),
        language: language_of(&text),
        text,
        fontsize: map
            .get("fontsize")
            .and_then(Value::as_str)
            .map(str::to_owned),
        width,
        height,
        x,
        y,
        is_page_modal: false,
        node_id: clickable::node_id_value(node_id),
        clickables,
    };
    clickable::remove_invisible_clickables(&mut notice);
    // The probe receives the raw dimensions so a `full` banner covers the
    // whole viewport during the test.
    let rect = node::banner_rect(x, y, &raw_width, &raw_height);
    notice.is_page_modal = node::is_page_modal(page, &rect).await;
    notice
}

pub async fn cookie_notices_properties(
    page: &Page,
    node_ids: &[NodeId],
    options: &ScanOptions,
    page_screenshot: Option<&RgbImage>,
) -> Vec<CookieNotice> {
    let mut notices = Vec::with_capacity(node_ids.len());
    for node_id in node_ids {
        notices.push(cookie_notice_properties(page, *node_id, options, page_screenshot).await);
    }
    notices
}

fn dedupe_preserving_order(node_ids: &mut Vec<NodeId>) {
    let mut seen = std::collections::HashSet::new();
    node_ids.retain(|id| seen.insert(*id.inner()));
}

/// Detected language of the whole page body.
pub async fn detect_language(page: &Page) -> Option<String> {
    let result = bridge::evaluate(page, js::BODY_INNER_TEXT).await?;
    let text = result.value?;
    language_of(text.as_str()?)
}

/// Language of a text snippet as the two-letter code the privacy-wording
/// list uses. Unmapped languages keep their ISO 639-3 code and simply find
/// no wording entry.
pub fn language_of(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }
    let info = whatlang::detect(text)?;
    Some(two_letter_code(info.lang()).to_string())
}

fn two_letter_code(lang: whatlang::Lang) -> &'static str {
    use whatlang::Lang;
    match lang {
        Lang::Eng => "en",
        Lang::Deu => "de",
        Lang::Fra => "fr",
        Lang::Spa => "es",
        Lang::Ita => "it",
        Lang::Nld => "nl",
        Lang::Por => "pt",
        Lang::Pol => "pl",
        Lang::Swe => "sv",
        Lang::Dan => "da",
        Lang::Fin => "fi",
        Lang::Rus => "ru",
        Lang::Ces => "cs",
        Lang::Ell => "el",
        Lang::Hun => "hu",
        Lang::Ron => "ro",
        Lang::Bul => "bg",
        Lang::Ukr => "uk",
        Lang::Tur => "tr",
        Lang::Slv => "sl",
        Lang::Hrv => "hr",
        Lang::Lit => "lt",
        Lang::Lav => "lv",
        Lang::Est => "et",
        other => other.code(),
    }
}

/// Search the DOM for a literal string, case-insensitively, returning the
/// parent element of each matching text node. Script execution is paused
/// for the duration so results do not change mid-search.
pub async fn search_for_string(page: &Page, options: &ScanOptions, needle: &str) -> Vec<NodeId> {
    let scripts_enabled = options.javascript_enabled();
    if scripts_enabled {
        let _ = page
            .execute(SetScriptExecutionDisabledParams::new(true))
            .await;
    }

    // Matching on text nodes and taking the parent catches elements that
    // contain more than one text node.
    let query = format!(
        "//body//*/text()[contains(translate(., 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), '{needle}')]/parent::*"
    );
    let mut node_ids = Vec::new();
    match page.execute(PerformSearchParams::new(query)).await {
        Ok(search) => {
            let result_count = search.result.result_count;
            if result_count > 0 {
                let params = GetSearchResultsParams::builder()
                    .search_id(search.result.search_id.clone())
                    .from_index(0)
                    .to_index(result_count)
                    .build();
                if let Ok(params) = params
                    && let Ok(results) = page.execute(params).await
                {
                    node_ids = results.result.node_ids.clone();
                }
            }
        }
        Err(err) => trace!("performSearch failed: {err}"),
    }

    let mut filtered = Vec::with_capacity(node_ids.len());
    for node_id in node_ids {
        if !node::is_script_or_style_node(page, node_id).await {
            filtered.push(node_id);
        }
    }

    if scripts_enabled {
        let _ = page
            .execute(SetScriptExecutionDisabledParams::new(false))
            .await;
    }
    filtered
}

/// Keyword-seeded coordinate for the naive and perceptive detectors.
#[derive(Debug, Clone)]
pub struct SeedCandidate {
    pub node_id: NodeId,
    pub x: f64,
    pub y: f64,
    pub word_count: usize,
    pub text: String,
}

/// The on-viewport candidate with the most words around the search string.
/// Candidates with fewer than four words or off-viewport coordinates are
/// rejected.
pub async fn search_and_get_coordinates(
    page: &Page,
    options: &ScanOptions,
    needle: &str,
) -> Option<SeedCandidate> {
    let nodes = search_for_string(page, options, needle).await;
    let resolution = options.resolution();
    let mut candidates: Vec<SeedCandidate> = Vec::new();
    for node_id in nodes {
        let Some(dimensions) = node::node_dimensions(page, node_id).await else {
            continue;
        };
        let Some(text) = node::node_text(page, node_id).await else {
            continue;
        };
        if text.is_empty() {
            continue;
        }
        let word_count = text.split(' ').count();
        let off_viewport = (dimensions.x == 0.0 && dimensions.y == 0.0)
            || dimensions.x >= f64::from(resolution.width)
            || dimensions.y >= f64::from(resolution.height);
        if off_viewport || word_count < 4 {
            continue;
        }
        candidates.push(SeedCandidate {
            node_id,
            x: dimensions.x,
            y: dimensions.y,
            word_count,
            text,
        });
    }
    candidates.sort_by(|a, b| b.word_count.cmp(&a.word_count));
    candidates.into_iter().next()
}
