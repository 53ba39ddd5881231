//! Identifier-cookie detection and cookie-sync matching.
//!
//! A cookie counts as an identifier candidate when it lives long enough or
//! its value is strong enough to distinguish a user. A sync is an outbound
//! request carrying such a value in its URL.

use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::page::SharedPageLogs;
use crate::results::ScanResult;

/// Minimum lifetime of an identifier candidate.
const ONE_YEAR_SECONDS: f64 = 60.0 * 60.0 * 24.0 * 365.0;
/// Minimum password-strength score (log10 of guess count).
const MIN_GUESSES_LOG10: f64 = 9.0;
/// Values this short produce too many incidental substring hits.
const MIN_SYNC_VALUE_LEN: usize = 10;

pub struct CookieSyncExtractor;

impl CookieSyncExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Publish `id_cookies`, `cookie_syncs` and `cookie_syncs_num` from the
    /// collected cookies and the request log.
    pub async fn extract_information(
        &self,
        logs: &SharedPageLogs,
        result: &mut ScanResult,
    ) -> anyhow::Result<()> {
        let cookies = result
            .get("cookies")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let id_cookies = check_cookies(&cookies);

        let request_urls: Vec<String> = {
            let logs = logs.lock();
            logs.request_log.iter().map(|r| r.url.clone()).collect()
        };
        let cookie_syncs = check_identity_sync(&id_cookies, &request_urls);
        debug!(
            "{} identifier cookie(s), {} sync(s)",
            id_cookies.len(),
            cookie_syncs.len()
        );
        result.insert("id_cookies", id_cookies);
        result.insert("cookie_syncs_num", cookie_syncs.len());
        result.insert("cookie_syncs", cookie_syncs);
        Ok(())
    }
}

impl Default for CookieSyncExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier candidates: non-empty value, and either an expiry at least a
/// year out or a guess count of 1e9 or more. The strength score is attached
/// under `zxcvbn`; an infinite score collapses to 1.
pub fn check_cookies(cookies: &[Value]) -> Vec<Value> {
    let one_year_from_now = chrono::Utc::now().timestamp() as f64 + ONE_YEAR_SECONDS;
    let mut id_cookies = Vec::new();
    for cookie in cookies {
        let Some(value) = cookie.get("value").and_then(Value::as_str) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        let expires = cookie
            .get("expires")
            .and_then(Value::as_f64)
            .unwrap_or(-1.0);
        let strength = guesses_log10(value);
        if expires >= one_year_from_now || strength >= MIN_GUESSES_LOG10 {
            let mut id_cookie = cookie.clone();
            if let Some(object) = id_cookie.as_object_mut() {
                let recorded = if strength.is_finite() { strength } else { 1.0 };
                object.insert("zxcvbn".to_string(), json!(recorded));
            }
            id_cookies.push(id_cookie);
        }
    }
    id_cookies
}

/// Sync matches: an identifier value longer than ten characters appearing
/// verbatim inside a recorded request URL.
pub fn check_identity_sync(id_cookies: &[Value], request_urls: &[String]) -> Vec<Value> {
    let mut synced = Vec::new();
    for cookie in id_cookies {
        let Some(value) = cookie.get("value").and_then(Value::as_str) else {
            continue;
        };
        if value.len() <= MIN_SYNC_VALUE_LEN {
            continue;
        }
        for url in request_urls {
            if url.contains(value) {
                synced.push(json!({
                    "cookie_value": value,
                    "sync_domain": sync_domain(url),
                    "sync_request": url,
                    "zxcvbn": cookie.get("zxcvbn").cloned().unwrap_or(Value::Null),
                }));
            }
        }
    }
    synced
}

fn guesses_log10(value: &str) -> f64 {
    zxcvbn::zxcvbn(value, &[]).guesses_log10()
}

/// `subdomain.domain.suffix` of a request host, joined even when a part is
/// empty.
pub fn sync_domain(url: &str) -> String {
    let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_owned)) else {
        return String::new();
    };
    let registered = psl::domain_str(&host).unwrap_or(&host).to_string();
    let suffix = psl::suffix_str(&host).unwrap_or_default().to_string();
    let domain_label = match registered.strip_suffix(&format!(".{suffix}")) {
        Some(label) if !suffix.is_empty() => label.to_string(),
        _ => registered.clone(),
    };
    let subdomain = host
        .strip_suffix(&registered)
        .map(|s| s.trim_end_matches('.'))
        .unwrap_or_default()
        .to_string();
    format!("{subdomain}.{domain_label}.{suffix}")
}
