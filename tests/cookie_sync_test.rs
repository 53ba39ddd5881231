//! Identifier-cookie classification and sync-matching boundaries.

use bannerscan::extractors::cookie_sync::{check_cookies, check_identity_sync, sync_domain};
use serde_json::{Value, json};

fn one_year_plus(days: i64) -> f64 {
    chrono::Utc::now().timestamp() as f64 + (365 + days) as f64 * 86_400.0
}

fn cookie(value: &str, expires: f64) -> Value {
    json!({ "name": "uid", "value": value, "domain": ".example.com", "expires": expires })
}

#[test]
fn long_lived_cookies_are_identifier_candidates() {
    let cookies = [cookie("abcdef1234567890abcdef", one_year_plus(2))];
    let id_cookies = check_cookies(&cookies);
    assert_eq!(id_cookies.len(), 1);
    assert!(id_cookies[0].get("zxcvbn").is_some());
}

#[test]
fn short_lived_weak_cookies_are_not_candidates() {
    // Two days of lifetime and a guessable value.
    let expires = chrono::Utc::now().timestamp() as f64 + 2.0 * 86_400.0;
    let cookies = [cookie("abcdef1234567890abcdef", expires)];
    assert!(check_cookies(&cookies).is_empty());
}

#[test]
fn strong_values_qualify_regardless_of_expiry() {
    let expires = chrono::Utc::now().timestamp() as f64 + 3_600.0;
    let cookies = [cookie("h7G$k9Lq2xZv8Wm4Rt6Yp3Ns5Bd1Fj0c", expires)];
    assert_eq!(check_cookies(&cookies).len(), 1);
}

#[test]
fn empty_values_never_qualify() {
    let cookies = [cookie("", one_year_plus(30))];
    assert!(check_cookies(&cookies).is_empty());
}

#[test]
fn short_lived_cookie_never_syncs_even_on_substring_hit() {
    let expires = chrono::Utc::now().timestamp() as f64 + 2.0 * 86_400.0;
    let cookies = [cookie("abcdef1234567890abcdef", expires)];
    let id_cookies = check_cookies(&cookies);
    let urls = ["https://tracker.example/pix?u=abcdef1234567890abcdef".to_string()];
    assert!(check_identity_sync(&id_cookies, &urls).is_empty());
}

#[test]
fn long_lived_cookie_in_outbound_url_yields_one_sync() {
    let cookies = [cookie("abcdef1234567890abcdef", one_year_plus(2))];
    let id_cookies = check_cookies(&cookies);
    let urls = ["https://tracker.example/pix?u=abcdef1234567890abcdef".to_string()];
    let syncs = check_identity_sync(&id_cookies, &urls);
    assert_eq!(syncs.len(), 1);
    assert_eq!(
        syncs[0].get("cookie_value").and_then(Value::as_str),
        Some("abcdef1234567890abcdef")
    );
    assert_eq!(
        syncs[0].get("sync_request").and_then(Value::as_str),
        Some(urls[0].as_str())
    );
}

#[test]
fn values_of_ten_or_fewer_characters_never_sync() {
    let cookies = [cookie("id12345678", one_year_plus(2))];
    let id_cookies = check_cookies(&cookies);
    assert_eq!(id_cookies.len(), 1);
    let urls = ["https://tracker.example/p?u=id12345678".to_string()];
    assert!(check_identity_sync(&id_cookies, &urls).is_empty());
}

#[test]
fn sync_domain_is_the_suffix_tuple_join() {
    assert_eq!(
        sync_domain("https://www.tracker.example.com/p"),
        "www.tracker.example.com"
    );
    // An empty subdomain leaves a leading dot.
    assert_eq!(sync_domain("https://example.com/p"), ".example.com");
}
