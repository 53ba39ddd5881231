//! The result record: count invariants, ordered updates, the
//! move-to-initial rehoming and the attachment side-channel.

use bannerscan::results::{
    Clickable, ClickableKind, CookieNotice, ScanResult, fetch_single_notice,
};
use serde_json::{Value, json};

fn notice(text: &str) -> CookieNotice {
    CookieNotice {
        text: text.to_string(),
        width: 600,
        height: 200,
        clickables: vec![Clickable {
            text: "OK".to_string(),
            kind: ClickableKind::Button,
            is_visible: true,
            node_id: 12,
            ..Clickable::default()
        }],
        ..CookieNotice::default()
    }
}

#[test]
fn notice_count_always_equals_list_length() {
    let mut result = ScanResult::new("https://example.com");
    result.set_notices("easylist-cookie", &[notice("We use cookies")]);
    result.set_notices("naive", &[notice("a"), notice("b")]);

    assert_eq!(result.cookie_notice_count("easylist-cookie"), Some(1));
    assert_eq!(
        result.notices("easylist-cookie").unwrap().len() as u64,
        result.cookie_notice_count("easylist-cookie").unwrap()
    );
    assert_eq!(result.cookie_notice_count("naive"), Some(2));
    assert_eq!(result.cookie_notice_count("perceptive"), None);
}

#[test]
fn updates_preserve_insertion_order() {
    let mut result = ScanResult::new("https://example.com");
    result.insert("language", "en");
    result.insert("disconnect_num", 0);
    result.insert("cookie_syncs_num", 0);
    let keys: Vec<&String> = result.values().keys().collect();
    assert_eq!(
        keys,
        vec!["site_url", "language", "disconnect_num", "cookie_syncs_num"]
    );
}

#[test]
fn take_values_supports_the_rehoming_move() {
    let mut result = ScanResult::new("https://example.com");
    result.insert("language", "de");
    result.insert("total_tracker_num", 3);

    let initial = result.take_values();
    assert!(result.values().is_empty());
    result.insert("initial_result", Value::Object(initial));
    result.insert("site_url", "https://example.com");

    let stored = result.get("initial_result").unwrap();
    assert_eq!(stored["site_url"], "https://example.com");
    assert_eq!(stored["total_tracker_num"], 3);
}

#[test]
fn attachments_are_kept_separately_from_values() {
    let mut result = ScanResult::new("https://example.com");
    result.add_file("shot.png", vec![1, 2, 3]);
    result.add_screenshot("initial_page_load", "shot.png", &[1, 2, 3]);

    assert_eq!(result.files().len(), 1);
    assert_eq!(result.files()[0].filename, "shot.png");
    let embedded = &result.get("screenshots").unwrap()["initial_page_load"][0];
    assert_eq!(embedded["filename"], "shot.png");
    assert_eq!(embedded["contents"], "AQID");
}

#[test]
fn fetch_single_notice_takes_the_first_of_a_list() {
    let list = json!([
        { "text": "first", "node_id": 1 },
        { "text": "second", "node_id": 2 }
    ]);
    assert_eq!(fetch_single_notice(&list).unwrap().text, "first");

    let single = json!({ "text": "only", "node_id": 3 });
    assert_eq!(fetch_single_notice(&single).unwrap().node_id, 3);

    assert!(fetch_single_notice(&json!([])).is_none());
}

#[test]
fn full_dimensions_clamp_to_the_resolution() {
    use bannerscan::config::Resolution;
    use bannerscan::results::notice_dimensions;
    let map = json!({ "width": "full", "height": 240 });
    let Value::Object(map) = map else { unreachable!() };
    let (width, height) = notice_dimensions(
        &map,
        Resolution {
            width: 1920,
            height: 1080,
        },
    );
    assert_eq!(width, 1920);
    assert_eq!(height, 240);
}

#[test]
fn buttons_accessor_filters_by_kind() {
    let mut banner = notice("We value your privacy");
    banner.clickables.push(Clickable {
        text: "policy".to_string(),
        kind: ClickableKind::Link,
        node_id: 13,
        ..Clickable::default()
    });
    assert_eq!(banner.buttons().len(), 1);
    assert_eq!(banner.buttons()[0].text, "OK");
}
