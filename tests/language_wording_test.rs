//! Page-language detection codes and the privacy-wording keyword lookup.

use bannerscan::detectors::notice::language_of;
use bannerscan::extractors::privacy_policy::{
    WordingEntry, search_through_clickables, words_for_language,
};
use bannerscan::results::{Clickable, ClickableKind, CookieNotice};

#[test]
fn detection_yields_two_letter_codes() {
    let english = "This website uses cookies to ensure you get the best experience \
                   on our website. Please accept our policy to continue browsing.";
    assert_eq!(language_of(english).as_deref(), Some("en"));

    let german = "Diese Webseite verwendet Cookies, um Ihnen das beste Erlebnis zu \
                  ermöglichen. Bitte akzeptieren Sie unsere Richtlinien.";
    assert_eq!(language_of(german).as_deref(), Some("de"));

    assert_eq!(language_of(""), None);
    assert_eq!(language_of("   "), None);
}

fn wording() -> Vec<WordingEntry> {
    serde_json::from_str(
        r#"[
            { "country": "en", "words": ["privacy", "data protection"] },
            { "country": "de", "words": ["datenschutz"] }
        ]"#,
    )
    .unwrap()
}

#[test]
fn wording_lookup_is_keyed_by_language_code() {
    let wording = wording();
    assert_eq!(
        words_for_language(&wording, "de"),
        Some(vec!["datenschutz".to_string()])
    );
    assert!(words_for_language(&wording, "fr").is_none());
}

#[test]
fn first_clickable_containing_a_keyword_wins() {
    let notice = CookieNotice {
        clickables: vec![
            Clickable {
                text: "Accept all".to_string(),
                kind: ClickableKind::Button,
                node_id: 1,
                ..Clickable::default()
            },
            Clickable {
                text: "Privacy Policy".to_string(),
                kind: ClickableKind::Link,
                node_id: 2,
                ..Clickable::default()
            },
            Clickable {
                text: "More about privacy".to_string(),
                kind: ClickableKind::Link,
                node_id: 3,
                ..Clickable::default()
            },
        ],
        ..CookieNotice::default()
    };
    let words = words_for_language(&wording(), "en").unwrap();
    // The match is case-insensitive on the clickable side.
    let found = search_through_clickables(&notice, &words).unwrap();
    assert_eq!(found.node_id, 2);
}

#[test]
fn no_keyword_match_means_no_policy_clickable() {
    let notice = CookieNotice {
        clickables: vec![Clickable {
            text: "Accept".to_string(),
            kind: ClickableKind::Button,
            node_id: 1,
            ..Clickable::default()
        }],
        ..CookieNotice::default()
    };
    let words = words_for_language(&wording(), "en").unwrap();
    assert!(search_through_clickables(&notice, &words).is_none());
}
