//! Tracker matching against a miniature Disconnect catalogue.

use bannerscan::extractors::trackers::{TrackerExtractor, registered_domain};
use serde_json::json;

fn catalogue() -> TrackerExtractor {
    TrackerExtractor::from_value(json!({
        "categories": {
            "Advertising": [
                {
                    "AdCo": {
                        "https://adco.example/": ["adnetwork.example", "short"]
                    }
                }
            ],
            "Analytics": [
                {
                    "MetricsInc": {
                        "https://metrics.example/": ["usagestats.example"],
                        "performance": "true"
                    }
                }
            ]
        }
    }))
}

#[test]
fn matching_request_yields_category_and_company() {
    let extractor = catalogue();
    let hit = extractor
        .check_against_disconnect_list("https://cdn.adnetwork.example/pixel.gif")
        .unwrap();
    assert_eq!(hit.category, "Advertising");
    assert_eq!(hit.company, "AdCo");
    assert_eq!(hit.company_url, "https://adco.example/");
    assert_eq!(hit.domain, "adnetwork.example");
}

#[test]
fn same_site_requests_are_suppressed() {
    let extractor = catalogue();
    // The request's registered domain equals the catalogue domain.
    assert!(
        extractor
            .check_against_disconnect_list("https://adnetwork.example/self.js")
            .is_none()
    );
}

#[test]
fn trivial_domains_never_match() {
    let extractor = catalogue();
    // "short" appears in the URL but is too short to count.
    assert!(
        extractor
            .check_against_disconnect_list("https://short.page/short")
            .is_none()
    );
}

#[test]
fn marker_entries_are_ignored() {
    let extractor = catalogue();
    // The "performance": "true" marker must not be treated as a domain list.
    let hit = extractor.check_against_disconnect_list("https://usagestats.example/beacon");
    assert_eq!(hit.unwrap().company, "MetricsInc");
}

#[test]
fn matching_is_deterministic_over_a_request_log() {
    let extractor = catalogue();
    let urls = [
        "https://cdn.adnetwork.example/a.js",
        "https://example.com/",
        "https://usagestats.example/b.js",
    ];
    let first: Vec<_> = urls
        .iter()
        .map(|url| extractor.check_against_disconnect_list(url))
        .collect();
    let second: Vec<_> = urls
        .iter()
        .map(|url| extractor.check_against_disconnect_list(url))
        .collect();
    assert_eq!(first, second);
    assert!(first[0].is_some());
    assert!(first[1].is_none());
    assert!(first[2].is_some());
}

#[test]
fn registered_domain_uses_the_public_suffix_list() {
    assert_eq!(
        registered_domain("https://sub.example.co.uk/x").as_deref(),
        Some("example.co.uk")
    );
    assert_eq!(
        registered_domain("https://www.example.com/").as_deref(),
        Some("example.com")
    );
    assert_eq!(registered_domain("not a url"), None);
}
