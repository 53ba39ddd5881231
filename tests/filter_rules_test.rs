//! Parsing and domain applicability of the element-hiding filter rules.

use bannerscan::detectors::filter_list::{AdblockPlusFilter, scan_domain};

const SAMPLE_LIST: &str = r#"[Adblock Plus 2.0]
! Title: Sample Cookie List
! Expires: 4 days
##.cookie-banner
##div#consent-overlay
example.com##.site-specific-banner
example.com,other.org###gdpr
~excluded.net##.exclusion-only
news.example##.newsbar
example.com#@#.unhidden
||tracker.example^$third-party
"#;

#[test]
fn only_element_hiding_rules_survive_parsing() {
    let filter = AdblockPlusFilter::parse(SAMPLE_LIST);
    // Comments, metadata, URL-pattern rules and exception rules are gone.
    assert_eq!(filter.len(), 6);
}

#[test]
fn generic_rules_apply_everywhere() {
    let filter = AdblockPlusFilter::parse(SAMPLE_LIST);
    let selectors = filter.applicable_selectors("unrelated.host");
    assert!(selectors.contains(&".cookie-banner"));
    assert!(selectors.contains(&"div#consent-overlay"));
    assert!(!selectors.contains(&".site-specific-banner"));
}

#[test]
fn domain_limited_rules_need_a_matching_host() {
    let filter = AdblockPlusFilter::parse(SAMPLE_LIST);
    let selectors = filter.applicable_selectors("www.example.com");
    assert!(selectors.contains(&".site-specific-banner"));
    assert!(selectors.contains(&"#gdpr"));
    assert!(!selectors.contains(&".newsbar"));
}

#[test]
fn exclusion_only_rules_are_globally_applicable() {
    let filter = AdblockPlusFilter::parse(SAMPLE_LIST);
    let selectors = filter.applicable_selectors("anything.at.all");
    assert!(selectors.contains(&".exclusion-only"));
}

#[test]
fn applicability_substring_test_is_unanchored() {
    // The option domain only has to occur somewhere in the scan host.
    let filter = AdblockPlusFilter::parse("example.com##.banner\n");
    assert!(
        filter
            .applicable_selectors("notreallyexample.com.evil.net")
            .contains(&".banner")
    );
}

#[test]
fn scan_domain_strips_scheme_and_path() {
    assert_eq!(scan_domain("https://www.example.com/index.html"), "www.example.com");
    assert_eq!(scan_domain("http://example.com"), "example.com");
    assert_eq!(scan_domain("example.com"), "example.com");
}

#[test]
fn empty_and_whitespace_lines_are_skipped() {
    let filter = AdblockPlusFilter::parse("\n\n   \n##.a\n");
    assert_eq!(filter.len(), 1);
    assert!(!filter.is_empty());
}
