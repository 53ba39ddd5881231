//! Loading the cached auxiliary data from a storage path.

use bannerscan::config::ScanOptions;
use bannerscan::detectors::filter_list::FilterListDetector;
use bannerscan::extractors::trackers::TrackerExtractor;
use tempfile::TempDir;

fn options_with_storage(storage: &TempDir) -> ScanOptions {
    ScanOptions::builder()
        .storage_path(storage.path().to_path_buf())
        .build()
}

#[test]
fn tracker_extractor_reads_the_derived_catalogue() {
    let storage = TempDir::new().unwrap();
    let disconnect_dir = storage.path().join("disconnect");
    std::fs::create_dir_all(&disconnect_dir).unwrap();
    std::fs::write(
        disconnect_dir.join("disconnect.json"),
        r#"{
            "categories": {
                "Advertising": [
                    { "AdCo": { "https://adco.example/": ["adnetwork.example"] } }
                ]
            }
        }"#,
    )
    .unwrap();

    let extractor = TrackerExtractor::new(&options_with_storage(&storage)).unwrap();
    assert!(
        extractor
            .check_against_disconnect_list("https://x.adnetwork.example/p.gif")
            .is_some()
    );
}

#[test]
fn tracker_extractor_fails_without_the_catalogue() {
    let storage = TempDir::new().unwrap();
    assert!(TrackerExtractor::new(&options_with_storage(&storage)).is_err());
}

#[test]
fn filter_list_detector_reads_both_enabled_lists() {
    let storage = TempDir::new().unwrap();
    let lists_dir = storage.path().join("cookie_lists");
    std::fs::create_dir_all(&lists_dir).unwrap();
    std::fs::write(lists_dir.join("easylist-cookie.txt"), "##.cookie-banner\n").unwrap();
    std::fs::write(
        lists_dir.join("i-dont-care-about-cookies.txt"),
        "##.consent\nexample.com##.site\n",
    )
    .unwrap();

    assert!(FilterListDetector::new(&options_with_storage(&storage)).is_ok());
}

#[test]
fn filter_list_detector_fails_on_missing_lists() {
    let storage = TempDir::new().unwrap();
    assert!(FilterListDetector::new(&options_with_storage(&storage)).is_err());
}
