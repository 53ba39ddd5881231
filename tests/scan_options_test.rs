//! Defaults and builder behaviour of the scan configuration.

use bannerscan::config::{DetectorKind, ScanOptions};

#[test]
fn defaults_match_the_deployed_configuration() {
    let options = ScanOptions::default();
    assert!(options.detectors().bert);
    assert!(options.detectors().easylist_cookie);
    assert!(options.detectors().i_dont_care_about_cookies);
    assert!(options.detectors().naive);
    assert!(options.detectors().perceptive);
    assert_eq!(
        options.detector_priorities(),
        &[
            DetectorKind::Bert,
            DetectorKind::Perceptive,
            DetectorKind::Naive,
            DetectorKind::IDontCareAboutCookies,
            DetectorKind::EasylistCookie,
        ]
    );
    assert!(options.javascript_enabled());
    assert!(options.take_screenshots());
    assert!(options.take_screenshots_banner_only());
    assert!(options.click_clickables());
    assert!(options.extract_privacy_policy());
    assert_eq!(options.resolution().width, 1920);
    assert_eq!(options.resolution().height, 1080);
    assert_eq!(options.timeout(), 60);
    assert_eq!(options.page_load_delay(), 5);
    assert!(!options.random_user_agent());
    assert!(!options.old_kw_detection());
    assert!(!options.save_logs());
}

#[test]
fn builder_overrides_stick() {
    let options = ScanOptions::builder()
        .storage_path("/tmp/bannerscan-test")
        .resolution(1280, 720)
        .timeout(30)
        .page_load_delay(2)
        .click_clickables(false)
        .extract_privacy_policy(false)
        .disable_javascript(true)
        .random_user_agent(true)
        .detector_priorities(vec![DetectorKind::EasylistCookie, DetectorKind::Naive])
        .build();

    assert_eq!(
        options.storage_path(),
        &std::path::PathBuf::from("/tmp/bannerscan-test")
    );
    assert_eq!(options.resolution().width, 1280);
    assert_eq!(options.timeout(), 30);
    assert_eq!(options.page_load_delay(), 2);
    assert!(!options.click_clickables());
    assert!(!options.extract_privacy_policy());
    assert!(!options.javascript_enabled());
    assert!(options.random_user_agent());
    assert_eq!(options.detector_priorities().len(), 2);
}

#[test]
fn detector_names_round_trip() {
    for kind in [
        DetectorKind::Bert,
        DetectorKind::Naive,
        DetectorKind::Perceptive,
        DetectorKind::EasylistCookie,
        DetectorKind::IDontCareAboutCookies,
    ] {
        assert_eq!(DetectorKind::from_name(kind.as_str()), Some(kind));
    }
    assert_eq!(DetectorKind::from_name("unknown"), None);
}

#[test]
fn replay_copy_disables_all_screenshots() {
    let options = ScanOptions::default().without_screenshots();
    assert!(!options.take_screenshots());
    assert!(!options.take_screenshots_banner_only());
    // Everything else is untouched.
    assert!(options.click_clickables());
}
