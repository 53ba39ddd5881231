//! Retry/no-retry partitioning of scan failures.

use bannerscan::error::{ChromeError, RetryScan, ScanError};

#[test]
fn chrome_error_codes_use_the_wire_spelling() {
    assert_eq!(ChromeError::Timeout.as_str(), "timeout");
    assert_eq!(ChromeError::StartupProblem.as_str(), "startup-problem");
    assert_eq!(ChromeError::NotReachable.as_str(), "not-reachable");
    assert_eq!(ChromeError::DnsNotResolved.as_str(), "dns-not-resolved");
    assert_eq!(
        ChromeError::WebsocketExceptionInteraction.as_str(),
        "websocket-exception-interaction"
    );
    assert_eq!(
        ChromeError::WebsocketExceptionNoInteraction.as_str(),
        "websocket-exception-no-interaction"
    );
    assert_eq!(ChromeError::BannerGone.as_str(), "banner_gone");
}

#[test]
fn navigation_failures_map_to_their_codes() {
    assert_eq!(
        ScanError::NavigationTimeout(60).chrome_error(false),
        Some(ChromeError::Timeout)
    );
    assert_eq!(
        ScanError::Startup("no chrome".into()).chrome_error(false),
        Some(ChromeError::StartupProblem)
    );
    assert_eq!(
        ScanError::NotReachable.chrome_error(false),
        Some(ChromeError::NotReachable)
    );
    assert_eq!(
        ScanError::DnsNotResolved.chrome_error(false),
        Some(ChromeError::DnsNotResolved)
    );
}

#[test]
fn transport_code_depends_on_interaction_state() {
    let err = ScanError::Cdp(chromiumoxide::error::CdpError::Timeout);
    assert_eq!(
        err.chrome_error(false),
        Some(ChromeError::WebsocketExceptionNoInteraction)
    );
    assert_eq!(
        err.chrome_error(true),
        Some(ChromeError::WebsocketExceptionInteraction)
    );
}

#[test]
fn transport_crash_after_interaction_never_retries() {
    let err = ScanError::Cdp(chromiumoxide::error::CdpError::Timeout);
    assert!(err.is_retryable(false));
    assert!(!err.is_retryable(true));
}

#[test]
fn pre_interaction_terminal_conditions_are_retryable() {
    assert!(ScanError::NavigationTimeout(60).is_retryable(false));
    assert!(ScanError::Startup("boom".into()).is_retryable(false));
    assert!(ScanError::NotReachable.is_retryable(false));
    assert!(ScanError::DnsNotResolved.is_retryable(false));
}

#[test]
fn retry_scan_is_downcastable_from_anyhow() {
    let err: anyhow::Error = RetryScan::new("first timeout with Chrome").into();
    let retry = err.downcast_ref::<RetryScan>().unwrap();
    assert_eq!(retry.reason, "first timeout with Chrome");
}
