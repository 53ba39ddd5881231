//! HTTP contract of the external consent-banner classifier.

use bannerscan::detectors::classifier::ClassifierDetector;
use mockito::Server;

#[tokio::test]
async fn positive_verdicts_are_recognised() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_header("content-type", "application/json")
        .with_header("content-type", "application/json")
        .with_body(r#"{"is_consent_banner": 1}"#)
        .create_async()
        .await;

    let detector = ClassifierDetector::with_endpoint(server.url());
    let verdict = detector.classify("en", "We use cookies to improve your experience").await;
    assert_eq!(verdict, Some(true));
    mock.assert_async().await;
}

#[tokio::test]
async fn negative_verdicts_are_recognised() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_header("content-type", "application/json")
        .with_body(r#"{"is_consent_banner": 0}"#)
        .create_async()
        .await;

    let detector = ClassifierDetector::with_endpoint(server.url());
    let verdict = detector.classify("en", "Latest news headlines").await;
    assert_eq!(verdict, Some(false));
}

#[tokio::test]
async fn unusable_responses_read_as_unreachable() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_body("not json at all")
        .create_async()
        .await;

    let detector = ClassifierDetector::with_endpoint(server.url());
    assert_eq!(detector.classify("en", "anything").await, None);
}

#[tokio::test]
async fn unreachable_service_is_silent() {
    // Nothing listens on this port.
    let detector = ClassifierDetector::with_endpoint("http://127.0.0.1:1");
    assert_eq!(detector.classify("en", "anything").await, None);
}
