//! Error types for the scan controller and the job entry point.
//!
//! Failures partition into retry/no-retry classes: on the first try every
//! terminal condition surfaces as [`RetryScan`] so the external job queue
//! reschedules; on later tries the scan completes normally and the condition
//! is recorded as a [`ChromeError`] code with `reachable = false`.

use serde::Serialize;
use thiserror::Error;

/// Terminal condition codes recorded under `chrome_error` in the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChromeError {
    #[serde(rename = "timeout")]
    Timeout,
    #[serde(rename = "startup-problem")]
    StartupProblem,
    #[serde(rename = "not-reachable")]
    NotReachable,
    #[serde(rename = "dns-not-resolved")]
    DnsNotResolved,
    #[serde(rename = "websocket-exception-interaction")]
    WebsocketExceptionInteraction,
    #[serde(rename = "websocket-exception-no-interaction")]
    WebsocketExceptionNoInteraction,
    #[serde(rename = "banner_gone")]
    BannerGone,
}

impl ChromeError {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChromeError::Timeout => "timeout",
            ChromeError::StartupProblem => "startup-problem",
            ChromeError::NotReachable => "not-reachable",
            ChromeError::DnsNotResolved => "dns-not-resolved",
            ChromeError::WebsocketExceptionInteraction => "websocket-exception-interaction",
            ChromeError::WebsocketExceptionNoInteraction => "websocket-exception-no-interaction",
            ChromeError::BannerGone => "banner_gone",
        }
    }
}

/// Failures raised by the per-site scan controller.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("navigation timed out after {0} seconds")]
    NavigationTimeout(u64),

    #[error("chrome startup problem: {0}")]
    Startup(String),

    #[error("neither responses nor failed requests")]
    NotReachable,

    #[error("DNS could not be resolved")]
    DnsNotResolved,

    #[error("devtools transport error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScanError {
    /// The `chrome_error` code this failure records on a non-first try.
    /// `interacted` selects between the two transport-crash codes.
    pub fn chrome_error(&self, interacted: bool) -> Option<ChromeError> {
        match self {
            ScanError::NavigationTimeout(_) => Some(ChromeError::Timeout),
            ScanError::Startup(_) => Some(ChromeError::StartupProblem),
            ScanError::NotReachable => Some(ChromeError::NotReachable),
            ScanError::DnsNotResolved => Some(ChromeError::DnsNotResolved),
            ScanError::Cdp(_) => Some(if interacted {
                ChromeError::WebsocketExceptionInteraction
            } else {
                ChromeError::WebsocketExceptionNoInteraction
            }),
            ScanError::Io(_) | ScanError::Other(_) => None,
        }
    }

    /// Transport crashes after at least one click never retry; state on the
    /// site is already mutated.
    pub fn is_retryable(&self, interacted: bool) -> bool {
        match self {
            ScanError::Cdp(_) => !interacted,
            ScanError::NavigationTimeout(_)
            | ScanError::Startup(_)
            | ScanError::NotReachable
            | ScanError::DnsNotResolved => true,
            ScanError::Io(_) | ScanError::Other(_) => false,
        }
    }
}

/// Signal for the external job queue to reschedule this scan.
#[derive(Debug, Error)]
#[error("scan should be retried: {reason}")]
pub struct RetryScan {
    pub reason: String,
}

impl RetryScan {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
