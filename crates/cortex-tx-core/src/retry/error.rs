//! Raw failure of a single request attempt, before classification.

use crate::cancel::CancelReason;
use std::fmt;

/// Error returned by a single request attempt (curl failure, HTTP error, or abort).
/// Kept typed so the classifier can inspect it before it becomes an `ErrorDescriptor`.
#[derive(Debug)]
pub enum RequestError {
    /// Curl reported an error (connection, DNS, its own timeout, etc.).
    Curl(curl::Error),
    /// Response arrived with a non-2xx status. `body` is the response text.
    Http { status: u32, body: String },
    /// The merged cancellation token fired before the response arrived.
    Aborted(CancelReason),
    /// The blocking worker running the transfer panicked or was cancelled.
    Worker(String),
}

impl RequestError {
    /// HTTP status carried by this failure, if any.
    pub fn status(&self) -> Option<u32> {
        match self {
            RequestError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Curl(e) => write!(f, "{}", e),
            RequestError::Http { status, body } => {
                write!(f, "Erro na requisição: {} {}", status, body)
            }
            RequestError::Aborted(CancelReason::Timeout) => {
                write!(f, "timeout: A requisição demorou muito para responder")
            }
            RequestError::Aborted(CancelReason::Caller) => write!(f, "request cancelled"),
            RequestError::Worker(msg) => write!(f, "transfer worker failed: {}", msg),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestError::Curl(e) => Some(e),
            RequestError::Http { .. } | RequestError::Aborted(_) | RequestError::Worker(_) => None,
        }
    }
}
