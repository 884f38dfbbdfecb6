//! Structured, classified representation of a failed request.

use super::error::RequestError;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// High-level classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorKind {
    /// Could not reach the server (connect, DNS, reset).
    Network,
    /// The attempt exceeded its time budget.
    Timeout,
    /// HTTP 5xx.
    Server,
    /// HTTP 4xx.
    Client,
    /// Anything else.
    Unknown,
}

/// Classified failure handed to callers of the dispatcher and the API.
///
/// Immutable once built; only the classifier constructs it.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDescriptor {
    kind: ErrorKind,
    message: String,
    #[serde(rename = "statusCode", skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    retryable: bool,
    #[serde(skip)]
    cause: Option<Arc<RequestError>>,
}

impl ErrorDescriptor {
    pub(crate) fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        status_code: Option<u16>,
        retryable: bool,
        cause: Option<RequestError>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code,
            retryable,
            cause: cause.map(Arc::new),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable message, safe to show to the end user.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Whether repeating the same request may succeed.
    pub fn retryable(&self) -> bool {
        self.retryable
    }

    /// The raw failure this descriptor was built from, when it was a request error.
    pub fn cause(&self) -> Option<&RequestError> {
        self.cause.as_deref()
    }
}

impl fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ErrorDescriptor {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_for_presentation_without_cause() {
        let d = ErrorDescriptor::new(
            ErrorKind::Client,
            "Recurso não encontrado.",
            Some(404),
            false,
            Some(RequestError::Http {
                status: 404,
                body: "missing".to_string(),
            }),
        );
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "CLIENT");
        assert_eq!(json["statusCode"], 404);
        assert_eq!(json["retryable"], false);
        assert!(json.get("cause").is_none());
    }

    #[test]
    fn display_is_message_and_source_is_cause() {
        use std::error::Error;
        let d = ErrorDescriptor::new(
            ErrorKind::Server,
            "Erro no servidor. Tente novamente em alguns instantes.",
            Some(502),
            true,
            Some(RequestError::Http {
                status: 502,
                body: "bad gateway".to_string(),
            }),
        );
        assert_eq!(
            d.to_string(),
            "Erro no servidor. Tente novamente em alguns instantes."
        );
        let source = d.source().expect("source");
        assert!(source.to_string().contains("502"));
        assert_eq!(d.cause().and_then(RequestError::status), Some(502));
    }
}
