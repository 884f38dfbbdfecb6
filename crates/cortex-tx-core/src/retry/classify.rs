//! Classify request failures into error descriptors.
//!
//! Rules, first match wins: connection failure, timeout, 5xx, 4xx, anything else.

use super::descriptor::{ErrorDescriptor, ErrorKind};
use super::error::RequestError;
use crate::cancel::CancelReason;
use std::io;

const NETWORK_MESSAGE: &str = "Erro de conexão. Verifique sua internet e tente novamente.";
const TIMEOUT_MESSAGE: &str = "A requisição demorou muito para responder. Tente novamente.";
const SERVER_MESSAGE: &str = "Erro no servidor. Tente novamente em alguns instantes.";
const CANCELLED_MESSAGE: &str = "Requisição cancelada.";
const UNKNOWN_MESSAGE: &str = "Erro desconhecido";

/// Classification outcome before a cause is attached.
struct Verdict {
    kind: ErrorKind,
    message: String,
    status_code: Option<u16>,
    retryable: bool,
}

impl Verdict {
    fn network() -> Self {
        Self::fixed(ErrorKind::Network, NETWORK_MESSAGE, true)
    }

    fn timeout() -> Self {
        Self::fixed(ErrorKind::Timeout, TIMEOUT_MESSAGE, true)
    }

    fn unknown(message: String) -> Self {
        let message = if message.trim().is_empty() {
            UNKNOWN_MESSAGE.to_string()
        } else {
            message
        };
        Self {
            kind: ErrorKind::Unknown,
            message,
            status_code: None,
            retryable: false,
        }
    }

    fn fixed(kind: ErrorKind, message: &str, retryable: bool) -> Self {
        Self {
            kind,
            message: message.to_string(),
            status_code: None,
            retryable,
        }
    }

    fn with_status(mut self, status_code: Option<u16>) -> Self {
        self.status_code = status_code;
        self
    }

    fn into_descriptor(self, cause: Option<RequestError>) -> ErrorDescriptor {
        ErrorDescriptor::new(
            self.kind,
            self.message,
            self.status_code,
            self.retryable,
            cause,
        )
    }
}

/// User-facing message for a 4xx status.
pub fn client_error_message(status: u16) -> &'static str {
    match status {
        401 => "Não autorizado. Faça login novamente.",
        403 => "Acesso negado. Você não tem permissão para esta ação.",
        404 => "Recurso não encontrado.",
        429 => "Muitas requisições. Aguarde um momento e tente novamente.",
        _ => "Erro na requisição. Verifique os dados e tente novamente.",
    }
}

/// Classify an HTTP status into (kind, retryable).
pub fn classify_http_status(status: u32) -> (ErrorKind, bool) {
    match status {
        500.. => (ErrorKind::Server, true),
        400..=499 => (ErrorKind::Client, false),
        _ => (ErrorKind::Unknown, false),
    }
}

fn http_verdict(status: u32, fallback: String) -> Verdict {
    let code = u16::try_from(status).ok();
    let (kind, retryable) = classify_http_status(status);
    let message = match (kind, code) {
        (ErrorKind::Server, _) => SERVER_MESSAGE.to_string(),
        (ErrorKind::Client, Some(code)) => client_error_message(code).to_string(),
        _ => return Verdict::unknown(fallback).with_status(code),
    };
    Verdict {
        kind,
        message,
        status_code: code,
        retryable,
    }
}

fn curl_verdict(e: &curl::Error) -> Verdict {
    if e.is_operation_timedout() {
        return Verdict::timeout();
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_ssl_connect_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return Verdict::network();
    }
    Verdict::unknown(e.to_string())
}

fn io_verdict(e: &io::Error) -> Verdict {
    match e.kind() {
        io::ErrorKind::TimedOut => Verdict::timeout(),
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => Verdict::network(),
        _ => Verdict::unknown(e.to_string()),
    }
}

fn request_verdict(e: &RequestError) -> Verdict {
    match e {
        RequestError::Curl(ce) => curl_verdict(ce),
        RequestError::Aborted(CancelReason::Timeout) => Verdict::timeout(),
        RequestError::Aborted(CancelReason::Caller) => {
            Verdict::fixed(ErrorKind::Unknown, CANCELLED_MESSAGE, false)
        }
        RequestError::Http { status, .. } => http_verdict(*status, e.to_string()),
        RequestError::Worker(_) => Verdict::unknown(e.to_string()),
    }
}

/// Classify a failed request attempt. Never fails; keeps the failure as the cause.
pub fn classify(e: RequestError) -> ErrorDescriptor {
    request_verdict(&e).into_descriptor(Some(e))
}

/// Classify an arbitrary error by looking for a known failure type along its
/// source chain. Falls back to `Unknown` with the error's own message.
pub fn classify_error(e: &(dyn std::error::Error + 'static)) -> ErrorDescriptor {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(e);
    while let Some(err) = current {
        if let Some(d) = err.downcast_ref::<ErrorDescriptor>() {
            return d.clone();
        }
        if let Some(re) = err.downcast_ref::<RequestError>() {
            return request_verdict(re).into_descriptor(None);
        }
        if let Some(ce) = err.downcast_ref::<curl::Error>() {
            return curl_verdict(ce).into_descriptor(None);
        }
        if let Some(ioe) = err.downcast_ref::<io::Error>() {
            return io_verdict(ioe).into_descriptor(None);
        }
        current = err.source();
    }
    Verdict::unknown(e.to_string()).into_descriptor(None)
}
