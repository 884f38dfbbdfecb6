//! Outbound HTTP transport.
//!
//! The default transport drives a libcurl easy handle (curl crate) on tokio's
//! blocking pool. The transfer observes the request's [`CancelToken`] from the
//! progress callback and aborts once it fires.

use crate::cancel::{CancelReason, CancelToken};
use crate::config::TxConfig;
use crate::retry::RequestError;
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::str;
use std::time::Duration;

/// HTTP methods used against the transactions API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fully-resolved outbound request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Header (name, value) pairs, sent in order.
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// First header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response handed back to the caller for decoding.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u32,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as text; invalid UTF-8 is replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// Sends one request, honoring `cancel`.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: HttpRequest,
        cancel: CancelToken,
    ) -> impl Future<Output = Result<HttpResponse, RequestError>> + Send;
}

/// Tunables for the curl transport.
#[derive(Debug, Clone, Copy)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Hard cap enforced by libcurl itself, on top of the dispatcher's timeout.
    pub max_transfer_time: Option<Duration>,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            max_transfer_time: None,
        }
    }
}

impl CurlOptions {
    /// Connect timeout from config; libcurl's own transfer cap is the request
    /// timeout, so a transfer nobody waits for anymore still ends.
    pub fn from_config(cfg: &TxConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout(),
            max_transfer_time: Some(cfg.request_timeout()),
        }
    }
}

/// libcurl-backed transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurlTransport {
    options: CurlOptions,
}

impl CurlTransport {
    pub fn new(options: CurlOptions) -> Self {
        Self { options }
    }
}

impl Transport for CurlTransport {
    fn send(
        &self,
        request: HttpRequest,
        cancel: CancelToken,
    ) -> impl Future<Output = Result<HttpResponse, RequestError>> + Send {
        let options = self.options;
        async move {
            tokio::task::spawn_blocking(move || perform(&request, &cancel, options))
                .await
                .map_err(|e| RequestError::Worker(e.to_string()))?
        }
    }
}

/// Runs the transfer on the current thread.
fn perform(
    request: &HttpRequest,
    cancel: &CancelToken,
    options: CurlOptions,
) -> Result<HttpResponse, RequestError> {
    if let Some(reason) = cancel.reason() {
        return Err(RequestError::Aborted(reason));
    }

    let mut header_lines: Vec<String> = Vec::new();
    let mut body: Vec<u8> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(&request.url).map_err(RequestError::Curl)?;
    configure_method(&mut easy, request).map_err(RequestError::Curl)?;
    easy.follow_location(false).map_err(RequestError::Curl)?;
    easy.connect_timeout(options.connect_timeout)
        .map_err(RequestError::Curl)?;
    if let Some(limit) = options.max_transfer_time {
        easy.timeout(limit).map_err(RequestError::Curl)?;
    }
    easy.progress(true).map_err(RequestError::Curl)?;

    let mut list = curl::easy::List::new();
    for (k, v) in &request.headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))
            .map_err(RequestError::Curl)?;
    }
    easy.http_headers(list).map_err(RequestError::Curl)?;

    let outcome = {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    header_lines.push(s.trim_end().to_string());
                }
                true
            })
            .map_err(RequestError::Curl)?;
        transfer
            .write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(RequestError::Curl)?;
        // Returning false aborts the transfer with CURLE_ABORTED_BY_CALLBACK.
        transfer
            .progress_function(|_, _, _, _| !cancel.is_cancelled())
            .map_err(RequestError::Curl)?;
        transfer.perform()
    };

    if let Err(e) = outcome {
        if e.is_aborted_by_callback() {
            let reason = cancel.reason().unwrap_or(CancelReason::Caller);
            return Err(RequestError::Aborted(reason));
        }
        tracing::debug!("{} {} failed: {}", request.method, request.url, e);
        return Err(RequestError::Curl(e));
    }

    let status = easy.response_code().map_err(RequestError::Curl)?;
    Ok(HttpResponse {
        status,
        headers: parse_header_lines(&header_lines),
        body,
    })
}

fn configure_method(easy: &mut curl::easy::Easy, request: &HttpRequest) -> Result<(), curl::Error> {
    match request.method {
        Method::Get => easy.get(true)?,
        Method::Post => easy.post(true)?,
        Method::Put | Method::Delete => easy.custom_request(request.method.as_str())?,
    }
    match &request.body {
        Some(body) => easy.post_fields_copy(body)?,
        None if request.method == Method::Post => easy.post_field_size(0)?,
        None => {}
    }
    Ok(())
}

/// Keep only the header block of the final response, as (name, value) pairs.
fn parse_header_lines(lines: &[String]) -> Vec<(String, String)> {
    let mut headers = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.starts_with("HTTP/") {
            // A new status line starts a new header block (e.g. after 100 Continue).
            headers.clear();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_from_config_cap_transfer_at_request_timeout() {
        let cfg = TxConfig {
            request_timeout_ms: 1500,
            connect_timeout_ms: 250,
            ..TxConfig::default()
        };
        let opts = CurlOptions::from_config(&cfg);
        assert_eq!(opts.connect_timeout, Duration::from_millis(250));
        assert_eq!(opts.max_transfer_time, Some(Duration::from_millis(1500)));
        assert!(CurlOptions::default().max_transfer_time.is_none());
    }

    #[test]
    fn parse_header_lines_keeps_last_block() {
        let lines = [
            "HTTP/1.1 100 Continue".to_string(),
            "X-Interim: yes".to_string(),
            "".to_string(),
            "HTTP/1.1 200 OK".to_string(),
            "Content-Type: application/json".to_string(),
            "X-Request-Id: abc".to_string(),
        ];
        let headers = parse_header_lines(&lines);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0], ("Content-Type".to_string(), "application/json".to_string()));
    }

    #[test]
    fn response_helpers() {
        let resp = HttpResponse {
            status: 201,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: br#"{"ok":true}"#.to_vec(),
        };
        assert!(resp.is_success());
        assert_eq!(resp.header("Content-Type"), Some("application/json"));
        let v: serde_json::Value = resp.json().unwrap();
        assert_eq!(v["ok"], true);
        assert!(!HttpResponse {
            status: 404,
            ..Default::default()
        }
        .is_success());
    }

    #[tokio::test]
    async fn already_cancelled_token_short_circuits() {
        let cancel = CancelToken::new();
        cancel.cancel_with(CancelReason::Timeout);
        let req = HttpRequest {
            method: Method::Get,
            url: "http://127.0.0.1:9/".to_string(),
            headers: Vec::new(),
            body: None,
        };
        let err = CurlTransport::default().send(req, cancel).await.unwrap_err();
        assert!(matches!(err, RequestError::Aborted(CancelReason::Timeout)));
    }

    #[test]
    fn method_names() {
        assert_eq!(Method::Put.to_string(), "PUT");
        assert_eq!(Method::Delete.as_str(), "DELETE");
    }
}
