//! Request dispatcher: one logical call to the API with auth, timeout and retries.
//!
//! Each attempt reads the bearer token, builds its own header set and merged
//! cancellation token, and races the transport against the caller's token and
//! the timeout. A 401 clears the stored token and redirects to the auth entry
//! point before the failure is reported.

use crate::cancel::CancelToken;
use crate::config::TxConfig;
use crate::retry::{classify, ErrorDescriptor, RequestError, Retrier, RetryPolicy, Sleeper, TokioSleeper};
use crate::session::{CredentialsProvider, Navigator};
use crate::transport::{CurlOptions, CurlTransport, HttpRequest, HttpResponse, Method, Transport};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);
const JSON_CONTENT_TYPE: &str = "application/json";

/// Per-call options. Built fresh for every call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// Path appended to the base URL, e.g. `/account/transaction/42`.
    pub path: String,
    pub body: Option<Vec<u8>>,
    /// Extra headers; a `Content-Type` here replaces the JSON default.
    pub headers: Vec<(String, String)>,
    pub enable_retry: bool,
    /// Per-attempt budget; `None` uses the dispatcher's default.
    pub timeout: Option<Duration>,
    /// Caller-side cancellation, merged with the timeout.
    pub cancel: Option<CancelToken>,
}

impl RequestOptions {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            enable_retry: true,
            timeout: None,
            cancel: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn json<B: Serialize + ?Sized>(self, value: &B) -> serde_json::Result<Self> {
        Ok(self.body(serde_json::to_vec(value)?))
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn retry(mut self, enable: bool) -> Self {
        self.enable_retry = enable;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_on(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Issues requests against one base URL.
pub struct Dispatcher<T = CurlTransport, S = TokioSleeper> {
    base_url: String,
    transport: T,
    credentials: Arc<dyn CredentialsProvider>,
    navigator: Arc<dyn Navigator>,
    retrier: Retrier<S>,
    auth_redirect: String,
    default_timeout: Duration,
}

impl Dispatcher<CurlTransport, TokioSleeper> {
    /// Curl-backed dispatcher configured from `cfg`.
    pub fn from_config(
        cfg: &TxConfig,
        credentials: Arc<dyn CredentialsProvider>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let transport = CurlTransport::new(CurlOptions::from_config(cfg));
        Dispatcher::new(cfg.effective_base_url(), transport, credentials, navigator)
            .with_retry_policy(RetryPolicy::from(&cfg.retry_or_default()))
            .with_auth_redirect(cfg.auth_redirect())
            .with_default_timeout(cfg.request_timeout())
    }
}

impl<T: Transport> Dispatcher<T, TokioSleeper> {
    pub fn new(
        base_url: impl Into<String>,
        transport: T,
        credentials: Arc<dyn CredentialsProvider>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
            credentials,
            navigator,
            retrier: Retrier::new(RetryPolicy::default()),
            auth_redirect: "/auth".to_string(),
            default_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl<T: Transport, S: Sleeper> Dispatcher<T, S> {
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retrier = self.retrier.with_policy(policy);
        self
    }

    /// Replace the backoff delay primitive.
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> Dispatcher<T, S2> {
        Dispatcher {
            base_url: self.base_url,
            transport: self.transport,
            credentials: self.credentials,
            navigator: self.navigator,
            retrier: self.retrier.with_sleeper(sleeper),
            auth_redirect: self.auth_redirect,
            default_timeout: self.default_timeout,
        }
    }

    pub fn with_auth_redirect(mut self, location: impl Into<String>) -> Self {
        self.auth_redirect = location.into();
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform one logical request. With `enable_retry` the attempt is repeated
    /// under the retry policy; failures always come back classified.
    pub async fn request(&self, options: RequestOptions) -> Result<HttpResponse, ErrorDescriptor> {
        let result = if options.enable_retry {
            self.retrier
                .run_until_cancelled(options.cancel.as_ref(), || self.attempt(&options))
                .await
        } else {
            self.attempt(&options).await.map_err(classify)
        };
        match &result {
            Ok(resp) => tracing::debug!(
                method = %options.method,
                path = %options.path,
                status = resp.status,
                "request completed"
            ),
            Err(e) => tracing::info!(
                method = %options.method,
                path = %options.path,
                kind = ?e.kind(),
                status = ?e.status_code(),
                "request failed: {}",
                e
            ),
        }
        result
    }

    async fn attempt(&self, options: &RequestOptions) -> Result<HttpResponse, RequestError> {
        if let Some(reason) = options.cancel.as_ref().and_then(CancelToken::reason) {
            return Err(RequestError::Aborted(reason));
        }
        let request = self.build_request(options);
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let merged = CancelToken::new();
        // Stops the transfer if this future is dropped mid-flight.
        let _guard = CancelOnDrop(merged.clone());

        let response = tokio::select! {
            biased;
            reason = merged.trip_on(options.cancel.as_ref(), timeout) => {
                return Err(RequestError::Aborted(reason));
            }
            result = self.transport.send(request, merged.clone()) => result?,
        };

        if response.is_success() {
            return Ok(response);
        }
        if response.status == 401 {
            self.credentials.clear();
            self.navigator.redirect(&self.auth_redirect);
        }
        Err(RequestError::Http {
            status: response.status,
            body: response.text(),
        })
    }

    fn build_request(&self, options: &RequestOptions) -> HttpRequest {
        let overrides_content_type = options
            .headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("content-type"));

        let mut headers = Vec::with_capacity(options.headers.len() + 2);
        if !overrides_content_type {
            headers.push(("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()));
        }
        match self.credentials.token() {
            Some(token) => {
                headers.extend(
                    options
                        .headers
                        .iter()
                        .filter(|(k, _)| !k.eq_ignore_ascii_case("authorization"))
                        .cloned(),
                );
                headers.push(("Authorization".to_string(), format!("Bearer {token}")));
            }
            None => headers.extend(options.headers.iter().cloned()),
        }

        HttpRequest {
            method: options.method,
            url: join_url(&self.base_url, &options.path),
            headers,
            body: options.body.clone(),
        }
    }
}

/// Fires the wrapped token when dropped.
struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-process transport and collaborators for dispatcher-level tests.

    use super::*;
    use crate::retry::Sleeper;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::Mutex;

    pub(crate) enum Step {
        Respond(u32, String),
        Fail(RequestError),
        Hang,
    }

    pub(crate) fn respond(status: u32, body: &str) -> Step {
        Step::Respond(status, body.to_string())
    }

    #[derive(Default)]
    struct Script {
        steps: Mutex<VecDeque<Step>>,
        seen: Mutex<Vec<HttpRequest>>,
        tokens: Mutex<Vec<CancelToken>>,
    }

    /// Replays scripted steps in order; once exhausted, answers 200 `{}`.
    #[derive(Clone, Default)]
    pub(crate) struct ScriptedTransport(Arc<Script>);

    impl ScriptedTransport {
        pub(crate) fn new(steps: Vec<Step>) -> Self {
            let t = Self::default();
            t.0.steps.lock().unwrap().extend(steps);
            t
        }

        pub(crate) fn seen(&self) -> Vec<HttpRequest> {
            self.0.seen.lock().unwrap().clone()
        }

        /// Tokens handed to each `send`, in order.
        pub(crate) fn tokens(&self) -> Vec<CancelToken> {
            self.0.tokens.lock().unwrap().clone()
        }
    }

    impl Transport for ScriptedTransport {
        fn send(
            &self,
            request: HttpRequest,
            cancel: CancelToken,
        ) -> impl Future<Output = Result<HttpResponse, RequestError>> + Send {
            self.0.seen.lock().unwrap().push(request);
            self.0.tokens.lock().unwrap().push(cancel);
            let step = self
                .0
                .steps
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| respond(200, "{}"));
            async move {
                match step {
                    Step::Respond(status, body) => Ok(HttpResponse {
                        status,
                        headers: Vec::new(),
                        body: body.into_bytes(),
                    }),
                    Step::Fail(e) => Err(e),
                    Step::Hang => std::future::pending().await,
                }
            }
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingNavigator(Mutex<Vec<String>>);

    impl RecordingNavigator {
        pub(crate) fn redirects(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Navigator for RecordingNavigator {
        fn redirect(&self, location: &str) {
            self.0.lock().unwrap().push(location.to_string());
        }
    }

    #[derive(Clone, Default)]
    pub(crate) struct RecordingSleeper(Arc<Mutex<Vec<Duration>>>);

    impl RecordingSleeper {
        pub(crate) fn delays_ms(&self) -> Vec<u128> {
            self.0.lock().unwrap().iter().map(|d| d.as_millis()).collect()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, delay: Duration) -> impl Future<Output = ()> + Send {
            self.0.lock().unwrap().push(delay);
            std::future::ready(())
        }
    }

    pub(crate) struct Harness {
        pub transport: ScriptedTransport,
        pub credentials: Arc<crate::session::MemoryCredentials>,
        pub navigator: Arc<RecordingNavigator>,
        pub sleeper: RecordingSleeper,
    }

    impl Harness {
        pub(crate) fn new(steps: Vec<Step>, token: Option<&str>) -> Self {
            Self {
                transport: ScriptedTransport::new(steps),
                credentials: Arc::new(crate::session::MemoryCredentials::new(
                    token.map(str::to_string),
                )),
                navigator: Arc::new(RecordingNavigator::default()),
                sleeper: RecordingSleeper::default(),
            }
        }

        pub(crate) fn dispatcher(&self) -> Dispatcher<ScriptedTransport, RecordingSleeper> {
            Dispatcher::new(
                "http://api.test/",
                self.transport.clone(),
                self.credentials.clone(),
                self.navigator.clone(),
            )
            .with_sleeper(self.sleeper.clone())
        }
    }
}
