//! Error classification, retry policy and the async retry loop.
//!
//! Every failed request attempt is turned into an [`ErrorDescriptor`] by the
//! classifier; the policy then decides from the descriptor whether (and how
//! long after) the attempt is repeated. Higher layers only ever see
//! descriptors, so the presentation layer can render one message and gate a
//! retry affordance on [`ErrorDescriptor::retryable`].

mod classify;
mod descriptor;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_error, classify_http_status, client_error_message};
pub use descriptor::{ErrorDescriptor, ErrorKind};
pub use error::RequestError;
pub use policy::{RetryDecision, RetryPolicy};
pub use run::{run_with_retry, Retrier, RetryPredicate, Sleeper, TokioSleeper};
