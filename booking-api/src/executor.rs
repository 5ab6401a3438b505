//! Deadline-bounded request execution
//!
//! Each request runs its operation (credential extraction, token validation,
//! service call) on a spawned worker and races it against the request deadline.
//! Exactly one of three things resolves the race:
//!
//! 1. the deadline elapses or the request is cancelled → [`Outcome::Timeout`]
//! 2. the worker reports a [`Rejection`] → classified client or internal error
//! 3. the worker reports a value → formatted into [`Outcome::Success`]
//!
//! The worker reports through two capacity-1 channels using `try_send`, so a
//! worker that finishes after the race is over never blocks; its send simply
//! fails and the task ends. The request's [`RequestContext`] is cancelled when
//! [`Executor::execute`] returns, which lets collaborators using
//! [`RequestContext::run`] abort their I/O promptly.
//!
//! # Example
//!
//! ```rust,ignore
//! let outcome = executor
//!     .execute(
//!         "get_booking_by_id",
//!         Duration::from_millis(1000),
//!         &tables.booking,
//!         move |ctx| async move {
//!             authenticate::<BookingError>(&ctx, authority.as_ref(), &headers, ENDPOINT).await?;
//!             Ok(bookings.get_booking_by_id(&ctx, id).await?)
//!         },
//!         format_booking,
//!     )
//!     .await;
//! ```

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use axum::http::StatusCode;
use futures::FutureExt;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::classify::{classify, Classify, ClassificationTable};
use crate::envelope::Outcome;
use crate::error::{DatabaseError, DatabaseOperation};

/// The request deadline elapsed or the request was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("request deadline exceeded or request cancelled")]
pub struct Cancelled;

impl From<Cancelled> for DatabaseError {
    fn from(err: Cancelled) -> Self {
        DatabaseError::timeout(DatabaseOperation::Query, err.to_string())
    }
}

/// Deadline and cancellation scope of a single request
///
/// Owned by the worker; cancelled when the executing handler returns.
#[derive(Debug, Clone)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Instant,
}

impl RequestContext {
    /// Context with its own token and a deadline `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Instant::now() + timeout,
        }
    }

    /// Absolute deadline of the request
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Whether the deadline has passed or the request was cancelled
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Cancellation token of the request
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// Resolves once the deadline passes or the request is cancelled
    pub async fn done(&self) {
        tokio::select! {
            () = self.token.cancelled() => {}
            () = tokio::time::sleep_until(self.deadline) => {}
        }
    }

    /// Run `fut` unless the request finishes first
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Cancelled>
    where
        F: Future,
    {
        tokio::select! {
            biased;

            () = self.done() => Err(Cancelled),
            output = fut => Ok(output),
        }
    }
}

/// Why a worker stopped without producing a value
#[derive(Debug)]
pub enum Rejection<E> {
    /// Credentials missing or invalid; always 401
    Unauthorized(&'static str),
    /// Request input could not be parsed; always 400
    BadRequest(&'static str),
    /// Error from the business layer, classified per endpoint family
    Domain(E),
    /// The worker panicked
    Panicked,
}

impl<E> From<E> for Rejection<E> {
    fn from(err: E) -> Self {
        Self::Domain(err)
    }
}

/// Formatting a worker result into its wire representation failed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// A field required on the wire was missing
    #[error("missing field `{0}`")]
    MissingField(&'static str),
}

/// Runs request operations against their deadlines
///
/// Every request token is a child of the executor's root token, so
/// [`Executor::shutdown`] resolves all in-flight requests.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    root: CancellationToken,
}

impl Executor {
    /// Create an executor with a fresh root token
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every in-flight request
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    /// Execute `operation` on a worker, bounded by `deadline`
    ///
    /// `format` converts the worker's value into its wire form; a formatting
    /// failure is an internal error.
    pub async fn execute<T, P, E, Op, Fut, Fmt>(
        &self,
        endpoint: &'static str,
        deadline: Duration,
        table: &ClassificationTable<E::Sentinel>,
        operation: Op,
        format: Fmt,
    ) -> Outcome
    where
        T: Send + 'static,
        P: Serialize,
        E: Classify,
        Op: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = Result<T, Rejection<E>>> + Send + 'static,
        Fmt: FnOnce(T) -> Result<P, FormatError> + Send,
    {
        let token = self.root.child_token();
        let _cancel_on_return = token.clone().drop_guard();
        let ctx = RequestContext {
            token,
            deadline: Instant::now() + deadline,
        };
        let race = ctx.clone();

        let (res_tx, mut res_rx) = mpsc::channel::<T>(1);
        let (err_tx, mut err_rx) = mpsc::channel::<Rejection<E>>(1);

        let work = operation(ctx);
        tokio::spawn(async move {
            match AssertUnwindSafe(work).catch_unwind().await {
                Ok(Ok(value)) => {
                    if res_tx.try_send(value).is_err() {
                        tracing::debug!(endpoint, "Worker finished after request resolved");
                    }
                }
                Ok(Err(rejection)) => {
                    if err_tx.try_send(rejection).is_err() {
                        tracing::debug!(endpoint, "Worker failed after request resolved");
                    }
                }
                Err(_) => {
                    let _ = err_tx.try_send(Rejection::Panicked);
                }
            }
        });

        tokio::select! {
            () = race.done() => {
                tracing::warn!(
                    endpoint,
                    deadline_ms = deadline.as_millis() as u64,
                    "Request deadline exceeded"
                );
                Outcome::Timeout
            }
            Some(rejection) = err_rx.recv() => reject(endpoint, rejection, table),
            Some(value) = res_rx.recv() => match format(value) {
                Ok(payload) => Outcome::success(&payload),
                Err(e) => {
                    tracing::error!(endpoint, error = %e, "Failed to format response");
                    Outcome::InternalError
                }
            },
        }
    }
}

fn reject<E>(
    endpoint: &'static str,
    rejection: Rejection<E>,
    table: &ClassificationTable<E::Sentinel>,
) -> Outcome
where
    E: Classify,
{
    match rejection {
        Rejection::Unauthorized(code) => {
            tracing::debug!(endpoint, code, "Request unauthorized");
            Outcome::client_error(code, StatusCode::UNAUTHORIZED)
        }
        Rejection::BadRequest(code) => {
            tracing::debug!(endpoint, code, "Request rejected");
            Outcome::client_error(code, StatusCode::BAD_REQUEST)
        }
        Rejection::Domain(err) => {
            let outcome = classify(&err, table);
            match outcome {
                Outcome::InternalError => {
                    tracing::error!(endpoint, error = %err, "Internal error from service");
                }
                _ => {
                    tracing::debug!(endpoint, error = %err, "Client error from service");
                }
            }
            outcome
        }
        Rejection::Panicked => {
            tracing::error!(endpoint, "Worker panicked");
            Outcome::InternalError
        }
    }
}
