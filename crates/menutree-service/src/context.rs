//! Request context carrying the acting user and the caller's cancellation signal.

use std::future::Future;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Context for one caller-initiated operation.
///
/// Passed into every service method so each operation knows *who* is
/// acting and can be abandoned when the caller goes away.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The acting user's ID, if any. Stamped as `creator` on new menus.
    pub user_id: Option<Uuid>,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
    /// Fires when the caller abandons the request.
    cancel: CancellationToken,
}

impl RequestContext {
    /// Creates a context for the given user with a fresh cancellation token.
    pub fn new(user_id: Option<Uuid>) -> Self {
        Self {
            user_id,
            request_time: Utc::now(),
            cancel: CancellationToken::new(),
        }
    }

    /// Creates a context with no acting user.
    pub fn system() -> Self {
        Self::new(None)
    }

    /// Replaces the cancellation token, e.g. with a child of a server-wide token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The token observed by operations running under this context.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Signals cancellation to every operation running under this context.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns whether the request has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drives `fut` to completion unless the request is cancelled first.
    ///
    /// Returns `None` on cancellation, in which case `fut` has been dropped.
    pub async fn run_until_cancelled<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            output = fut => Some(output),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::system()
    }
}
