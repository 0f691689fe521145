//! Confirmation subscription handle
//!
//! A single-resolution future over a gateway's confirmation listener. The
//! listener lives as long as the handle: dropping the handle runs the
//! gateway's teardown, on every exit path.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::GatewayResult;
use crate::types::ConfirmationDetails;

type Teardown = Box<dyn FnOnce() + Send + 'static>;

pub struct ConfirmationSubscription {
    pending: BoxFuture<'static, GatewayResult<ConfirmationDetails>>,
    teardown: Option<Teardown>,
    resolved: bool,
}

impl ConfirmationSubscription {
    /// Wrap a pending confirmation together with the cleanup that releases
    /// its listener
    pub fn new<F, T>(pending: F, teardown: T) -> Self
    where
        F: Future<Output = GatewayResult<ConfirmationDetails>> + Send + 'static,
        T: FnOnce() + Send + 'static,
    {
        Self {
            pending: Box::pin(pending),
            teardown: Some(Box::new(teardown)),
            resolved: false,
        }
    }

    /// A subscription with nothing to release
    pub fn detached<F>(pending: F) -> Self
    where
        F: Future<Output = GatewayResult<ConfirmationDetails>> + Send + 'static,
    {
        Self {
            pending: Box::pin(pending),
            teardown: None,
            resolved: false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }
}

impl Future for ConfirmationSubscription {
    type Output = GatewayResult<ConfirmationDetails>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let poll = self.pending.as_mut().poll(cx);
        if poll.is_ready() {
            self.resolved = true;
        }
        poll
    }
}

impl Drop for ConfirmationSubscription {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl fmt::Debug for ConfirmationSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmationSubscription")
            .field("resolved", &self.resolved)
            .field("has_teardown", &self.teardown.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_teardown_runs_once_on_drop() {
        let torn_down = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&torn_down);

        let subscription = ConfirmationSubscription::new(futures::future::pending(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(!subscription.is_resolved());
        drop(subscription);

        assert_eq!(torn_down.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolves_with_inner_result() {
        let mut subscription = ConfirmationSubscription::detached(async {
            Ok(ConfirmationDetails { slot: 42, err: None })
        });

        let details = (&mut subscription).await.unwrap();
        assert_eq!(details.slot, 42);
        assert!(subscription.is_resolved());
    }
}
