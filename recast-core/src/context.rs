use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Cancellation signal and optional deadline for one transcode.
///
/// Clones share the same token, so cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: CancellationToken,
    deadline: Option<Deadline>,
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    timeout: Duration,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context driven by an existing token, e.g. one tied to a client
    /// connection or a shutdown signal.
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Give up `timeout` from now. An earlier deadline already set is kept.
    /// A timeout too large to represent never expires.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let Some(at) = Instant::now().checked_add(timeout) else {
            return self;
        };
        match self.deadline {
            Some(existing) if existing.at <= at => {}
            _ => self.deadline = Some(Deadline { at, timeout }),
        }
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Why the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<Error> {
        if self.cancel.is_cancelled() {
            return Some(Error::Cancelled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d.at => Some(Error::DeadlineExceeded(d.timeout)),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> Error {
        match self.deadline {
            Some(d) => tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Error::Cancelled,
                _ = tokio::time::sleep_until(d.at) => Error::DeadlineExceeded(d.timeout),
            },
            None => {
                self.cancel.cancelled().await;
                Error::Cancelled
            }
        }
    }
}
