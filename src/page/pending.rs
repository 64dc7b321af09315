//! Cancellable page requests

use crate::error::{Error, Result};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

/// A page request that may already be running
///
/// `spawn` starts the request on the tokio runtime right away, so its
/// latency overlaps with whatever the caller does next. `deferred` runs the
/// request only when awaited. Either way the request can be aborted, after
/// which it resolves to [`Error::Cancelled`]. Dropping a spawned request
/// aborts its task.
pub struct PendingPage<T> {
    inner: Inner<T>,
}

enum Inner<T> {
    Spawned(JoinHandle<Result<T>>),
    Deferred(BoxFuture<'static, Result<T>>),
    Aborted,
}

impl<T: Send + 'static> PendingPage<T> {
    /// Start the request on the current tokio runtime
    pub fn spawn<F>(request: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            inner: Inner::Spawned(tokio::spawn(request)),
        }
    }

    /// Run the request when first awaited
    pub fn deferred<F>(request: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            inner: Inner::Deferred(Box::pin(request)),
        }
    }

    /// An already-resolved request
    pub fn ready(result: Result<T>) -> Self {
        Self::deferred(futures::future::ready(result))
    }
}

impl<T> PendingPage<T> {
    /// Cancel the request
    pub fn abort(&mut self) {
        if let Inner::Spawned(handle) = &self.inner {
            handle.abort();
        } else {
            self.inner = Inner::Aborted;
        }
    }

    /// Whether the request runs independently of being awaited
    pub fn is_spawned(&self) -> bool {
        matches!(self.inner, Inner::Spawned(_))
    }
}

impl<T> Future for PendingPage<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            Inner::Spawned(handle) => Pin::new(handle).poll(cx).map(|joined| match joined {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Err(Error::Cancelled),
                Err(e) => Err(Error::TaskFailed {
                    message: e.to_string(),
                }),
            }),
            Inner::Deferred(request) => request.as_mut().poll(cx),
            Inner::Aborted => Poll::Ready(Err(Error::Cancelled)),
        }
    }
}

impl<T> Drop for PendingPage<T> {
    fn drop(&mut self) {
        if let Inner::Spawned(handle) = &self.inner {
            handle.abort();
        }
    }
}

impl<T> fmt::Debug for PendingPage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.inner {
            Inner::Spawned(handle) if handle.is_finished() => "finished",
            Inner::Spawned(_) => "running",
            Inner::Deferred(_) => "deferred",
            Inner::Aborted => "aborted",
        };
        f.debug_struct("PendingPage").field("state", &state).finish()
    }
}
