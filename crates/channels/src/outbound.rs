use std::sync::Arc;

use {
    async_trait::async_trait,
    chatbridge_common::Platform,
    tokio::sync::{Mutex, MutexGuard},
};

use crate::{RelayMessage, Result};

/// Exclusive access to a platform session.
///
/// The inbound loop and the relay worker of one adapter share a single
/// session, and the platform SDKs do not tolerate interleaved use. Whoever
/// needs the session takes this lock, does its I/O and releases it; it is
/// never held while waiting on the broker.
pub struct SessionLock<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> Clone for SessionLock<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> SessionLock<S> {
    pub fn new(session: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, S> {
        self.inner.lock().await
    }

    /// `None` if someone else holds the session right now.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, S>> {
        self.inner.try_lock().ok()
    }
}

/// Sending side of a platform adapter.
#[async_trait]
pub trait PlatformOutbound: Send + Sync + 'static {
    /// Session handle guarded by the adapter's [`SessionLock`].
    type Session: Send + 'static;

    /// The platform this outbound posts to.
    fn platform(&self) -> Platform;

    /// Post `message` to its destination. Called with the session lock held.
    async fn deliver(&self, session: &mut Self::Session, message: &RelayMessage) -> Result<()>;
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_one_session() {
        let lock = SessionLock::new(Vec::<u32>::new());
        let other = lock.clone();

        lock.lock().await.push(1);
        other.lock().await.push(2);
        assert_eq!(*lock.lock().await, vec![1, 2]);
    }

    #[tokio::test]
    async fn try_lock_fails_while_held() {
        let lock = SessionLock::new(());
        let guard = lock.lock().await;
        assert!(lock.try_lock().is_none());
        drop(guard);
        assert!(lock.try_lock().is_some());
    }
}
