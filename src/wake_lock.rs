//! Screen wake lock
//!
//! Keeps the display awake while hands-free mode runs. Acquisition is best
//! effort: a refusal is logged and hands-free carries on with a screen that
//! may dim.

use std::sync::Arc;

/// Wake lock error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WakeLockError {
    #[error("Wake lock is not supported on this platform")]
    Unsupported,

    #[error("Wake lock request was denied: {0}")]
    Denied(String),
}

/// Platform wake-lock capability
pub trait WakeLockProvider: Send + Sync {
    fn acquire(&self) -> Result<(), WakeLockError>;
    fn release(&self);
}

/// At-most-one-holder wake lock, released on drop
pub struct WakeLock {
    provider: Option<Arc<dyn WakeLockProvider>>,
    held: bool,
}

impl WakeLock {
    pub fn new(provider: Option<Arc<dyn WakeLockProvider>>) -> Self {
        Self {
            provider,
            held: false,
        }
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Try to hold the lock; returns whether it is held afterwards
    pub fn acquire(&mut self) -> bool {
        if self.held {
            return true;
        }

        let Some(provider) = &self.provider else {
            tracing::warn!("No wake lock available, screen may dim");
            return false;
        };

        match provider.acquire() {
            Ok(()) => {
                self.held = true;
                tracing::info!("Screen wake lock acquired");
            }
            Err(e) => {
                tracing::warn!("Failed to acquire wake lock: {}", e);
            }
        }
        self.held
    }

    pub fn release(&mut self) {
        if !self.held {
            return;
        }
        if let Some(provider) = &self.provider {
            provider.release();
        }
        self.held = false;
        tracing::info!("Screen wake lock released");
    }
}

impl Drop for WakeLock {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingLock {
        acquires: AtomicU32,
        releases: AtomicU32,
    }

    impl WakeLockProvider for CountingLock {
        fn acquire(&self) -> Result<(), WakeLockError> {
            self.acquires.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn release(&self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct DenyingLock;

    impl WakeLockProvider for DenyingLock {
        fn acquire(&self) -> Result<(), WakeLockError> {
            Err(WakeLockError::Denied("battery saver".to_string()))
        }

        fn release(&self) {}
    }

    #[test]
    fn test_reacquire_is_noop() {
        let provider = Arc::new(CountingLock::default());
        let mut lock = WakeLock::new(Some(provider.clone()));
        assert!(lock.acquire());
        assert!(lock.acquire());
        assert_eq!(provider.acquires.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_on_drop() {
        let provider = Arc::new(CountingLock::default());
        {
            let mut lock = WakeLock::new(Some(provider.clone()));
            lock.acquire();
        }
        assert_eq!(provider.releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_without_hold_is_noop() {
        let provider = Arc::new(CountingLock::default());
        let mut lock = WakeLock::new(Some(provider.clone()));
        lock.release();
        assert_eq!(provider.releases.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_denied_or_missing_is_not_fatal() {
        let mut denied = WakeLock::new(Some(Arc::new(DenyingLock)));
        assert!(!denied.acquire());

        let mut missing = WakeLock::new(None);
        assert!(!missing.acquire());
        assert!(!missing.is_held());
    }
}
