//! Clock abstraction so timestamps are deterministic under test.

/// Source of the "current time" stamped onto records, in unix seconds.
pub trait TimeSource: Send + Sync + 'static {
    fn now_secs(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_secs(&self) -> u64 {
        // Clamp pre-epoch clocks to 0 rather than wrapping.
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

#[cfg(any(test, feature = "testing"))]
pub use mock::SharedMockTimeSource;

#[cfg(any(test, feature = "testing"))]
mod mock {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use super::TimeSource;

    /// Manually advanced clock. Clones share the same time.
    #[derive(Debug, Clone, Default)]
    pub struct SharedMockTimeSource {
        now: Arc<AtomicU64>,
    }

    impl SharedMockTimeSource {
        pub fn new() -> Self {
            Self::starting_at(1_700_000_000)
        }

        pub fn starting_at(secs: u64) -> Self {
            Self {
                now: Arc::new(AtomicU64::new(secs)),
            }
        }

        pub fn advance_secs(&self, secs: u64) {
            self.now.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl TimeSource for SharedMockTimeSource {
        fn now_secs(&self) -> u64 {
            self.now.load(Ordering::SeqCst)
        }
    }
}
