use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::warn;

use brl_types::Timestamp;

/// Source of the current time, injected into the ledger.
///
/// The ledger reads the clock once per operation so that every comparison
/// inside that operation sees the same instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time in whole seconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Manually driven clock for deterministic tests and scripted replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    secs: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            secs: AtomicU64::new(start.as_secs()),
        }
    }

    pub fn set(&self, at: Timestamp) {
        self.secs.store(at.as_secs(), Ordering::SeqCst);
    }

    /// Move the clock forward by `secs`, saturating at the maximum timestamp.
    pub fn advance(&self, secs: u64) -> Timestamp {
        let previous = self
            .secs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |s| {
                Some(s.saturating_add(secs))
            })
            .unwrap_or_else(|current| current);
        Timestamp::from_secs(previous.saturating_add(secs))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_secs(self.secs.load(Ordering::SeqCst))
    }
}

/// Wrapper guaranteeing non-decreasing readings from any [`Clock`].
///
/// A reading earlier than the last one returned is clamped to the last one.
pub struct MonotonicClock {
    inner: Box<dyn Clock>,
    last: Mutex<Timestamp>,
}

impl MonotonicClock {
    pub fn new(inner: impl Clock + 'static) -> Self {
        Self::from_boxed(Box::new(inner))
    }

    pub fn from_boxed(inner: Box<dyn Clock>) -> Self {
        Self {
            inner,
            last: Mutex::new(Timestamp::zero()),
        }
    }

    /// The most recent reading handed out.
    pub fn last(&self) -> Timestamp {
        *self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        let reading = self.inner.now();
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if reading < *last {
            let clamped = *last;
            warn!(reading = %reading, last = %clamped, "clock stepped backwards; clamping");
            return clamped;
        }
        *last = reading;
        reading
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(Timestamp::from_secs(100));
        assert_eq!(clock.now(), Timestamp::from_secs(100));
        assert_eq!(clock.advance(50), Timestamp::from_secs(150));
        assert_eq!(clock.now(), Timestamp::from_secs(150));
        clock.set(Timestamp::from_secs(7));
        assert_eq!(clock.now(), Timestamp::from_secs(7));
    }

    #[test]
    fn manual_clock_saturates() {
        let clock = ManualClock::new(Timestamp::from_secs(u64::MAX - 1));
        assert_eq!(clock.advance(10), Timestamp::from_secs(u64::MAX));
    }

    #[test]
    fn monotonic_clock_clamps_regressions() {
        let manual = Arc::new(ManualClock::new(Timestamp::from_secs(100)));
        let clock = MonotonicClock::new(manual.clone());
        assert_eq!(clock.now(), Timestamp::from_secs(100));

        manual.set(Timestamp::from_secs(40));
        assert_eq!(clock.now(), Timestamp::from_secs(100));

        manual.set(Timestamp::from_secs(120));
        assert_eq!(clock.now(), Timestamp::from_secs(120));
        assert_eq!(clock.last(), Timestamp::from_secs(120));
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now().as_secs() > 1_577_836_800);
    }
}
