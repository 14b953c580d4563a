use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::{FlagStore, StoreError};
use crate::evaluation::{FlagDefinition, FlagType};

#[derive(Debug, Clone, Copy)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub open_for: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_for: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    open_until: Option<Instant>,
    trial_in_flight: bool,
}

impl BreakerState {
    fn rejects(&self, now: Instant) -> bool {
        self.trial_in_flight || self.open_until.is_some_and(|until| now < until)
    }
}

/// Wraps a store and stops calling it after repeated failures.
///
/// Once `failure_threshold` consecutive calls fail the breaker opens and every
/// call fails fast with [`StoreError::Unavailable`] for `open_for`. After that
/// window a single trial call goes through while the rest keep failing fast:
/// success closes the breaker, failure opens it again.
pub struct CircuitBreakerStore<S> {
    inner: S,
    settings: BreakerSettings,
    state: Mutex<BreakerState>,
}

/// Releases the half-open slot if the trial call is dropped before it finishes.
struct TrialSlot<'a> {
    state: &'a Mutex<BreakerState>,
    armed: bool,
}

impl Drop for TrialSlot<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.trial_in_flight = false;
        }
    }
}

impl<S: FlagStore> CircuitBreakerStore<S> {
    pub fn new(inner: S, settings: BreakerSettings) -> Self {
        Self {
            inner,
            settings,
            state: Mutex::new(BreakerState::default()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn is_open(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.rejects(Instant::now())
    }

    /// Admits a call, or `None` to fail fast. `Some(true)` marks the half-open trial.
    fn admit(&self) -> Option<bool> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.rejects(Instant::now()) {
            return None;
        }
        let trial = state.open_until.is_some();
        state.trial_in_flight = trial;
        Some(trial)
    }

    async fn guarded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let Some(trial) = self.admit() else {
            tracing::error!(operation, "Fallback triggered, flag store circuit is open");
            return Err(StoreError::Unavailable("circuit open".to_string()));
        };
        let mut slot = TrialSlot {
            state: &self.state,
            armed: trial,
        };
        if trial {
            tracing::info!(operation, "Flag store circuit half-open, trying one call");
        }

        let result = call.await;

        slot.armed = false;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.trial_in_flight = false;
        match &result {
            Ok(_) => *state = BreakerState::default(),
            Err(e) => {
                state.consecutive_failures += 1;
                if trial || state.consecutive_failures >= self.settings.failure_threshold {
                    state.open_until = Some(Instant::now() + self.settings.open_for);
                    tracing::error!(
                        operation,
                        failures = state.consecutive_failures,
                        error = %e,
                        "Flag store circuit opened"
                    );
                } else {
                    tracing::warn!(operation, error = %e, "Flag store call failed");
                }
            }
        }

        result
    }
}

impl<S: FlagStore> FlagStore for CircuitBreakerStore<S> {
    async fn find_by_name(&self, name: &str) -> Result<Option<FlagDefinition>, StoreError> {
        self.guarded("find_by_name", self.inner.find_by_name(name))
            .await
    }

    async fn find_all(&self) -> Result<Vec<FlagDefinition>, StoreError> {
        self.guarded("find_all", self.inner.find_all()).await
    }

    async fn find_by_type(&self, flag_type: FlagType) -> Result<Vec<FlagDefinition>, StoreError> {
        self.guarded("find_by_type", self.inner.find_by_type(flag_type))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, AtomicBool, Ordering};

    /// Store that fails while `failing` is set and counts every call.
    #[derive(Default)]
    struct FlakyStore {
        failing: AtomicBool,
        calls: AtomicU32,
    }

    impl FlakyStore {
        fn answer(&self) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                Err(StoreError::Unavailable("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl FlagStore for FlakyStore {
        async fn find_by_name(&self, _name: &str) -> Result<Option<FlagDefinition>, StoreError> {
            self.answer().map(|_| None)
        }

        async fn find_all(&self) -> Result<Vec<FlagDefinition>, StoreError> {
            self.answer().map(|_| Vec::new())
        }

        async fn find_by_type(&self, _: FlagType) -> Result<Vec<FlagDefinition>, StoreError> {
            self.answer().map(|_| Vec::new())
        }
    }

    fn breaker(open_for: Duration) -> CircuitBreakerStore<FlakyStore> {
        CircuitBreakerStore::new(
            FlakyStore::default(),
            BreakerSettings {
                failure_threshold: 2,
                open_for,
            },
        )
    }

    #[tokio::test]
    async fn test_opens_after_threshold_and_fails_fast() {
        let store = breaker(Duration::from_secs(60));
        store.inner().failing.store(true, Ordering::SeqCst);

        assert!(store.find_by_name("a").await.is_err());
        assert!(!store.is_open());
        assert!(store.find_by_name("a").await.is_err());
        assert!(store.is_open());

        // Open: the inner store is no longer called.
        store.inner().failing.store(false, Ordering::SeqCst);
        assert!(store.find_all().await.is_err());
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let store = breaker(Duration::from_secs(60));

        store.inner().failing.store(true, Ordering::SeqCst);
        assert!(store.find_all().await.is_err());
        store.inner().failing.store(false, Ordering::SeqCst);
        assert!(store.find_all().await.is_ok());
        store.inner().failing.store(true, Ordering::SeqCst);
        assert!(store.find_all().await.is_err());

        assert!(!store.is_open());
    }

    #[tokio::test]
    async fn test_half_open_trial_call() {
        let store = breaker(Duration::ZERO);
        store.inner().failing.store(true, Ordering::SeqCst);
        assert!(store.find_by_type(FlagType::Boolean).await.is_err());
        assert!(store.find_by_type(FlagType::Boolean).await.is_err());

        // The window has already elapsed, so the next call reaches the store.
        store.inner().failing.store(false, Ordering::SeqCst);
        assert!(store.find_by_name("a").await.unwrap().is_none());
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
        assert!(!store.is_open());
    }

    /// Store whose calls take a while and always fail.
    #[derive(Default)]
    struct SlowFailingStore {
        calls: AtomicU32,
    }

    impl SlowFailingStore {
        async fn answer<T>(&self) -> Result<T, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err(StoreError::Unavailable("timed out".to_string()))
        }
    }

    impl FlagStore for SlowFailingStore {
        async fn find_by_name(&self, _name: &str) -> Result<Option<FlagDefinition>, StoreError> {
            self.answer().await
        }

        async fn find_all(&self) -> Result<Vec<FlagDefinition>, StoreError> {
            self.answer().await
        }

        async fn find_by_type(&self, _: FlagType) -> Result<Vec<FlagDefinition>, StoreError> {
            self.answer().await
        }
    }

    #[tokio::test]
    async fn test_half_open_lets_one_caller_through() {
        let store = CircuitBreakerStore::new(
            SlowFailingStore::default(),
            BreakerSettings {
                failure_threshold: 1,
                open_for: Duration::from_millis(30),
            },
        );
        assert!(store.find_by_name("a").await.is_err());
        assert!(store.is_open());
        tokio::time::sleep(Duration::from_millis(40)).await;

        let results = tokio::join!(
            store.find_by_name("a"),
            store.find_by_name("a"),
            store.find_by_name("a"),
            store.find_by_name("a"),
            store.find_by_name("a"),
        );
        assert!(results.0.is_err() && results.1.is_err() && results.2.is_err());
        assert!(results.3.is_err() && results.4.is_err());
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 2);

        // The failed trial reopens the circuit.
        assert!(store.is_open());
    }

    #[tokio::test]
    async fn test_dropped_trial_frees_the_slot() {
        let store = CircuitBreakerStore::new(
            SlowFailingStore::default(),
            BreakerSettings {
                failure_threshold: 1,
                open_for: Duration::ZERO,
            },
        );
        assert!(store.find_all().await.is_err());

        let trial = tokio::time::timeout(Duration::from_millis(5), store.find_all()).await;
        assert!(trial.is_err());
        assert!(!store.is_open());

        assert!(store.find_all().await.is_err());
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_not_a_failure() {
        let store = breaker(Duration::from_secs(60));
        for _ in 0..5 {
            assert!(store.find_by_name("missing").await.unwrap().is_none());
        }
        assert!(!store.is_open());
    }
}
