//! Seat Counter Store (spec §4.2).
//!
//! The counter is the line-rate decision oracle for seat availability; the
//! durable store is reconciled from it asynchronously, never the other way
//! around on the hot path (spec §9). `decrement_and_get` is the system's
//! linearization point for enrollments: whichever caller observes the
//! successful post-decrement value wins the seat.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("seat counter is exhausted")]
    Exhausted,
    #[error("seat counter key is missing")]
    Missing,
}

/// Contract from spec §4.2. A trait so a remote-backed implementation
/// (e.g. Redis `DECR`/`INCR`) can be substituted for `InMemorySeatCounterStore`
/// without touching the coordinator.
#[async_trait::async_trait]
pub trait CounterStore: Send + Sync {
    async fn get(&self, section_id: Uuid) -> Option<i64>;
    async fn set(&self, section_id: Uuid, value: i64);
    async fn decrement_and_get(&self, section_id: Uuid) -> Result<i64, CounterError>;
    async fn increment_and_get(&self, section_id: Uuid) -> Result<i64, CounterError>;

    /// Compensating variants where the post-mutation value is not needed.
    async fn decrement(&self, section_id: Uuid) -> Result<(), CounterError> {
        self.decrement_and_get(section_id).await.map(|_| ())
    }
    async fn increment(&self, section_id: Uuid) -> Result<(), CounterError> {
        self.increment_and_get(section_id).await.map(|_| ())
    }
}

/// Lock-free, per-section atomic counter. `decrement_and_get` is a CAS loop:
/// it only commits a decrement if the current value is strictly positive,
/// so the counter is bounded at zero (spec §4.2's "bounded at zero"
/// invariant) without ever taking a lock across the check-then-act.
pub struct InMemorySeatCounterStore {
    counters: DashMap<Uuid, Arc<AtomicI64>>,
}

impl InMemorySeatCounterStore {
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
        }
    }

    fn entry(&self, section_id: Uuid) -> Option<Arc<AtomicI64>> {
        self.counters.get(&section_id).map(|e| e.clone())
    }
}

impl Default for InMemorySeatCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CounterStore for InMemorySeatCounterStore {
    async fn get(&self, section_id: Uuid) -> Option<i64> {
        self.entry(section_id).map(|c| c.load(Ordering::SeqCst))
    }

    async fn set(&self, section_id: Uuid, value: i64) {
        self.counters
            .insert(section_id, Arc::new(AtomicI64::new(value)));
    }

    async fn decrement_and_get(&self, section_id: Uuid) -> Result<i64, CounterError> {
        let counter = self.entry(section_id).ok_or(CounterError::Missing)?;
        let mut current = counter.load(Ordering::SeqCst);
        loop {
            if current <= 0 {
                return Err(CounterError::Exhausted);
            }
            let next = current - 1;
            match counter.compare_exchange_weak(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Ok(next),
                Err(observed) => current = observed,
            }
        }
    }

    async fn increment_and_get(&self, section_id: Uuid) -> Result<i64, CounterError> {
        let counter = self.entry(section_id).ok_or(CounterError::Missing)?;
        // Unconditional — not capped at total_seats, see spec §4.2/§9.
        Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn decrement_bounds_at_zero() {
        let store = InMemorySeatCounterStore::new();
        let section = Uuid::new_v4();
        store.set(section, 1).await;

        assert_eq!(store.decrement_and_get(section).await.unwrap(), 0);
        assert!(matches!(
            store.decrement_and_get(section).await,
            Err(CounterError::Exhausted)
        ));
    }

    #[tokio::test]
    async fn missing_key_is_distinguishable_from_zero() {
        let store = InMemorySeatCounterStore::new();
        let section = Uuid::new_v4();
        assert!(matches!(
            store.decrement_and_get(section).await,
            Err(CounterError::Missing)
        ));
        assert_eq!(store.get(section).await, None);
    }

    #[tokio::test]
    async fn exactly_one_of_two_concurrent_decrements_succeeds_at_one_seat() {
        let store = Arc::new(InMemorySeatCounterStore::new());
        let section = Uuid::new_v4();
        store.set(section, 1).await;

        let a = {
            let store = store.clone();
            tokio::spawn(async move { store.decrement_and_get(section).await })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move { store.decrement_and_get(section).await })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        let outcomes = [a, b];
        let successes = outcomes.iter().filter(|r| r.is_ok()).count();
        let exhausted = outcomes
            .iter()
            .filter(|r| matches!(r, Err(CounterError::Exhausted)))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(exhausted, 1);
        assert_eq!(outcomes.iter().find(|r| r.is_ok()).unwrap().clone().unwrap(), 0);
    }

    #[tokio::test]
    async fn increment_is_unconditional_and_uncapped() {
        let store = InMemorySeatCounterStore::new();
        let section = Uuid::new_v4();
        store.set(section, 0).await;
        assert_eq!(store.increment_and_get(section).await.unwrap(), 1);
        assert_eq!(store.increment_and_get(section).await.unwrap(), 2);
    }
}
