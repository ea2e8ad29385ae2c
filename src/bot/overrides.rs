//! Operator override: a tri-state flag forcing the chatbot on or off
//! regardless of the schedule.

use tracing::warn;

use crate::cache::{KvStore, StoreError};

/// Well-known cache key holding the override.
pub const OVERRIDE_KEY: &str = "chatbot:override";

/// Tri-state operator override. `Unset` is represented only as key
/// absence; no explicit "unset" value is ever stored, so absence and an
/// explicit `Off` can never be conflated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideState {
    On,
    Off,
    Unset,
}

impl OverrideState {
    fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some("on") => Self::On,
            Some("off") => Self::Off,
            // Absence or a malformed value both mean no override.
            _ => Self::Unset,
        }
    }
}

/// Accessor over the cache-backed override flag. Global, not per-user.
pub struct OverrideStore<S> {
    store: S,
}

impl<S: KvStore> OverrideStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read the override. Absent or malformed values map to `Unset`.
    pub async fn get(&self) -> Result<OverrideState, StoreError> {
        let raw = self.store.get(OVERRIDE_KEY).await?;
        Ok(OverrideState::from_raw(raw.as_deref()))
    }

    /// Read the override, treating cache unavailability as `Unset` so the
    /// decision falls open to the time-window rule.
    pub async fn current(&self) -> OverrideState {
        match self.get().await {
            Ok(state) => state,
            Err(e) => {
                warn!("Override read failed, treating as unset: {e}");
                OverrideState::Unset
            }
        }
    }

    /// Write the override. `Unset` deletes the key.
    pub async fn set(&self, state: OverrideState) -> Result<(), StoreError> {
        match state {
            OverrideState::On => self.store.set(OVERRIDE_KEY, "on").await,
            OverrideState::Off => self.store.set(OVERRIDE_KEY, "off").await,
            OverrideState::Unset => self.store.del(OVERRIDE_KEY).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::{FailingStore, MemoryStore};

    #[tokio::test]
    async fn test_pristine_store_reads_unset() {
        let overrides = OverrideStore::new(MemoryStore::new());
        assert_eq!(overrides.get().await.unwrap(), OverrideState::Unset);
    }

    #[tokio::test]
    async fn test_set_on_then_get() {
        let overrides = OverrideStore::new(MemoryStore::new());
        overrides.set(OverrideState::On).await.unwrap();
        assert_eq!(overrides.get().await.unwrap(), OverrideState::On);
    }

    #[tokio::test]
    async fn test_set_off_then_get() {
        let overrides = OverrideStore::new(MemoryStore::new());
        overrides.set(OverrideState::Off).await.unwrap();
        assert_eq!(overrides.get().await.unwrap(), OverrideState::Off);
    }

    #[tokio::test]
    async fn test_unset_deletes_the_key() {
        let store = MemoryStore::new();
        let overrides = OverrideStore::new(store.clone());
        overrides.set(OverrideState::On).await.unwrap();
        assert!(store.contains(OVERRIDE_KEY));

        overrides.set(OverrideState::Unset).await.unwrap();
        assert!(!store.contains(OVERRIDE_KEY));
        assert_eq!(overrides.get().await.unwrap(), OverrideState::Unset);
    }

    #[tokio::test]
    async fn test_malformed_value_reads_unset() {
        let store = MemoryStore::new();
        store.set(OVERRIDE_KEY, "banana").await.unwrap();
        let overrides = OverrideStore::new(store);
        assert_eq!(overrides.get().await.unwrap(), OverrideState::Unset);
    }

    #[tokio::test]
    async fn test_unreachable_cache_fails_open_to_unset() {
        let overrides = OverrideStore::new(FailingStore);
        assert!(overrides.get().await.is_err());
        assert_eq!(overrides.current().await, OverrideState::Unset);
    }
}
