//! Narrow key-value interface shared by every component.
//!
//! Values are stored as strings. Per-key last-write-wins; there are no
//! transactions, so multi-key updates must be ordered so that any prefix of
//! the writes leaves a recoverable state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::warn;

use super::keys::StateKey;
use crate::error::StoreError;

/// Durable, process-shared key-value access.
pub trait StateStore: Send + Sync {
    fn get(&self, key: StateKey) -> Result<Option<String>, StoreError>;
    fn set(&self, key: StateKey, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: StateKey) -> Result<(), StoreError>;
}

impl<S: StateStore + ?Sized> StateStore for Arc<S> {
    fn get(&self, key: StateKey) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: StateKey, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: StateKey) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

impl<S: StateStore + ?Sized> StateStore for &S {
    fn get(&self, key: StateKey) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: StateKey, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: StateKey) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Typed accessors layered over [`StateStore`].
///
/// Reads never fail: a storage error or an undecodable value is logged and
/// the default is returned. Writes return the underlying error so callers
/// can decide whether to propagate or drop it.
pub trait StateStoreExt: StateStore {
    fn read_bool(&self, key: StateKey, default: bool) -> bool {
        match self.get(key) {
            Ok(Some(raw)) => match raw.as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                other => {
                    warn!(key = %key, value = other, "undecodable bool, using default");
                    default
                }
            },
            Ok(None) => default,
            Err(e) => {
                warn!(key = %key, error = %e, "store read failed, using default");
                default
            }
        }
    }

    /// Epoch-millisecond timestamp. A stored `0` reads as absent.
    fn read_millis(&self, key: StateKey) -> Option<u64> {
        match self.get(key) {
            Ok(Some(raw)) => match raw.trim().parse::<u64>() {
                Ok(0) => None,
                Ok(ms) => Some(ms),
                Err(_) => {
                    warn!(key = %key, value = %raw, "undecodable timestamp, treating as absent");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "store read failed, treating as absent");
                None
            }
        }
    }

    fn read_string(&self, key: StateKey) -> Option<String> {
        match self.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "store read failed, treating as absent");
                None
            }
        }
    }

    fn write_bool(&self, key: StateKey, value: bool) -> Result<(), StoreError> {
        self.set(key, if value { "true" } else { "false" })
    }

    /// `None` removes the key.
    fn write_millis(&self, key: StateKey, value: Option<u64>) -> Result<(), StoreError> {
        match value {
            Some(ms) => self.set(key, &ms.to_string()),
            None => self.remove(key),
        }
    }
}

impl<S: StateStore + ?Sized> StateStoreExt for S {}

/// In-process store. Shared across components through an `Arc`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<StateKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored pair, for assertions and diagnostics.
    pub fn dump(&self) -> Result<HashMap<StateKey, String>, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.clone())
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: StateKey) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(&key).cloned())
    }

    fn set(&self, key: StateKey, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: StateKey) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    impl StateStore for BrokenStore {
        fn get(&self, _key: StateKey) -> Result<Option<String>, StoreError> {
            Err(StoreError::Locked)
        }
        fn set(&self, _key: StateKey, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Locked)
        }
        fn remove(&self, _key: StateKey) -> Result<(), StoreError> {
            Err(StoreError::Locked)
        }
    }

    #[test]
    fn memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get(StateKey::IsLocked).unwrap().is_none());
        store.set(StateKey::IsLocked, "true").unwrap();
        assert_eq!(store.get(StateKey::IsLocked).unwrap().as_deref(), Some("true"));
        store.remove(StateKey::IsLocked).unwrap();
        assert!(store.get(StateKey::IsLocked).unwrap().is_none());
    }

    #[test]
    fn zero_timestamp_reads_as_absent() {
        let store = MemoryStore::new();
        store.set(StateKey::TimerEndTime, "0").unwrap();
        assert_eq!(store.read_millis(StateKey::TimerEndTime), None);
        store.write_millis(StateKey::TimerEndTime, Some(1_500)).unwrap();
        assert_eq!(store.read_millis(StateKey::TimerEndTime), Some(1_500));
        store.write_millis(StateKey::TimerEndTime, None).unwrap();
        assert!(store.get(StateKey::TimerEndTime).unwrap().is_none());
    }

    #[test]
    fn garbage_values_fall_back_to_defaults() {
        let store = MemoryStore::new();
        store.set(StateKey::IsLocked, "maybe").unwrap();
        store.set(StateKey::TimerEndTime, "soon").unwrap();
        assert!(store.read_bool(StateKey::IsLocked, true));
        assert!(!store.read_bool(StateKey::IsLocked, false));
        assert_eq!(store.read_millis(StateKey::TimerEndTime), None);
    }

    #[test]
    fn read_errors_yield_defaults() {
        let store = BrokenStore;
        assert!(store.read_bool(StateKey::ShowFloatingTimer, true));
        assert_eq!(store.read_millis(StateKey::BridgeGraceEndTime), None);
        assert_eq!(store.read_string(StateKey::MasterPin), None);
        assert!(store.write_bool(StateKey::IsLocked, true).is_err());
    }

    #[test]
    fn arc_store_shares_state() {
        let store = Arc::new(MemoryStore::new());
        let other = Arc::clone(&store);
        other.write_bool(StateKey::IsLocked, true).unwrap();
        assert!(store.read_bool(StateKey::IsLocked, false));
    }
}
