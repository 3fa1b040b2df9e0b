//! An in-process credential store

use std::collections::HashMap;

use async_trait::async_trait;
use relay_clock::{Clock, DurationSecs, System, UnixTime};
use tokio::sync::Mutex;

use super::CredentialStore;
use crate::{error::StoreError, CredentialValue, CredentialValueRef, StoreKey, StoreKeyRef};

#[derive(Debug)]
struct Entry {
    value: CredentialValue,
    expires_at: UnixTime,
}

/// A value held by the store along with its remaining lifetime
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredEntry {
    /// The stored value
    pub value: CredentialValue,
    /// Time left before the entry expires
    pub remaining: DurationSecs,
}

/// A credential store held in process memory
///
/// Only shared within one process, so it does not coordinate instances. It
/// exists for tests, demos, and single-instance deployments. Entries expire
/// lazily according to the store's clock.
#[derive(Debug)]
pub struct InMemoryCredentialStore<C = System> {
    entries: Mutex<HashMap<StoreKey, Entry>>,
    clock: C,
}

impl InMemoryCredentialStore<System> {
    /// Constructs an empty store using the system clock
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock: System,
        }
    }
}

impl Default for InMemoryCredentialStore<System> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> InMemoryCredentialStore<C> {
    /// Sets a custom clock to be used
    ///
    /// Useful for testing purposes
    pub fn with_clock<D>(self, clock: D) -> InMemoryCredentialStore<D> {
        InMemoryCredentialStore {
            entries: self.entries,
            clock,
        }
    }
}

impl<C: Clock> InMemoryCredentialStore<C> {
    /// Returns every live entry and its remaining lifetime
    pub async fn snapshot(&self) -> HashMap<StoreKey, StoredEntry> {
        let now = self.clock.now();
        let entries = self.entries.lock().await;
        entries
            .iter()
            .filter(|(_, e)| e.expires_at > now)
            .map(|(k, e)| {
                (
                    k.clone(),
                    StoredEntry {
                        value: e.value.clone(),
                        remaining: e.expires_at - now,
                    },
                )
            })
            .collect()
    }

    /// Looks up a live entry, evicting it if it has expired
    async fn live_entry<T>(&self, key: &StoreKeyRef, f: impl FnOnce(&Entry) -> T) -> Option<T> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(f(entry)),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl<C: Clock + Send + Sync> CredentialStore for InMemoryCredentialStore<C> {
    async fn read(&self, key: &StoreKeyRef) -> Result<Option<CredentialValue>, StoreError> {
        Ok(self.live_entry(key, |e| e.value.clone()).await)
    }

    async fn time_to_live(&self, key: &StoreKeyRef) -> Result<DurationSecs, StoreError> {
        let now = self.clock.now();
        Ok(self
            .live_entry(key, |e| e.expires_at - now)
            .await
            .unwrap_or_default())
    }

    async fn write(
        &self,
        key: &StoreKeyRef,
        value: &CredentialValueRef,
        ttl: DurationSecs,
    ) -> Result<(), StoreError> {
        if ttl.is_zero() {
            return Err(StoreError::ZeroLifetime);
        }

        let entry = Entry {
            value: value.to_owned(),
            expires_at: self.clock.now() + ttl,
        };
        self.entries.lock().await.insert(key.to_owned(), entry);
        Ok(())
    }
}
