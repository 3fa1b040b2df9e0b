//! The shared credential store

use async_trait::async_trait;
use relay_clock::DurationSecs;

use crate::{error::StoreError, CredentialValue, CredentialValueRef, StoreKeyRef};

pub mod in_memory;
#[cfg(feature = "redis")]
#[cfg_attr(docsrs, doc(cfg(feature = "redis")))]
pub mod redis;

pub use in_memory::InMemoryCredentialStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisCredentialStore;

/// A key/value cache with per-entry expiry, shared by every instance
///
/// No atomicity is expected between a read and a later write. Two instances
/// may both observe a stale entry and both write a replacement; the last
/// write wins, and any freshly issued value is as good as another.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Reads the value stored under `key`
    ///
    /// A missing key is `Ok(None)`, never an error.
    async fn read(&self, key: &StoreKeyRef) -> Result<Option<CredentialValue>, StoreError>;

    /// Reads the remaining lifetime of `key`
    ///
    /// Zero when the key is absent or carries no expiry.
    async fn time_to_live(&self, key: &StoreKeyRef) -> Result<DurationSecs, StoreError>;

    /// Stores `value` under `key`, expiring after `ttl`
    ///
    /// Overwrites unconditionally. A zero `ttl` must be rejected.
    async fn write(
        &self,
        key: &StoreKeyRef,
        value: &CredentialValueRef,
        ttl: DurationSecs,
    ) -> Result<(), StoreError>;
}
