//! A credential store backed by a shared Redis instance

use std::fmt;

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands};
use relay_clock::DurationSecs;

use super::CredentialStore;
use crate::{error::StoreError, CredentialValue, CredentialValueRef, StoreKeyRef};

/// A credential store that uses Redis `GET`, `TTL`, and `SET EX`
///
/// The connection is multiplexed, so a single store can be shared by every
/// refresh execution in the process.
#[derive(Clone)]
pub struct RedisCredentialStore {
    connection: MultiplexedConnection,
}

impl RedisCredentialStore {
    /// Opens a multiplexed connection using `client`
    pub async fn connect(client: &redis::Client) -> Result<Self, StoreError> {
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(StoreError::transport)?;
        Ok(Self::from_connection(connection))
    }

    /// Wraps an already established connection
    pub fn from_connection(connection: MultiplexedConnection) -> Self {
        Self { connection }
    }
}

impl fmt::Debug for RedisCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RedisCredentialStore").finish_non_exhaustive()
    }
}

/// Maps a Redis `TTL` reply to a remaining lifetime
///
/// Redis answers `-2` for a missing key and `-1` for a key without expiry;
/// neither carries a usable lifetime.
fn remaining_from_ttl_reply(reply: i64) -> DurationSecs {
    u64::try_from(reply).map(DurationSecs).unwrap_or_default()
}

#[async_trait]
impl CredentialStore for RedisCredentialStore {
    async fn read(&self, key: &StoreKeyRef) -> Result<Option<CredentialValue>, StoreError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn
            .get(key.as_str())
            .await
            .map_err(StoreError::transport)?;
        Ok(value.map(CredentialValue::from))
    }

    async fn time_to_live(&self, key: &StoreKeyRef) -> Result<DurationSecs, StoreError> {
        let mut conn = self.connection.clone();
        let reply: i64 = conn
            .ttl(key.as_str())
            .await
            .map_err(StoreError::transport)?;
        Ok(remaining_from_ttl_reply(reply))
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

        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key.as_str(), value.as_str(), ttl.0)
            .await
            .map_err(StoreError::transport)?;
        tracing::trace!(key = %key, ttl = ttl.0, "stored credential in redis");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_replies_without_lifetime_map_to_zero() {
        assert_eq!(remaining_from_ttl_reply(-2), DurationSecs::ZERO);
        assert_eq!(remaining_from_ttl_reply(-1), DurationSecs::ZERO);
        assert_eq!(remaining_from_ttl_reply(0), DurationSecs::ZERO);
        assert_eq!(remaining_from_ttl_reply(7200), DurationSecs(7200));
    }
}
