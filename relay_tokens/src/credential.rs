//! Snapshots of cached credentials and their freshness

use relay_clock::DurationSecs;

use crate::{AppId, CredentialKind, CredentialValue};

/// A credential as currently held by the shared store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    /// What kind of credential this is
    pub kind: CredentialKind,
    /// The application the credential belongs to
    pub scope_id: AppId,
    /// The cached value; empty when nothing is cached
    pub value: CredentialValue,
    /// Lifetime remaining when the store was read
    ///
    /// Meaningless when `value` is empty.
    pub remaining_ttl: DurationSecs,
}

impl Credential {
    /// Whether the store holds a usable value
    #[inline]
    pub fn is_present(&self) -> bool {
        !self.value.is_empty()
    }

    /// Whether the value is present and outlives `threshold`
    #[inline]
    pub fn is_fresh(&self, threshold: DurationSecs) -> bool {
        self.is_present() && self.remaining_ttl > threshold
    }

    /// The kind whose current value is needed to issue this one
    #[inline]
    pub fn depends_on(&self) -> Option<CredentialKind> {
        self.kind.depends_on()
    }
}
