//! The collaborators shared by every refresh execution

use std::{fmt, sync::Arc};

use crate::{
    config::ConfigProvider, error::BuildError, issuer::UpstreamIssuer, store::CredentialStore,
    AppIdRef, CredentialKind, Namespace, NamespaceRef, StoreKey, KEY_SEPARATOR,
};

/// The namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "wc";

/// Configuration, store, and issuer, built once at startup
///
/// Cloning is cheap; every execution gets its own clone.
#[derive(Clone)]
pub struct RelayServices {
    config: Arc<dyn ConfigProvider>,
    store: Arc<dyn CredentialStore>,
    issuer: Arc<dyn UpstreamIssuer>,
    namespace: Namespace,
}

impl RelayServices {
    /// Starts assembling a services context
    pub fn builder() -> RelayServicesBuilder {
        RelayServicesBuilder::default()
    }

    /// The configuration provider
    #[inline]
    pub fn config(&self) -> &dyn ConfigProvider {
        &*self.config
    }

    /// The shared credential store
    #[inline]
    pub fn store(&self) -> &dyn CredentialStore {
        &*self.store
    }

    /// The upstream issuer
    #[inline]
    pub fn issuer(&self) -> &dyn UpstreamIssuer {
        &*self.issuer
    }

    /// The key namespace
    #[inline]
    pub fn namespace(&self) -> &NamespaceRef {
        &self.namespace
    }

    /// Builds the store key for `kind` within `scope`
    pub fn store_key(&self, kind: CredentialKind, scope: &AppIdRef) -> StoreKey {
        kind.descriptor().store_key(&self.namespace, scope)
    }
}

impl fmt::Debug for RelayServices {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RelayServices")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// Assembles a [`RelayServices`]
#[derive(Default)]
pub struct RelayServicesBuilder {
    config: Option<Arc<dyn ConfigProvider>>,
    store: Option<Arc<dyn CredentialStore>>,
    issuer: Option<Arc<dyn UpstreamIssuer>>,
    namespace: Option<Namespace>,
}

impl RelayServicesBuilder {
    /// Sets the configuration provider
    pub fn config(mut self, config: Arc<dyn ConfigProvider>) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the shared credential store
    pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the upstream issuer
    pub fn issuer(mut self, issuer: Arc<dyn UpstreamIssuer>) -> Self {
        self.issuer = Some(issuer);
        self
    }

    /// Overrides the key namespace, `wc` by default
    pub fn namespace(mut self, namespace: impl Into<Namespace>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Finishes assembly
    pub fn build(self) -> Result<RelayServices, BuildError> {
        let namespace = self
            .namespace
            .unwrap_or_else(|| Namespace::from_static(DEFAULT_NAMESPACE));
        if namespace.as_str().is_empty() || namespace.as_str().contains(KEY_SEPARATOR) {
            return Err(BuildError::InvalidNamespace(namespace.as_str().to_owned()));
        }

        Ok(RelayServices {
            config: self
                .config
                .ok_or(BuildError::MissingComponent("configuration provider"))?,
            store: self
                .store
                .ok_or(BuildError::MissingComponent("credential store"))?,
            issuer: self
                .issuer
                .ok_or(BuildError::MissingComponent("upstream issuer"))?,
            namespace,
        })
    }
}

impl fmt::Debug for RelayServicesBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RelayServicesBuilder")
            .field("config", &self.config.is_some())
            .field("store", &self.store.is_some())
            .field("issuer", &self.issuer.is_some())
            .field("namespace", &self.namespace)
            .finish()
    }
}
