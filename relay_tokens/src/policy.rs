//! Deciding whether a cached credential needs replacing, and replacing it

use std::error;

use relay_clock::DurationSecs;
use tracing::{field, Instrument};

use crate::{
    error::{RefreshError, StoreOperation},
    registry::{IssueOperation, KindDescriptor},
    AppIdRef, Credential, CredentialKind, CredentialValue, RelayConfig, RelayServices,
};

/// How a refresh execution ended when nothing went wrong
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The kind is switched off; nothing was read or written
    Disabled,
    /// The cached value outlives the staleness threshold and was left alone
    Fresh {
        /// Lifetime remaining on the cached value
        remaining: DurationSecs,
    },
    /// A new value was issued and written to the store
    Refreshed {
        /// The issuer-declared lifetime of the new value
        lifetime: DurationSecs,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RefreshMode {
    Scheduled,
    Forced,
}

/// The refresh policy for one credential kind
///
/// Each call to [`run()`][Self::run()] is a complete, independent execution:
/// it loads configuration once, consults the store, and calls the issuer
/// only when the cached value is missing or about to go stale. There is no
/// retry; a failed execution leaves the store untouched and the next
/// scheduled execution tries again.
///
/// No lock is held between reading the store and writing to it. Instances
/// racing on the same stale entry may each fetch and write a value, which
/// costs issuer quota but never leaves the store inconsistent.
#[derive(Clone, Debug)]
pub struct RefreshPolicy {
    services: RelayServices,
    descriptor: &'static KindDescriptor,
}

impl RefreshPolicy {
    /// Constructs the policy for `kind`
    pub fn new(services: RelayServices, kind: CredentialKind) -> Self {
        Self {
            services,
            descriptor: kind.descriptor(),
        }
    }

    /// The kind this policy refreshes
    #[inline]
    pub fn kind(&self) -> CredentialKind {
        self.descriptor.kind
    }

    /// Refreshes the credential if it is absent or stale
    pub async fn run(&self) -> Result<RefreshOutcome, RefreshError> {
        self.run_in_span(RefreshMode::Scheduled).await
    }

    /// Refreshes the credential regardless of its remaining lifetime
    ///
    /// Access tokens are requested with the issuer's force flag set. Disabled
    /// kinds and missing dependencies still end the execution early.
    pub async fn run_forced(&self) -> Result<RefreshOutcome, RefreshError> {
        self.run_in_span(RefreshMode::Forced).await
    }

    async fn run_in_span(&self, mode: RefreshMode) -> Result<RefreshOutcome, RefreshError> {
        let span = tracing::info_span!(
            "refresh_credential",
            kind = %self.kind(),
            scope = field::Empty,
            forced = mode == RefreshMode::Forced,
        );

        async move {
            let result = self.execute(mode).await;
            if let Err(error) = &result {
                log_failure(error);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, mode: RefreshMode) -> Result<RefreshOutcome, RefreshError> {
        let config = self.services.config().load().await?;

        let application = match config.enabled_application(self.descriptor.application) {
            Some(application) => application,
            None => {
                tracing::debug!("credential kind disabled, skipping");
                return Ok(RefreshOutcome::Disabled);
            }
        };
        tracing::Span::current().record("scope", application.app_id.as_str());

        let current = read_current(&self.services, self.descriptor, &application.app_id).await?;

        if mode == RefreshMode::Scheduled && current.is_fresh(self.descriptor.staleness_threshold)
        {
            tracing::trace!(
                remaining = current.remaining_ttl.0,
                "cached credential is fresh"
            );
            return Ok(RefreshOutcome::Fresh {
                remaining: current.remaining_ttl,
            });
        }

        tracing::debug!(
            present = current.is_present(),
            remaining = current.remaining_ttl.0,
            "cached credential needs refreshing"
        );

        let response = match self.descriptor.operation {
            IssueOperation::AccessToken => {
                self.services
                    .issuer()
                    .fetch_access_token(application, mode == RefreshMode::Forced)
                    .await?
            }
            IssueOperation::Ticket { access_token } => {
                let access_token = self.resolve_dependency(&config, access_token).await?;
                self.services.issuer().fetch_ticket(&access_token).await?
            }
        };
        let issued = response.into_issued()?;

        let key = self.services.store_key(self.kind(), &application.app_id);
        self.services
            .store()
            .write(&key, &issued.value, issued.lifetime)
            .await
            .map_err(RefreshError::store(StoreOperation::Write))?;

        tracing::info!(
            key = %key,
            lifetime = issued.lifetime.0,
            "refreshed credential in shared store"
        );

        Ok(RefreshOutcome::Refreshed {
            lifetime: issued.lifetime,
        })
    }

    /// Reads the cached value of the kind this one depends on
    ///
    /// Never refreshes the dependency; that is left to its own execution.
    async fn resolve_dependency(
        &self,
        config: &RelayConfig,
        dependency: CredentialKind,
    ) -> Result<CredentialValue, RefreshError> {
        let missing = || RefreshError::DependencyMissing {
            kind: self.kind(),
            dependency,
        };

        let scope = &config
            .application(dependency.descriptor().application)
            .ok_or_else(missing)?
            .app_id;
        let key = self.services.store_key(dependency, scope);

        self.services
            .store()
            .read(&key)
            .await
            .map_err(RefreshError::store(StoreOperation::Read))?
            .filter(|value| !value.is_empty())
            .ok_or_else(missing)
    }
}

async fn read_current(
    services: &RelayServices,
    descriptor: &KindDescriptor,
    scope: &AppIdRef,
) -> Result<Credential, RefreshError> {
    let key = services.store_key(descriptor.kind, scope);
    let store = services.store();

    let value = store
        .read(&key)
        .await
        .map_err(RefreshError::store(StoreOperation::Read))?;
    let remaining_ttl = store
        .time_to_live(&key)
        .await
        .map_err(RefreshError::store(StoreOperation::TimeToLive))?;

    Ok(Credential {
        kind: descriptor.kind,
        scope_id: scope.to_owned(),
        value: value.unwrap_or_else(|| CredentialValue::from_static("")),
        remaining_ttl,
    })
}

/// Reads the shared credential of `kind`, for use by host code
///
/// Returns `None` when the kind is disabled or nothing is cached. Never
/// contacts the issuer.
pub async fn read_credential(
    services: &RelayServices,
    kind: CredentialKind,
) -> Result<Option<Credential>, RefreshError> {
    let descriptor = kind.descriptor();
    let config = services.config().load().await?;
    let application = match config.enabled_application(descriptor.application) {
        Some(application) => application,
        None => return Ok(None),
    };

    let credential = read_current(services, descriptor, &application.app_id).await?;
    Ok(Some(credential).filter(Credential::is_present))
}

fn log_failure(error: &RefreshError) {
    match error {
        RefreshError::DependencyMissing { dependency, .. } => {
            tracing::debug!(
                %dependency,
                "dependency not cached yet, deferring to a later cycle"
            );
        }
        RefreshError::IssuerRejected { code, message } => {
            tracing::warn!(code, message = %message, "issuer rejected credential request");
        }
        RefreshError::IssuerTransport(source) => {
            tracing::warn!(
                error = (source as &dyn error::Error),
                "unable to reach credential issuer"
            );
        }
        RefreshError::ConfigUnavailable(source) => {
            tracing::error!(
                error = (source as &dyn error::Error),
                "unable to load configuration"
            );
        }
        RefreshError::StoreUnavailable { operation, source } => {
            tracing::error!(
                %operation,
                error = (source as &dyn error::Error),
                "credential store unavailable"
            );
        }
    }
}
