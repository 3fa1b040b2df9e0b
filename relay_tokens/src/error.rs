//! Errors raised while keeping credentials fresh

use std::{error, fmt, io};

use thiserror::Error;

use crate::{Application, CredentialKind};

type BoxError = Box<dyn error::Error + Send + Sync + 'static>;

/// Configuration could not be resolved
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration source could not be read
    #[error("unable to read configuration")]
    Io(#[from] io::Error),
    /// The configuration could not be parsed
    #[cfg(feature = "file")]
    #[cfg_attr(docsrs, doc(cfg(feature = "file")))]
    #[error("unable to parse configuration")]
    Parse(#[from] serde_json::Error),
    /// The configuration was read but describes an unusable setup
    #[error("invalid configuration for {application} application: {reason}")]
    Invalid {
        /// The application whose settings are unusable
        application: Application,
        /// What is wrong with them
        reason: &'static str,
    },
    /// A custom configuration provider failed
    #[error("configuration provider failed")]
    Provider(#[source] BoxError),
}

/// The credential store could not be reached or refused the operation
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying transport failed
    #[error("credential store transport failed")]
    Transport(#[source] BoxError),
    /// A write was attempted with a zero lifetime
    #[error("refusing to store a credential without a lifetime")]
    ZeroLifetime,
}

impl StoreError {
    /// Wraps an arbitrary transport error
    pub fn transport(source: impl Into<BoxError>) -> Self {
        Self::Transport(source.into())
    }
}

/// The issuer could not be reached, or its reply could not be understood
#[derive(Debug, Error)]
#[error("unable to obtain a response from the credential issuer")]
pub struct IssuerTransportError {
    #[from]
    source: BoxError,
}

impl IssuerTransportError {
    /// Wraps an arbitrary transport error
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// The store operation that failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOperation {
    /// Reading a cached value
    Read,
    /// Reading a cached value's remaining lifetime
    TimeToLive,
    /// Writing a new value
    Write,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::TimeToLive => "ttl",
            Self::Write => "write",
        })
    }
}

/// A single refresh execution ended without producing a fresh credential
///
/// None of these are fatal. The cached credential keeps its last known value
/// and the next scheduled execution tries again.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// Enablement or scope could not be resolved
    #[error("configuration unavailable")]
    ConfigUnavailable(#[from] ConfigError),
    /// The shared store failed
    #[error("credential store unavailable during {operation}")]
    StoreUnavailable {
        /// The operation being attempted
        operation: StoreOperation,
        /// The store's error
        #[source]
        source: StoreError,
    },
    /// A credential this kind depends on is not cached yet
    #[error("{kind} requires a cached {dependency}")]
    DependencyMissing {
        /// The kind being refreshed
        kind: CredentialKind,
        /// The kind it depends on
        dependency: CredentialKind,
    },
    /// The issuer could not be reached
    #[error("issuer transport failed")]
    IssuerTransport(#[from] IssuerTransportError),
    /// The issuer answered with an application-level error
    #[error("issuer rejected the request with code {code}: {message}")]
    IssuerRejected {
        /// The issuer's error code
        code: i64,
        /// The issuer's error message
        message: String,
    },
}

impl RefreshError {
    pub(crate) fn store(operation: StoreOperation) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::StoreUnavailable { operation, source }
    }
}

/// The services context could not be assembled
#[derive(Debug, Error)]
pub enum BuildError {
    /// A required collaborator was never provided
    #[error("no {0} was provided")]
    MissingComponent(&'static str),
    /// The key namespace is empty or contains the key separator
    #[error("invalid key namespace '{0}'")]
    InvalidNamespace(String),
}
