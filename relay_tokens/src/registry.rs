//! The credential kinds kept fresh, and everything kind-specific about them

use std::fmt;

use relay_clock::DurationSecs;

use crate::{AppIdRef, Application, NamespaceRef, StoreKey};

/// Remaining lifetime at or below which a cached credential is refreshed
pub const STALENESS_THRESHOLD: DurationSecs = DurationSecs::from_mins(5);

/// Separates the segments of a store key
pub const KEY_SEPARATOR: char = ':';

/// A kind of credential kept in the shared store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// The access token of the primary application
    PrimaryAccessToken,
    /// The access token of the secondary application
    SecondaryAccessToken,
    /// A ticket that can only be issued against a valid secondary access token
    DependentTicket,
}

impl CredentialKind {
    /// Every kind, with dependencies listed before their dependents
    pub const ALL: [CredentialKind; 3] = [
        CredentialKind::PrimaryAccessToken,
        CredentialKind::SecondaryAccessToken,
        CredentialKind::DependentTicket,
    ];

    /// Looks up the registry entry for this kind
    #[inline]
    pub fn descriptor(self) -> &'static KindDescriptor {
        match self {
            Self::PrimaryAccessToken => &REGISTRY[0],
            Self::SecondaryAccessToken => &REGISTRY[1],
            Self::DependentTicket => &REGISTRY[2],
        }
    }

    /// The kind that must already be cached before this one can be issued
    #[inline]
    pub fn depends_on(self) -> Option<CredentialKind> {
        self.descriptor().depends_on()
    }

    fn name(self) -> &'static str {
        match self {
            Self::PrimaryAccessToken => "primary_access_token",
            Self::SecondaryAccessToken => "secondary_access_token",
            Self::DependentTicket => "dependent_ticket",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a fresh value for a kind is obtained from the issuer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueOperation {
    /// Exchange the application's identifier and secret for an access token
    AccessToken,
    /// Exchange a cached access token for a ticket
    Ticket {
        /// The kind whose cached value is presented to the issuer
        access_token: CredentialKind,
    },
}

/// Everything the refresh policy needs to know about one credential kind
#[derive(Debug)]
pub struct KindDescriptor {
    /// The kind described
    pub kind: CredentialKind,
    /// The key segment identifying this kind
    pub tag: &'static str,
    /// The application whose configuration enables and scopes this kind
    pub application: Application,
    /// How a new value is issued
    pub operation: IssueOperation,
    /// Remaining lifetime at or below which the cached value is refreshed
    pub staleness_threshold: DurationSecs,
}

impl KindDescriptor {
    /// The kind this one depends on, if any
    #[inline]
    pub fn depends_on(&self) -> Option<CredentialKind> {
        match self.operation {
            IssueOperation::AccessToken => None,
            IssueOperation::Ticket { access_token } => Some(access_token),
        }
    }

    /// Builds the store key for this kind within `scope`
    ///
    /// Keys take the form `<namespace>:<tag>:<scope>`. Tags never contain the
    /// separator, so keys cannot collide across kinds for the same namespace.
    pub fn store_key(&self, namespace: &NamespaceRef, scope: &AppIdRef) -> StoreKey {
        StoreKey::from(format!(
            "{}{sep}{}{sep}{}",
            namespace.as_str(),
            self.tag,
            scope.as_str(),
            sep = KEY_SEPARATOR,
        ))
    }
}

static REGISTRY: [KindDescriptor; 3] = [
    KindDescriptor {
        kind: CredentialKind::PrimaryAccessToken,
        tag: "at",
        application: Application::Primary,
        operation: IssueOperation::AccessToken,
        staleness_threshold: STALENESS_THRESHOLD,
    },
    KindDescriptor {
        kind: CredentialKind::SecondaryAccessToken,
        tag: "pat",
        application: Application::Secondary,
        operation: IssueOperation::AccessToken,
        staleness_threshold: STALENESS_THRESHOLD,
    },
    KindDescriptor {
        kind: CredentialKind::DependentTicket,
        tag: "jt",
        application: Application::Secondary,
        operation: IssueOperation::Ticket {
            access_token: CredentialKind::SecondaryAccessToken,
        },
        staleness_threshold: STALENESS_THRESHOLD,
    },
];
