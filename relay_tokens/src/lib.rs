//! Keeping short-lived upstream credentials fresh in a cache shared by many instances
//!
//! A horizontally scaled service often needs credentials that an upstream
//! issuer hands out with a short lifetime: application access tokens, and
//! tickets that can only be obtained by presenting one of those tokens. If
//! every instance asked the issuer for its own copy, the instances would burn
//! through issuer quota and invalidate each other's tokens. Instead, the
//! current credential lives in a shared store, and each instance runs a
//! refresh policy that only contacts the issuer when the stored credential is
//! missing or about to go stale.
//!
//! # The refresh policy
//!
//! For each [`CredentialKind`], a [`RefreshPolicy`] execution:
//!
//! 1. loads the configuration once, and stops if the kind is disabled;
//! 2. reads the cached value and its remaining lifetime;
//! 3. stops if the value is present and outlives the
//!    [staleness threshold][STALENESS_THRESHOLD] of five minutes;
//! 4. for a ticket, reads the cached access token it depends on, and stops
//!    if there is none (the token is refreshed by its own execution);
//! 5. asks the [`UpstreamIssuer`] for a new value;
//! 6. writes the new value to the [`CredentialStore`] with the lifetime the
//!    issuer declared, or leaves the store untouched if the issuer failed.
//!
//! Every failure is logged and reported, never raised. The cached credential
//! keeps its last known value and the next execution tries again.
//!
//! There is no lock between reading and writing the store. Two instances can
//! both see a stale credential and both replace it; the second write wins
//! and the first value is just as valid.
//!
//! # Running it
//!
//! Collaborators are gathered once into a [`RelayServices`] and cloned into
//! every execution. [`RefreshScheduler`] runs each kind on a fixed cadence,
//! isolating every execution on its own task so that a panic in one kind
//! cannot stop the others.
//!
//! ```
//! use std::{sync::Arc, time::Duration};
//!
//! use relay_tokens::{
//!     store::InMemoryCredentialStore, ApplicationConfig, RefreshScheduler, RelayConfig,
//!     RelayServices, StaticConfigProvider,
//! };
//! # use relay_tokens::{CredentialValueRef, IssuerResponse, IssuerTransportError, UpstreamIssuer};
//! # struct Issuer;
//! # #[async_trait::async_trait]
//! # impl UpstreamIssuer for Issuer {
//! #     async fn fetch_access_token(&self, _: &ApplicationConfig, _: bool) -> Result<IssuerResponse, IssuerTransportError> {
//! #         Ok(IssuerResponse::issued("token", relay_clock::DurationSecs(7200)))
//! #     }
//! #     async fn fetch_ticket(&self, _: &CredentialValueRef) -> Result<IssuerResponse, IssuerTransportError> {
//! #         Ok(IssuerResponse::issued("ticket", relay_clock::DurationSecs(7200)))
//! #     }
//! # }
//! # #[tokio::main(flavor = "current_thread")] async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let issuer = Issuer;
//!
//! let config = RelayConfig {
//!     primary: Some(ApplicationConfig::enabled("app1", "secret")),
//!     secondary: None,
//! };
//!
//! let services = RelayServices::builder()
//!     .config(Arc::new(StaticConfigProvider::new(config)))
//!     .store(Arc::new(InMemoryCredentialStore::new()))
//!     .issuer(Arc::new(issuer))
//!     .build()?;
//!
//! let scheduler = RefreshScheduler::new(Duration::from_secs(60)).spawn(services);
//! # scheduler.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! * `file` (default): a [`ConfigProvider`] reading JSON from disk.
//! * `rand` (default): a [`JitterSource`][jitter::JitterSource] that spreads
//!   out the first run of instances started together.
//! * `redis`: a [`CredentialStore`] backed by Redis.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod braids;
pub mod config;
mod credential;
pub mod error;
pub mod execution;
pub mod issuer;
pub mod jitter;
pub mod policy;
mod registry;
pub mod scheduler;
mod services;
pub mod store;

pub use braids::*;
pub use config::{Application, ApplicationConfig, ConfigProvider, RelayConfig, StaticConfigProvider};
pub use credential::Credential;
pub use error::{IssuerTransportError, RefreshError};
pub use execution::{execute_isolated, run_cycle, ExecutionReport};
pub use issuer::{IssuedCredential, IssuerResponse, UpstreamIssuer};
pub use policy::{read_credential, RefreshOutcome, RefreshPolicy};
pub use registry::{CredentialKind, IssueOperation, KindDescriptor, KEY_SEPARATOR, STALENESS_THRESHOLD};
pub use scheduler::{RefreshScheduler, SchedulerHandle};
pub use services::{RelayServices, RelayServicesBuilder, DEFAULT_NAMESPACE};
pub use store::CredentialStore;
