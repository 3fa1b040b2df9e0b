//! The upstream service that issues credentials

use async_trait::async_trait;
use relay_clock::DurationSecs;
use serde::{Deserialize, Serialize};

use crate::{
    error::{IssuerTransportError, RefreshError},
    ApplicationConfig, CredentialValue, CredentialValueRef,
};

/// The issuer of fresh credentials
///
/// Implementations own the wire protocol, including any timeouts. Requests
/// are safe to repeat: several instances may ask for the same credential at
/// nearly the same time.
#[async_trait]
pub trait UpstreamIssuer: Send + Sync {
    /// Requests an access token for `application`
    ///
    /// When `force_refresh` is set, the issuer is asked to mint a new token
    /// even if the one it last issued is still valid.
    async fn fetch_access_token(
        &self,
        application: &ApplicationConfig,
        force_refresh: bool,
    ) -> Result<IssuerResponse, IssuerTransportError>;

    /// Requests a ticket by presenting a valid access token
    async fn fetch_ticket(
        &self,
        access_token: &CredentialValueRef,
    ) -> Result<IssuerResponse, IssuerTransportError>;
}

/// The issuer's reply to a credential request
///
/// A nonzero `errcode` means the request was rejected and the remaining
/// fields should not be trusted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerResponse {
    /// The issued credential
    #[serde(default, alias = "access_token", alias = "ticket")]
    pub value: String,
    /// How long the credential stays valid
    #[serde(default)]
    pub expires_in: DurationSecs,
    /// Application-level error code, zero on success
    #[serde(default)]
    pub errcode: i64,
    /// Application-level error message
    #[serde(default)]
    pub errmsg: String,
}

impl IssuerResponse {
    /// A successful response
    pub fn issued(value: impl Into<String>, expires_in: DurationSecs) -> Self {
        Self {
            value: value.into(),
            expires_in,
            ..Self::default()
        }
    }

    /// A rejection
    pub fn rejected(errcode: i64, errmsg: impl Into<String>) -> Self {
        Self {
            errcode,
            errmsg: errmsg.into(),
            ..Self::default()
        }
    }

    /// Interprets the response
    ///
    /// A success that carries no value or no lifetime cannot be cached and is
    /// treated as a rejection.
    pub fn into_issued(self) -> Result<IssuedCredential, RefreshError> {
        if self.errcode != 0 {
            return Err(RefreshError::IssuerRejected {
                code: self.errcode,
                message: self.errmsg,
            });
        }

        if self.value.is_empty() || self.expires_in.is_zero() {
            return Err(RefreshError::IssuerRejected {
                code: 0,
                message: "issuer returned an empty credential".to_owned(),
            });
        }

        Ok(IssuedCredential {
            value: CredentialValue::from(self.value),
            lifetime: self.expires_in,
        })
    }
}

/// A freshly issued credential and its issuer-declared lifetime
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedCredential {
    /// The credential
    pub value: CredentialValue,
    /// How long the issuer says it stays valid
    pub lifetime: DurationSecs,
}
