//! Per-application settings and where they come from

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, AppId, AppSecret};

#[cfg(feature = "file")]
#[cfg_attr(docsrs, doc(cfg(feature = "file")))]
pub mod file;

#[cfg(feature = "file")]
pub use file::FileConfigProvider;

/// One of the two upstream applications whose credentials are kept fresh
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Application {
    /// The main application integration
    Primary,
    /// The secondary integration surface, which also issues tickets
    Secondary,
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        })
    }
}

/// Settings for a single upstream application
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationConfig {
    /// Whether credentials for this application are refreshed at all
    #[serde(default)]
    pub enabled: bool,
    /// The application identifier, also the scope of its credentials
    pub app_id: AppId,
    /// The secret presented to the issuer
    pub app_secret: AppSecret,
}

impl ApplicationConfig {
    /// Settings for an enabled application
    pub fn enabled(app_id: impl Into<AppId>, app_secret: impl Into<AppSecret>) -> Self {
        Self {
            enabled: true,
            app_id: app_id.into(),
            app_secret: app_secret.into(),
        }
    }

    /// The same settings, switched off
    pub fn disabled(self) -> Self {
        Self {
            enabled: false,
            ..self
        }
    }
}

/// The complete configuration consulted on every refresh
///
/// An application that is absent is treated the same as one that is disabled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    /// The primary application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<ApplicationConfig>,
    /// The secondary application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<ApplicationConfig>,
}

impl RelayConfig {
    /// Gets the settings for `application`, whether or not it is enabled
    pub fn application(&self, application: Application) -> Option<&ApplicationConfig> {
        match application {
            Application::Primary => self.primary.as_ref(),
            Application::Secondary => self.secondary.as_ref(),
        }
    }

    /// Gets the settings for `application` only if it is enabled
    pub fn enabled_application(&self, application: Application) -> Option<&ApplicationConfig> {
        self.application(application).filter(|a| a.enabled)
    }

    /// Checks that every enabled application can actually be refreshed
    pub fn validate(&self) -> Result<(), ConfigError> {
        for application in [Application::Primary, Application::Secondary] {
            if let Some(settings) = self.enabled_application(application) {
                if settings.app_id.as_str().is_empty() {
                    return Err(ConfigError::Invalid {
                        application,
                        reason: "app id is empty",
                    });
                }
                if settings.app_secret.as_str().is_empty() {
                    return Err(ConfigError::Invalid {
                        application,
                        reason: "app secret is empty",
                    });
                }
            }
        }

        Ok(())
    }
}

/// A source of configuration
///
/// Loaded once at the start of every refresh execution, so changes are
/// picked up on the next scheduled cycle.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Loads the current configuration
    async fn load(&self) -> Result<RelayConfig, ConfigError>;
}

/// A configuration provider that always returns the same value
#[derive(Clone, Debug)]
pub struct StaticConfigProvider {
    config: RelayConfig,
}

impl StaticConfigProvider {
    /// Constructs a provider returning `config`
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConfigProvider for StaticConfigProvider {
    async fn load(&self) -> Result<RelayConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config.clone())
    }
}
