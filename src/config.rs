//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

/// Main harness configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    pub target: TargetConfig,
    pub auth: AuthConfig,
    pub accounts: AccountsConfig,
    pub retrieve: RetrieveConfig,
    pub evidence: EvidenceConfig,
    pub logging: LoggingConfig,
}

/// Deployment under test
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Base URL of the deployment (e.g., "https://pacs.example.org")
    pub base_url: String,
    /// DICOMWeb mount point behind the proxy (e.g., "/pacs")
    pub dicomweb_path: String,
    /// Protected viewer path; navigating here triggers the login redirect
    pub viewer_path: String,
    /// Administrative UI path, used for role checks
    pub admin_path: String,
}

impl TargetConfig {
    fn joined(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Full URL of the protected viewer entry point
    pub fn viewer_url(&self) -> String {
        self.joined(&self.viewer_path)
    }

    /// Full URL of the administrative UI
    pub fn admin_url(&self) -> String {
        self.joined(&self.admin_path)
    }

    /// Full URL of the DICOMWeb root (no trailing slash)
    pub fn dicomweb_url(&self) -> String {
        self.joined(&self.dicomweb_path)
    }
}

/// How a credential is acquired
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// Interactive Keycloak login through a headless browser; yields the
    /// OAuth2 Proxy session cookies. The only mode the proxy accepts.
    #[default]
    Browser,
    /// Resource Owner Password Credentials grant straight against Keycloak;
    /// yields a bearer token. Useful against deployments without the proxy.
    DirectGrant,
}

/// Identity stack configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    /// Keycloak realm (e.g., "ohif")
    pub realm: String,
    /// OIDC client id for the direct grant
    pub client_id: String,
    /// Client secret, required only for confidential clients
    pub client_secret: Option<String>,
    /// Substring identifying the session-proxy cookie (e.g., "oauth2")
    pub session_cookie_fragment: String,
    /// Bound on the wait for the authenticated URL after sign-in
    pub login_timeout_seconds: u64,
}

impl AuthConfig {
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_seconds)
    }
}

/// Test account pair
#[derive(Debug, Clone, Deserialize)]
pub struct AccountsConfig {
    /// Low-privilege account (query/retrieve only)
    pub viewer: AccountConfig,
    /// High-privilege account (admin UI access)
    pub admin: AccountConfig,
}

/// A single test account
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub username: String,
    pub password: String,
}

/// Timeouts and resource bounds for query/retrieve calls
#[derive(Debug, Clone, Deserialize)]
pub struct RetrieveConfig {
    /// Timeout for QIDO-RS query calls (default: 30s)
    pub query_timeout_seconds: u64,
    /// Timeout for WADO-RS retrieve calls; series/study payloads can be
    /// large (default: 120s, at most 240s)
    pub retrieve_timeout_seconds: u64,
    /// Cap on multipart parts materialized as evidence per retrieve
    pub max_evidence_parts: usize,
}

impl RetrieveConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_seconds)
    }

    pub fn retrieve_timeout(&self) -> Duration {
        Duration::from_secs(self.retrieve_timeout_seconds)
    }
}

/// Evidence artifact persistence
#[derive(Debug, Clone, Deserialize)]
pub struct EvidenceConfig {
    /// Persist extracted payloads and response bodies to disk
    pub enabled: bool,
    /// Root directory for evidence artifacts
    pub dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl HarnessConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (PACSPROBE_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::HarnessError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("target.dicomweb_path", "/pacs")?
            .set_default("target.viewer_path", "/ohif-viewer")?
            .set_default("target.admin_path", "/orthanc-admin")?
            .set_default("auth.mode", "browser")?
            .set_default("auth.realm", "ohif")?
            .set_default("auth.client_id", "api-testing-client")?
            .set_default("auth.session_cookie_fragment", "oauth2")?
            .set_default("auth.login_timeout_seconds", 15)?
            .set_default("retrieve.query_timeout_seconds", 30)?
            .set_default("retrieve.retrieve_timeout_seconds", 120)?
            .set_default("retrieve.max_evidence_parts", 15)?
            .set_default("evidence.enabled", true)?
            .set_default("evidence.dir", "evidence")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (PACSPROBE_*)
            .add_source(
                Environment::with_prefix("PACSPROBE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::HarnessError::Config(e.to_string()))?;

        let harness_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::HarnessError::Config(e.to_string()))?;
        harness_config.validate()?;
        Ok(harness_config)
    }

    fn validate(&self) -> Result<(), crate::error::HarnessError> {
        use crate::error::HarnessError;

        let parsed = url::Url::parse(&self.target.base_url)
            .map_err(|e| HarnessError::Config(format!("target.base_url is not a URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(HarnessError::Config(
                "target.base_url must use http or https".to_string(),
            ));
        }

        for (name, account) in [
            ("accounts.viewer", &self.accounts.viewer),
            ("accounts.admin", &self.accounts.admin),
        ] {
            if account.username.is_empty() || account.password.is_empty() {
                return Err(HarnessError::Config(format!(
                    "{name} must have a non-empty username and password"
                )));
            }
        }

        if self.retrieve.max_evidence_parts == 0 {
            return Err(HarnessError::Config(
                "retrieve.max_evidence_parts must be at least 1".to_string(),
            ));
        }

        if self.retrieve.retrieve_timeout_seconds > 240 {
            return Err(HarnessError::Config(
                "retrieve.retrieve_timeout_seconds must not exceed 240".to_string(),
            ));
        }

        if self.auth.login_timeout_seconds == 0 {
            return Err(HarnessError::Config(
                "auth.login_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
