//! Direct interaction with the Keycloak identity provider
//!
//! The proxy in front of the PACS only accepts its own session cookies, so
//! the browser flow is the primary path. The direct grant here (Resource
//! Owner Password Credentials) is for deployments reachable without the
//! proxy, and for checking that the realm is alive at all.

use serde::Deserialize;

use crate::config::AuthConfig;
use crate::error::{HarnessError, Result};

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds
    pub expires_in: Option<u64>,
    /// Normally "Bearer"
    pub token_type: Option<String>,
}

/// Token endpoint URL for a realm
///
/// The nginx proxy exposes the internal Keycloak under `/keycloak/`.
pub fn token_url(base_url: &str, realm: &str) -> String {
    format!(
        "{}/keycloak/realms/{realm}/protocol/openid-connect/token",
        base_url.trim_end_matches('/')
    )
}

fn openid_configuration_url(base_url: &str, realm: &str) -> String {
    format!(
        "{}/keycloak/realms/{realm}/.well-known/openid-configuration",
        base_url.trim_end_matches('/')
    )
}

/// Obtain an access token via the password grant
///
/// # Errors
/// Non-2xx responses become `UnexpectedStatus` with the response body
/// excerpt (Keycloak's error JSON names the failing grant precisely).
pub async fn direct_grant_token(
    client: &reqwest::Client,
    base_url: &str,
    auth: &AuthConfig,
    username: &str,
    password: &str,
) -> Result<TokenResponse> {
    let url = token_url(base_url, &auth.realm);

    let mut form: Vec<(&str, &str)> = vec![
        ("grant_type", "password"),
        ("client_id", auth.client_id.as_str()),
        ("username", username),
        ("password", password),
    ];
    if let Some(secret) = auth.client_secret.as_deref() {
        form.push(("client_secret", secret));
    }

    let response = client.post(&url).form(&form).send().await?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(HarnessError::unexpected_status(status, url, &body));
    }

    let token: TokenResponse = response.json().await?;
    tracing::debug!(
        expires_in = ?token.expires_in,
        token_type = ?token.token_type,
        "direct grant token obtained"
    );
    Ok(token)
}

/// Require the realm's OpenID Connect discovery document to answer 200
///
/// A cheap availability probe that runs before any login attempt.
pub async fn openid_configuration_available(
    client: &reqwest::Client,
    base_url: &str,
    realm: &str,
) -> Result<()> {
    let url = openid_configuration_url(base_url, realm);
    let response = client.get(&url).send().await?;
    if response.status() != http::StatusCode::OK {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(HarnessError::unexpected_status(status, url, &body));
    }
    Ok(())
}
