//! Session acquisition
//!
//! Two-phase protocol: Phase 1 (interactive, browser-bound) mints an opaque
//! [`Credential`]; Phase 2 (stateless HTTP) only ever consumes it. The
//! browser side lives behind the narrow [`browser::LoginDriver`] interface
//! so Phase 2 can be exercised with a stubbed credential.

pub mod browser;
pub mod keycloak;

use chrono::{DateTime, Duration, Utc};

use crate::error::{HarnessError, Result};

/// An opaque session credential for the protected deployment
///
/// Either the full cookie set collected from a browser context after an
/// interactive login (serialized as one `Cookie` header value), or a bearer
/// token from a direct grant. Valid only if minted by a login flow that
/// reached the authenticated landing state.
#[derive(Debug, Clone)]
pub enum Credential {
    /// `name=value; name2=value2; ...` — forwarded as the `Cookie` header
    Cookies(String),
    /// OIDC access token with optional expiry
    Bearer {
        token: String,
        expires_at: Option<DateTime<Utc>>,
    },
}

impl Credential {
    /// Build a cookie credential from browser cookies
    ///
    /// # Errors
    /// `Authentication` if no cookie name contains `session_fragment`: an
    /// empty or proxy-cookie-less jar is a fatal acquisition failure, not a
    /// degraded credential.
    pub fn from_cookie_pairs(
        pairs: &[(String, String)],
        session_fragment: &str,
    ) -> Result<Self> {
        if !pairs.iter().any(|(name, _)| name.contains(session_fragment)) {
            return Err(HarnessError::Authentication(format!(
                "no session-proxy cookie (name containing {session_fragment:?}) present after login"
            )));
        }

        let header = pairs
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        Ok(Credential::Cookies(header))
    }

    /// Build a bearer credential from a direct-grant token response
    pub fn from_token(token: keycloak::TokenResponse) -> Self {
        let expires_at = token
            .expires_in
            .map(|seconds| Utc::now() + Duration::seconds(seconds as i64));
        Credential::Bearer {
            token: token.access_token,
            expires_at,
        }
    }

    /// Check if a bearer credential is past its expiry (cookie credentials
    /// carry no expiry the harness can see)
    pub fn is_expired(&self) -> bool {
        match self {
            Credential::Cookies(_) => false,
            Credential::Bearer { expires_at, .. } => {
                expires_at.is_some_and(|at| at < Utc::now())
            }
        }
    }

    /// Attach the credential to an outgoing request
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Credential::Cookies(header) => request.header(http::header::COOKIE, header),
            Credential::Bearer { token, .. } => request.bearer_auth(token),
        }
    }
}

/// Probe the administrative UI path with a credential and report the status
///
/// The caller decides which statuses are acceptable: 200 for an authorized
/// role; 401, 403, or a redirect for an unauthorized one. Build `client`
/// with redirects disabled so a login redirect is observable.
pub async fn admin_access_status(
    client: &reqwest::Client,
    credential: &Credential,
    admin_url: &str,
) -> Result<http::StatusCode> {
    let response = credential.apply(client.get(admin_url)).send().await?;
    Ok(response.status())
}
