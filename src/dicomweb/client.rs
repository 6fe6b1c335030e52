//! Authenticated HTTP plumbing for the DICOMWeb endpoints

use std::time::Duration;

use crate::config::{RetrieveConfig, TargetConfig};
use crate::error::{HarnessError, Result};
use crate::session::Credential;

/// Client for the QIDO-RS / WADO-RS endpoints behind the session proxy
///
/// Created once per scenario with an already-acquired credential; holds no
/// other state. Query calls use the short query timeout; retrieve calls
/// override it with the longer retrieve timeout per request.
pub struct DicomWebClient {
    http: reqwest::Client,
    base_url: String,
    credential: Credential,
    retrieve_timeout: Duration,
}

impl DicomWebClient {
    /// Build a client for the configured deployment
    ///
    /// # Errors
    /// Returns error if the underlying HTTP client cannot be constructed.
    pub fn new(
        target: &TargetConfig,
        retrieve: &RetrieveConfig,
        credential: Credential,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pacsprobe/", env!("CARGO_PKG_VERSION")))
            .timeout(retrieve.query_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: target.dicomweb_url(),
            credential,
            retrieve_timeout: retrieve.retrieve_timeout(),
        })
    }

    /// Absolute URL for a path under the DICOMWeb root
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Authenticated GET returning parsed JSON; only 200 is accepted
    pub(crate) async fn get_json(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<serde_json::Value> {
        let url = self.url(path);
        let mut request = self.http.get(&url);
        if !params.is_empty() {
            request = request.query(params);
        }
        let response = self.credential.apply(request).send().await?;
        let response = expect_status(response, &[http::StatusCode::OK]).await?;
        Ok(response.json().await?)
    }

    /// Authenticated GET returning the raw body with its content type,
    /// using the retrieve timeout; `accepted` lists the passing statuses
    pub(crate) async fn get_bytes(
        &self,
        path: &str,
        accepted: &[http::StatusCode],
    ) -> Result<(http::StatusCode, String, Vec<u8>)> {
        let url = self.url(path);
        let request = self.http.get(&url).timeout(self.retrieve_timeout);
        let response = self.credential.apply(request).send().await?;
        let response = expect_status(response, accepted).await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        // bytes, never text: the body may be a binary multipart envelope
        let body = response.bytes().await?.to_vec();
        Ok((status, content_type, body))
    }
}

/// Check the response status against the scenario's accepted set
///
/// On mismatch, captures status, URL, and a bounded body excerpt into
/// `UnexpectedStatus` so a failed scenario is reproducible from the report.
pub(crate) async fn expect_status(
    response: reqwest::Response,
    accepted: &[http::StatusCode],
) -> Result<reqwest::Response> {
    if accepted.contains(&response.status()) {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(HarnessError::unexpected_status(status, url, &body))
}
