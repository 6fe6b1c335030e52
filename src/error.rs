//! Error types for the harness.
//!
//! Every failure class the scenarios can hit has its own variant, so a
//! failed scenario reports exactly which step broke: login, identifier
//! discovery, multipart framing, or signature validation.

use thiserror::Error;

/// Longest response-body excerpt carried in an error.
const BODY_EXCERPT_LIMIT: usize = 256;

/// Harness-wide error type
///
/// All errors terminate the current scenario immediately; there is no
/// in-harness retry. Expected alternate outcomes (frame 404, empty query
/// result) are modeled as values, never as variants here.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Login never reached the authenticated state, or no session-proxy
    /// cookie was present afterwards
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Expected DICOM identifier absent from a query response
    #[error("no {level} identifier in query result at index {index}")]
    MissingIdentifier { level: &'static str, index: usize },

    /// Content-type header lacks a usable boundary parameter
    #[error("malformed content-type (no boundary parameter): {0}")]
    MalformedContentType(String),

    /// Boundary delimiter never occurs in the response body
    #[error("multipart boundary delimiter not found in response body")]
    BoundaryNotFound,

    /// MIME part sub-headers are not terminated by a blank line
    #[error("MIME part headers not terminated by CRLF CRLF")]
    MalformedMimePart,

    /// Extracted bytes fail the DICM signature check
    #[error("missing DICM signature at byte offset {offset_bytes}")]
    InvalidDicomSignature { offset_bytes: usize },

    /// HTTP status outside the scenario's accepted set
    #[error("unexpected status {status} from {url}: {body_excerpt}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        body_excerpt: String,
    },

    /// Headless browser runtime failure (launch, navigate, element lookup)
    #[error("browser automation error: {0}")]
    Browser(String),

    /// HTTP transport error
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Evidence artifact could not be written
    #[error("evidence write failed: {0}")]
    Evidence(#[from] std::io::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for HarnessError {
    fn from(err: config::ConfigError) -> Self {
        HarnessError::Config(err.to_string())
    }
}

impl HarnessError {
    /// Build an `UnexpectedStatus` with a bounded body excerpt.
    ///
    /// The excerpt is truncated on a char boundary so diagnostics stay
    /// readable without dragging a whole multipart body into the error.
    pub fn unexpected_status(status: u16, url: impl Into<String>, body: &str) -> Self {
        let mut end = body.len().min(BODY_EXCERPT_LIMIT);
        while end > 0 && !body.is_char_boundary(end) {
            end -= 1;
        }
        HarnessError::UnexpectedStatus {
            status,
            url: url.into(),
            body_excerpt: body[..end].to_string(),
        }
    }
}

/// Result type alias using HarnessError
pub type Result<T> = std::result::Result<T, HarnessError>;
