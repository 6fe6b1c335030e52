//! WADO-RS binary retrieves
//!
//! Retrieve bodies are `multipart/related` envelopes (or, on some
//! deployments, a direct `application/dicom` body). They are carried as raw
//! bytes end to end; extraction is the `multipart` module's job.

use super::DicomWebClient;
use crate::error::{HarnessError, Result};

/// A retrieved binary payload, byte-exact
#[derive(Debug, Clone)]
pub struct RetrievedPayload {
    /// The response's content-type header value (carries the boundary)
    pub content_type: String,
    /// The complete raw body, never passed through a text decode
    pub body: Vec<u8>,
}

impl RetrievedPayload {
    /// Whether the body is a multipart envelope (vs a direct DICOM body)
    pub fn is_multipart(&self) -> bool {
        self.content_type.contains("multipart/related")
    }
}

/// Outcome of a frame retrieve
///
/// Not all instances are multi-frame; a 404 is a valid outcome there, not
/// an error, and must be matched explicitly.
#[derive(Debug, Clone)]
pub enum FrameOutcome {
    Frame(RetrievedPayload),
    NotMultiFrame,
}

/// Content types a frame retrieve may legitimately answer with
const FRAME_CONTENT_TYPES: [&str; 5] = [
    "multipart/related",
    "image/jpeg",
    "image/jp2",
    "application/octet-stream",
    "application/dicom",
];

impl DicomWebClient {
    /// `GET /studies/{study}/series/{series}/instances/{instance}`
    pub async fn retrieve_instance(
        &self,
        study_uid: &str,
        series_uid: &str,
        instance_uid: &str,
    ) -> Result<RetrievedPayload> {
        self.retrieve(&format!(
            "/studies/{study_uid}/series/{series_uid}/instances/{instance_uid}"
        ))
        .await
    }

    /// `GET /studies/{study}/series/{series}` — every instance of a series
    /// in one envelope
    pub async fn retrieve_series(
        &self,
        study_uid: &str,
        series_uid: &str,
    ) -> Result<RetrievedPayload> {
        self.retrieve(&format!("/studies/{study_uid}/series/{series_uid}"))
            .await
    }

    /// `GET /studies/{study}` — every instance of a study in one envelope
    pub async fn retrieve_study(&self, study_uid: &str) -> Result<RetrievedPayload> {
        self.retrieve(&format!("/studies/{study_uid}")).await
    }

    async fn retrieve(&self, path: &str) -> Result<RetrievedPayload> {
        let (_, content_type, body) = self.get_bytes(path, &[http::StatusCode::OK]).await?;
        Ok(RetrievedPayload { content_type, body })
    }

    /// `GET .../frames/{n}` — 200 with a frame payload, or 404 when the
    /// instance is not multi-frame (both valid)
    pub async fn retrieve_frame(
        &self,
        study_uid: &str,
        series_uid: &str,
        instance_uid: &str,
        frame: u32,
    ) -> Result<FrameOutcome> {
        let path = format!(
            "/studies/{study_uid}/series/{series_uid}/instances/{instance_uid}/frames/{frame}"
        );
        let (status, content_type, body) = self
            .get_bytes(&path, &[http::StatusCode::OK, http::StatusCode::NOT_FOUND])
            .await?;

        if status == http::StatusCode::NOT_FOUND {
            return Ok(FrameOutcome::NotMultiFrame);
        }

        if !FRAME_CONTENT_TYPES
            .iter()
            .any(|known| content_type.contains(known))
        {
            return Err(HarnessError::MalformedContentType(content_type));
        }

        Ok(FrameOutcome::Frame(RetrievedPayload { content_type, body }))
    }
}
