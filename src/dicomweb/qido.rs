//! QIDO-RS queries and identifier selection
//!
//! Query responses are arrays of attribute objects keyed by 8-hex-digit
//! DICOM tag, each tag mapping to `{ "Value": [...] }`. Identifiers are
//! looked up, never constructed: a SeriesUID is only meaningful under its
//! StudyUID, an InstanceUID only under its Series.

use serde_json::Value;

use super::DicomWebClient;
use crate::error::{HarnessError, Result};

/// One QIDO result row: DICOM attributes keyed by tag
pub type DicomJson = serde_json::Map<String, Value>;

/// The three levels of the identifier chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierLevel {
    Study,
    Series,
    Instance,
}

impl IdentifierLevel {
    /// Coded attribute tag
    pub const fn tag(self) -> &'static str {
        match self {
            IdentifierLevel::Study => "0020000D",
            IdentifierLevel::Series => "0020000E",
            IdentifierLevel::Instance => "00080018",
        }
    }

    /// Un-coded keyword field, the fallback when the tag is absent
    pub const fn keyword(self) -> &'static str {
        match self {
            IdentifierLevel::Study => "StudyInstanceUID",
            IdentifierLevel::Series => "SeriesInstanceUID",
            IdentifierLevel::Instance => "SOPInstanceUID",
        }
    }

    const fn name(self) -> &'static str {
        match self {
            IdentifierLevel::Study => "study",
            IdentifierLevel::Series => "series",
            IdentifierLevel::Instance => "instance",
        }
    }
}

impl DicomWebClient {
    /// `GET /studies` — all studies, optionally filtered
    ///
    /// `params` are QIDO filter pairs (`limit`, attribute matches); an
    /// empty result array is a valid outcome, not an error.
    pub async fn studies(&self, params: &[(String, String)]) -> Result<Vec<DicomJson>> {
        as_results(self.get_json("/studies", params).await?)
    }

    /// `GET /studies/{study}/series`
    pub async fn series(
        &self,
        study_uid: &str,
        params: &[(String, String)],
    ) -> Result<Vec<DicomJson>> {
        as_results(
            self.get_json(&format!("/studies/{study_uid}/series"), params)
                .await?,
        )
    }

    /// `GET /studies/{study}/series/{series}/instances`
    pub async fn instances(
        &self,
        study_uid: &str,
        series_uid: &str,
        params: &[(String, String)],
    ) -> Result<Vec<DicomJson>> {
        as_results(
            self.get_json(
                &format!("/studies/{study_uid}/series/{series_uid}/instances"),
                params,
            )
            .await?,
        )
    }
}

fn as_results(value: Value) -> Result<Vec<DicomJson>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                other => Err(HarnessError::Internal(anyhow::anyhow!(
                    "QIDO result row is not an object: {other}"
                ))),
            })
            .collect(),
        // Orthanc answers an empty query with an empty body on some routes
        Value::Null => Ok(Vec::new()),
        other => Err(HarnessError::Internal(anyhow::anyhow!(
            "QIDO response is not a JSON array: {other}"
        ))),
    }
}

/// Select a UID out of a query result
///
/// Reads `{tag}.Value[0]` and falls back to the un-coded keyword field.
/// A missing or empty identifier after both lookups is a hard
/// `MissingIdentifier` failure, not a skip.
pub fn uid(results: &[DicomJson], index: usize, level: IdentifierLevel) -> Result<String> {
    let missing = || HarnessError::MissingIdentifier {
        level: level.name(),
        index,
    };

    let row = results.get(index).ok_or_else(missing)?;
    row.get(level.tag())
        .and_then(first_value)
        .or_else(|| row.get(level.keyword()).and_then(first_value))
        .filter(|uid| !uid.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(missing)
}

/// First string out of `{ "Value": [...] }`, or a bare string field
fn first_value(attribute: &Value) -> Option<&str> {
    match attribute {
        Value::String(value) => Some(value),
        Value::Object(map) => map.get("Value")?.as_array()?.first()?.as_str(),
        _ => None,
    }
}
