//! Byte-exact extraction of DICOM objects from multipart/related bodies
//!
//! WADO-RS does not return a bare `.dcm` file; it wraps each object in a
//! MIME envelope:
//!
//! ```text
//! --boundary123
//! Content-Type: application/dicom
//!
//! <DICOM bytes>
//! --boundary123--
//! ```
//!
//! Everything here operates on `&[u8]` with exact subsequence search. The
//! payload is never routed through a text decode, which would corrupt
//! non-ASCII bytes; only the part sub-headers (which are ASCII) are ever
//! inspected as text.

use crate::error::{HarnessError, Result};

/// Byte offset of the DICM magic inside a valid DICOM file
pub const DICM_OFFSET: usize = 128;

const DICM_MAGIC: &[u8] = b"DICM";
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// First occurrence of `needle` in `haystack` at or after `from`
fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|i| i + from)
}

/// Parse the boundary token out of a content-type header value
///
/// Accepts both quoted and unquoted forms:
/// `multipart/related; type="application/dicom"; boundary=abc` and
/// `multipart/related; boundary="abc"`.
///
/// # Errors
/// `MalformedContentType` if no non-empty boundary parameter is present.
pub fn boundary(content_type: &str) -> Result<&str> {
    let malformed = || HarnessError::MalformedContentType(content_type.to_string());

    let (_, rest) = content_type.split_once("boundary=").ok_or_else(malformed)?;
    let token = rest
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .trim_matches('"');
    if token.is_empty() {
        return Err(malformed());
    }
    Ok(token)
}

/// Extract the first MIME part's payload from a multipart/related body
///
/// # Algorithm
/// 1. Locate the first `--{boundary}` delimiter.
/// 2. From just past it, locate the `\r\n\r\n` header/body separator.
/// 3. The payload runs from after the separator to 2 bytes before the next
///    delimiter (stripping the CRLF that precedes it), or to the end of the
///    buffer if there is no further delimiter.
///
/// The returned slice borrows from `body` unchanged: no charset transform,
/// no trimming beyond the boundary arithmetic above.
pub fn extract_dicom<'a>(body: &'a [u8], content_type: &str) -> Result<&'a [u8]> {
    let boundary = boundary(content_type)?;
    let delimiter = format!("--{boundary}").into_bytes();

    let first = find(body, &delimiter, 0).ok_or(HarnessError::BoundaryNotFound)?;
    let after_delimiter = first + delimiter.len();

    let header_end =
        find(body, HEADER_TERMINATOR, after_delimiter).ok_or(HarnessError::MalformedMimePart)?;
    let start = header_end + HEADER_TERMINATOR.len();

    let end = match find(body, &delimiter, start) {
        Some(next) => (next - 2).max(start),
        None => body.len(),
    };

    Ok(&body[start..end])
}

/// Extract every `application/dicom` part from a multipart/related body
///
/// Series- and study-level retrieves bundle many objects in one envelope.
/// Parts that do not declare `Content-Type: application/dicom` in their
/// sub-headers are skipped. At most `max_parts` parts are materialized;
/// enumeration stops once the cap is reached. The cap bounds memory and
/// evidence volume on large envelopes, it is not a correctness rule.
pub fn extract_dicom_parts<'a>(
    body: &'a [u8],
    content_type: &str,
    max_parts: usize,
) -> Result<Vec<&'a [u8]>> {
    let boundary = boundary(content_type)?;
    let delimiter = format!("--{boundary}").into_bytes();

    let mut parts = Vec::new();
    let mut cursor = find(body, &delimiter, 0).ok_or(HarnessError::BoundaryNotFound)?;

    while parts.len() < max_parts {
        let after_delimiter = cursor + delimiter.len();

        // `--{boundary}--` closes the envelope
        if body.get(after_delimiter..after_delimiter + 2) == Some(b"--".as_slice()) {
            break;
        }

        let header_end = find(body, HEADER_TERMINATOR, after_delimiter)
            .ok_or(HarnessError::MalformedMimePart)?;
        let start = header_end + HEADER_TERMINATOR.len();
        let next = find(body, &delimiter, start);
        let end = match next {
            Some(position) => (position - 2).max(start),
            None => body.len(),
        };

        if declares_dicom(&body[after_delimiter..header_end]) {
            parts.push(&body[start..end]);
        }

        match next {
            Some(position) => cursor = position,
            None => break,
        }
    }

    Ok(parts)
}

/// Case-insensitive scan of a part's sub-header region (ASCII-safe; the
/// payload itself is never inspected this way)
fn declares_dicom(headers: &[u8]) -> bool {
    String::from_utf8_lossy(headers)
        .to_ascii_lowercase()
        .contains("application/dicom")
}

/// Require the 4-byte ASCII `DICM` signature at offset 128
///
/// Failure means either a boundary-parsing bug or a non-DICOM part and is
/// reported distinctly from the framing errors.
pub fn verify_signature(bytes: &[u8]) -> Result<()> {
    let end = DICM_OFFSET + DICM_MAGIC.len();
    if bytes.len() < end || &bytes[DICM_OFFSET..end] != DICM_MAGIC {
        return Err(HarnessError::InvalidDicomSignature {
            offset_bytes: DICM_OFFSET,
        });
    }
    Ok(())
}
