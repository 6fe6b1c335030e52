//! Thin DICOMWeb client: QIDO-RS queries and WADO-RS retrieves
//!
//! - `client`: authenticated HTTP plumbing and status checking
//! - `qido`: JSON query endpoints and identifier selection
//! - `wado`: binary retrieve endpoints

mod client;
pub mod qido;
mod wado;

pub use client::DicomWebClient;
pub use qido::{DicomJson, IdentifierLevel};
pub use wado::{FrameOutcome, RetrievedPayload};
