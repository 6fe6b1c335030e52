//! pacsprobe - verification harness for a DICOMWeb PACS behind an identity
//! proxy
//!
//! The system under test is an OHIF-style viewer and Orthanc-style
//! DICOMWeb service fronted by nginx, OAuth2 Proxy, and Keycloak. This
//! crate owns no product logic; it verifies the deployment from the
//! outside.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Session Acquisition (interactive)               │
//! │  headless Keycloak login → OAuth2 Proxy cookies,            │
//! │  or OIDC direct grant → bearer token                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ Credential
//! ┌─────────────────────────────────────────────────────────────┐
//! │              DICOMWeb Client (stateless HTTP)                │
//! │  QIDO-RS queries → identifier chain                         │
//! │  WADO-RS retrieves → multipart envelopes                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ raw bytes
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Multipart Extraction + Validation               │
//! │  byte-exact part extraction → DICM signature check          │
//! │  → evidence sink                                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `session`: credential acquisition (browser login, direct grant)
//! - `dicomweb`: thin QIDO-RS/WADO-RS client
//! - `multipart`: byte-exact multipart/related extraction
//! - `flow`: the linear retrieve orchestration
//! - `evidence`: injectable artifact sink
//! - `config`: configuration management
//! - `error`: error types

pub mod config;
pub mod dicomweb;
pub mod error;
pub mod evidence;
pub mod flow;
pub mod multipart;
pub mod session;

pub use config::HarnessConfig;
pub use dicomweb::DicomWebClient;
pub use error::{HarnessError, Result};
pub use session::Credential;
