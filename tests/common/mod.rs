//! Common test utilities: an in-process fake of the PACS/identity stack
//!
//! Stands in for nginx + OAuth2 Proxy + Keycloak + Orthanc: cookie-gated
//! DICOMWeb endpoints, a token endpoint, and a role-gated admin path. The
//! harness under test talks to it over real HTTP.

#![allow(dead_code)]

use axum::extract::{Form, Path, Query};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::collections::HashMap;

use pacsprobe::config::{
    AccountConfig, AccountsConfig, AuthConfig, AuthMode, RetrieveConfig, TargetConfig,
};
use pacsprobe::dicomweb::DicomWebClient;
use pacsprobe::session::Credential;

pub const STUDY_UID: &str = "1.2.840.113619.2.55.3.604688119.868.1578400000.1";
pub const SERIES_UID: &str = "1.2.840.113619.2.55.3.604688119.868.1578400000.2";
pub const INSTANCE_UID: &str = "1.2.840.113619.2.55.3.604688119.868.1578400000.3";
/// The one instance the fake serves frames for
pub const MULTI_FRAME_UID: &str = "1.2.840.113619.2.55.3.604688119.868.1578400000.9";

pub const VIEWER_SESSION: &str = "_oauth2_proxy=viewer-session-token";
pub const ADMIN_SESSION: &str = "_oauth2_proxy=admin-session-token";
pub const VIEWER_BEARER: &str = "fake-access-token-viewer";

pub const BOUNDARY: &str = "ProbeBoundary7fe0";

/// Fake deployment instance
pub struct TestPacs {
    pub addr: String,
}

impl TestPacs {
    /// Bind a random port, spawn the fake stack, and wait for it to accept
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            axum::serve(listener, router()).await.unwrap();
        });
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self { addr }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    pub fn target_config(&self) -> TargetConfig {
        TargetConfig {
            base_url: self.addr.clone(),
            dicomweb_path: "/pacs".to_string(),
            viewer_path: "/ohif-viewer".to_string(),
            admin_path: "/orthanc-admin".to_string(),
        }
    }

    pub fn retrieve_config(&self) -> RetrieveConfig {
        RetrieveConfig {
            query_timeout_seconds: 10,
            retrieve_timeout_seconds: 30,
            max_evidence_parts: 15,
        }
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            mode: AuthMode::DirectGrant,
            realm: "ohif".to_string(),
            client_id: "api-testing-client".to_string(),
            client_secret: None,
            session_cookie_fragment: "oauth2".to_string(),
            login_timeout_seconds: 15,
        }
    }

    pub fn accounts(&self) -> AccountsConfig {
        AccountsConfig {
            viewer: AccountConfig {
                username: "viewer".to_string(),
                password: "viewer".to_string(),
            },
            admin: AccountConfig {
                username: "admin".to_string(),
                password: "admin".to_string(),
            },
        }
    }

    /// DICOMWeb client holding a valid viewer session
    pub fn client(&self) -> DicomWebClient {
        DicomWebClient::new(
            &self.target_config(),
            &self.retrieve_config(),
            viewer_credential(),
        )
        .unwrap()
    }
}

pub fn viewer_credential() -> Credential {
    Credential::Cookies(VIEWER_SESSION.to_string())
}

pub fn admin_credential() -> Credential {
    Credential::Cookies(ADMIN_SESSION.to_string())
}

/// Minimal valid DICOM object with distinguishable payload bytes
pub fn synthetic_dicom(marker: u8) -> Vec<u8> {
    let mut bytes = vec![0u8; 128];
    bytes.extend_from_slice(b"DICM");
    bytes.extend_from_slice(&[0x02, 0x00, 0x00, 0x00, marker, 0xFF, 0xFE, 0xE0, 0x0D, 0x0A]);
    bytes
}

/// Assemble a multipart/related body from (content-type, payload) parts
pub fn multipart_body(boundary: &str, parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (part_type, payload) in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(format!("Content-Type: {part_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(payload);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/related; type=\"application/dicom\"; boundary={BOUNDARY}")
}

fn router() -> Router {
    Router::new()
        .route(
            "/keycloak/realms/:realm/.well-known/openid-configuration",
            get(openid_configuration),
        )
        .route(
            "/keycloak/realms/:realm/protocol/openid-connect/token",
            post(token),
        )
        .route("/pacs/studies", get(studies))
        .route("/pacs/studies/:study", get(retrieve_study))
        .route("/pacs/studies/:study/series", get(series))
        .route("/pacs/studies/:study/series/:series", get(retrieve_series))
        .route(
            "/pacs/studies/:study/series/:series/instances",
            get(instances),
        )
        .route(
            "/pacs/studies/:study/series/:series/instances/:instance",
            get(retrieve_instance),
        )
        .route(
            "/pacs/studies/:study/series/:series/instances/:instance/frames/:frame",
            get(retrieve_frame),
        )
        .route("/orthanc-admin", get(admin_ui))
}

// =============================================================================
// Identity stack
// =============================================================================

async fn openid_configuration(Path(realm): Path<String>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "issuer": format!("http://fake-keycloak/realms/{realm}"),
        "token_endpoint": format!("http://fake-keycloak/realms/{realm}/protocol/openid-connect/token"),
        "grant_types_supported": ["password", "authorization_code"],
    }))
}

async fn token(Form(form): Form<HashMap<String, String>>) -> Response {
    let username = form.get("username").map(String::as_str).unwrap_or("");
    let password = form.get("password").map(String::as_str).unwrap_or("");
    let grant_type = form.get("grant_type").map(String::as_str).unwrap_or("");

    if grant_type != "password" {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "unsupported_grant_type" })),
        )
            .into_response();
    }

    if (username, password) == ("viewer", "viewer") || (username, password) == ("admin", "admin") {
        return Json(serde_json::json!({
            "access_token": format!("fake-access-token-{username}"),
            "refresh_token": "fake-refresh-token",
            "expires_in": 300,
            "token_type": "Bearer",
        }))
        .into_response();
    }

    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Invalid user credentials",
        })),
    )
        .into_response()
}

// =============================================================================
// Session gate (OAuth2 Proxy stand-in)
// =============================================================================

#[derive(PartialEq, Eq, Clone, Copy)]
enum Role {
    Viewer,
    Admin,
}

fn session_role(headers: &HeaderMap) -> Option<Role> {
    let cookies = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if cookies.contains(ADMIN_SESSION) {
        return Some(Role::Admin);
    }
    if cookies.contains(VIEWER_SESSION) {
        return Some(Role::Viewer);
    }

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or("");
    if bearer == "fake-access-token-admin" {
        return Some(Role::Admin);
    }
    if bearer == VIEWER_BEARER {
        return Some(Role::Viewer);
    }
    None
}

fn require_session(headers: &HeaderMap) -> Result<Role, Response> {
    session_role(headers).ok_or_else(|| StatusCode::UNAUTHORIZED.into_response())
}

fn valid_uid(uid: &str) -> bool {
    !uid.is_empty() && uid.bytes().all(|b| b.is_ascii_digit() || b == b'.')
}

// =============================================================================
// QIDO-RS
// =============================================================================

async fn studies(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Response {
    if let Err(denied) = require_session(&headers) {
        return denied;
    }

    let all = vec![
        serde_json::json!({
            "0020000D": { "vr": "UI", "Value": [STUDY_UID] },
            "00080060": { "vr": "CS", "Value": ["MR"] },
        }),
        serde_json::json!({
            "0020000D": { "vr": "UI", "Value": ["1.2.840.99999.1"] },
        }),
    ];

    let limit = params
        .get("limit")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(all.len());
    Json(serde_json::Value::Array(all.into_iter().take(limit).collect())).into_response()
}

async fn series(headers: HeaderMap, Path(study): Path<String>) -> Response {
    if let Err(denied) = require_session(&headers) {
        return denied;
    }
    if !valid_uid(&study) {
        return StatusCode::BAD_REQUEST.into_response();
    }
    if study != STUDY_UID {
        // valid but unknown study: empty result, not an error
        return Json(serde_json::json!([])).into_response();
    }

    Json(serde_json::json!([
        {
            "0020000E": { "vr": "UI", "Value": [SERIES_UID] },
            "00080060": { "vr": "CS", "Value": ["MR"] },
        }
    ]))
    .into_response()
}

async fn instances(headers: HeaderMap, Path((study, series)): Path<(String, String)>) -> Response {
    if let Err(denied) = require_session(&headers) {
        return denied;
    }
    if !valid_uid(&study) || !valid_uid(&series) {
        return StatusCode::BAD_REQUEST.into_response();
    }
    if study != STUDY_UID || series != SERIES_UID {
        return Json(serde_json::json!([])).into_response();
    }

    Json(serde_json::json!([
        { "00080018": { "vr": "UI", "Value": [INSTANCE_UID] } },
        { "00080018": { "vr": "UI", "Value": [MULTI_FRAME_UID] } }
    ]))
    .into_response()
}

// =============================================================================
// WADO-RS
// =============================================================================

async fn retrieve_instance(
    headers: HeaderMap,
    Path((study, series, instance)): Path<(String, String, String)>,
) -> Response {
    if let Err(denied) = require_session(&headers) {
        return denied;
    }
    if study != STUDY_UID || series != SERIES_UID {
        return StatusCode::NOT_FOUND.into_response();
    }
    // the multi-frame instance models a deployment that answers with a
    // direct application/dicom body instead of a multipart envelope
    if instance == MULTI_FRAME_UID {
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/dicom".to_string())],
            synthetic_dicom(0x4D),
        )
            .into_response();
    }
    if instance != INSTANCE_UID {
        return StatusCode::NOT_FOUND.into_response();
    }

    let dicom = synthetic_dicom(0x2A);
    let body = multipart_body(BOUNDARY, &[("application/dicom", &dicom)]);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, multipart_content_type())],
        body,
    )
        .into_response()
}

async fn retrieve_study(headers: HeaderMap, Path(study): Path<String>) -> Response {
    if let Err(denied) = require_session(&headers) {
        return denied;
    }
    if study != STUDY_UID {
        return StatusCode::NOT_FOUND.into_response();
    }

    let objects: Vec<Vec<u8>> = (4..=5).map(synthetic_dicom).collect();
    let parts: Vec<(&str, &[u8])> = objects
        .iter()
        .map(|o| ("application/dicom", o.as_slice()))
        .collect();
    let body = multipart_body(BOUNDARY, &parts);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, multipart_content_type())],
        body,
    )
        .into_response()
}

async fn retrieve_series(
    headers: HeaderMap,
    Path((study, series)): Path<(String, String)>,
) -> Response {
    if let Err(denied) = require_session(&headers) {
        return denied;
    }
    if study != STUDY_UID || series != SERIES_UID {
        return StatusCode::NOT_FOUND.into_response();
    }

    let objects: Vec<Vec<u8>> = (1..=3).map(synthetic_dicom).collect();
    let mut parts: Vec<(&str, &[u8])> = objects
        .iter()
        .map(|o| ("application/dicom", o.as_slice()))
        .collect();
    // a non-DICOM sibling part the extractor must skip
    parts.push(("application/json", br#"{"meta":"ignored"}"#.as_slice()));

    let body = multipart_body(BOUNDARY, &parts);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, multipart_content_type())],
        body,
    )
        .into_response()
}

async fn retrieve_frame(
    headers: HeaderMap,
    Path((_study, _series, instance, frame)): Path<(String, String, String, u32)>,
) -> Response {
    if let Err(denied) = require_session(&headers) {
        return denied;
    }
    // only one instance in the fake is multi-frame
    if instance != MULTI_FRAME_UID || frame == 0 || frame > 4 {
        return StatusCode::NOT_FOUND.into_response();
    }

    let frame_bytes: Vec<u8> = (0..64).map(|i| (i as u8).wrapping_mul(frame as u8)).collect();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream".to_string())],
        frame_bytes,
    )
        .into_response()
}

// =============================================================================
// Admin UI (role-gated)
// =============================================================================

async fn admin_ui(headers: HeaderMap) -> Response {
    match session_role(&headers) {
        Some(Role::Admin) => (StatusCode::OK, "Orthanc Explorer").into_response(),
        Some(Role::Viewer) => StatusCode::FORBIDDEN.into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}
