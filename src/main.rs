//! pacsprobe binary entry point
//!
//! Runs the canonical retrieve scenario against the configured deployment:
//! acquire a credential, walk the identifier chain, retrieve an instance,
//! extract and signature-check it, persist evidence.

use pacsprobe::config::{AuthMode, HarnessConfig};
use pacsprobe::dicomweb::DicomWebClient;
use pacsprobe::evidence::{DirectorySink, EvidenceSink, NullSink};
use pacsprobe::flow::RetrieveFlow;
use pacsprobe::session::{Credential, browser, keycloak};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// # Setup
/// 1. Initialize tracing/logging
/// 2. Load configuration
/// 3. Acquire a credential (browser login or direct grant)
/// 4. Run the retrieve flow
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("PACSPROBE__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "pacsprobe=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "pacsprobe=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting pacsprobe...");

    // 2. Load configuration
    let config = HarnessConfig::load()?;
    tracing::info!(
        base_url = %config.target.base_url,
        mode = ?config.auth.mode,
        "Configuration loaded"
    );

    // 3. Check the identity provider is alive, then acquire a credential
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;
    keycloak::openid_configuration_available(&http, &config.target.base_url, &config.auth.realm)
        .await?;

    let credential = match config.auth.mode {
        AuthMode::Browser => {
            browser::acquire_with_headless_chrome(&config, &config.accounts.viewer).await?
        }
        AuthMode::DirectGrant => {
            let token = keycloak::direct_grant_token(
                &http,
                &config.target.base_url,
                &config.auth,
                &config.accounts.viewer.username,
                &config.accounts.viewer.password,
            )
            .await?;
            Credential::from_token(token)
        }
    };
    tracing::info!("Credential acquired");

    // 4. Run the retrieve flow
    let client = DicomWebClient::new(&config.target, &config.retrieve, credential)?;
    let sink: Box<dyn EvidenceSink> = if config.evidence.enabled {
        Box::new(DirectorySink::new(&config.evidence.dir))
    } else {
        Box::new(NullSink)
    };

    let report = RetrieveFlow::new(&client, sink.as_ref()).run().await?;
    tracing::info!(
        study = %report.study_uid,
        series = %report.series_uid,
        instance = %report.instance_uid,
        dicom_bytes = report.dicom_len,
        evidence = ?report.evidence_path,
        "Retrieve flow completed"
    );

    Ok(())
}
