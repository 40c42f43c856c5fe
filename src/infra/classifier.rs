use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ClassifierSettings;
use crate::domain::change::ChangeSet;
use crate::error::{AppError, AppResult};
use crate::services::IntentClassifier;

const UNREADABLE_BODY: &str = "Unknown error";

/// Posts diffs to the remote commit-intent endpoint.
pub struct HttpIntentClassifier {
    verified: Client,
}

impl HttpIntentClassifier {
    pub fn new() -> AppResult<Self> {
        Ok(Self {
            verified: build_client(false)?,
        })
    }

    fn client_for(&self, settings: &ClassifierSettings) -> AppResult<Client> {
        if settings.allow_insecure_tls && is_https(&settings.api_url) {
            warn!(
                url = %settings.api_url,
                "SSL certificate verification is disabled; only use this with self-signed development endpoints"
            );
            return build_client(true);
        }
        Ok(self.verified.clone())
    }

    async fn exchange(
        &self,
        client: &Client,
        changes: &ChangeSet,
        settings: &ClassifierSettings,
    ) -> AppResult<String> {
        let response = client
            .post(&settings.api_url)
            .header(CONTENT_TYPE, "application/json")
            .json(&ClassificationRequest {
                diff: changes.as_str(),
            })
            .send()
            .await
            .map_err(|err| transport_error(&err, &settings.api_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| UNREADABLE_BODY.to_string());
            return Err(AppError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|err| transport_error(&err, &settings.api_url))?;
        let payload: ClassificationResponse = serde_json::from_str(&body)
            .map_err(|err| AppError::MalformedResponse(err.to_string()))?;
        Ok(payload.intent)
    }
}

#[async_trait]
impl IntentClassifier for HttpIntentClassifier {
    async fn classify(
        &self,
        changes: &ChangeSet,
        settings: &ClassifierSettings,
    ) -> AppResult<String> {
        debug!(url = %settings.api_url, bytes = changes.len(), "sending diff to classifier");
        let client = self.client_for(settings)?;

        match tokio::time::timeout(settings.timeout, self.exchange(&client, changes, settings))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout {
                url: settings.api_url.clone(),
                seconds: format_seconds(settings.timeout),
            }),
        }
    }
}

#[derive(Serialize)]
struct ClassificationRequest<'a> {
    diff: &'a str,
}

#[derive(Deserialize)]
struct ClassificationResponse {
    intent: String,
}

fn build_client(accept_invalid_certs: bool) -> AppResult<Client> {
    Client::builder()
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .map_err(|err| AppError::Configuration(format!("failed to build HTTP client: {err}")))
}

fn is_https(url: &str) -> bool {
    url.trim_start().to_ascii_lowercase().starts_with("https://")
}

fn transport_error(err: &reqwest::Error, url: &str) -> AppError {
    let chain = error_chain(err);
    if is_certificate_failure(&chain) {
        return AppError::TlsVerificationFailed;
    }
    if err.is_connect() || is_unreachable(&chain) {
        return AppError::Unreachable {
            url: url.to_string(),
        };
    }
    AppError::Unknown(chain)
}

/// Flattens an error and all of its sources into one line.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

fn is_certificate_failure(chain: &str) -> bool {
    let lower = chain.to_ascii_lowercase();
    ["certificate", "unknownissuer", "unable_to_verify_leaf_signature"]
        .iter()
        .any(|needle| lower.contains(needle))
}

fn is_unreachable(chain: &str) -> bool {
    let lower = chain.to_ascii_lowercase();
    [
        "connection refused",
        "dns error",
        "failed to lookup address",
        "econnrefused",
        "enotfound",
    ]
    .iter()
    .any(|needle| lower.contains(needle))
}

/// Seconds without a trailing `.0` for whole values: 30000 ms is "30".
fn format_seconds(timeout: Duration) -> String {
    let millis = timeout.as_millis();
    if millis % 1000 == 0 {
        (millis / 1000).to_string()
    } else {
        format!("{}", timeout.as_secs_f64())
    }
}
