//! Downstream ingestion API client

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use super::ResultSink;
use crate::config::{ApiConfig, RunMode};
use crate::models::ListingRecord;
use crate::utils::error::SubmitError;
use crate::utils::truncate_text;

/// Path of the listing statistics ingestion endpoint
pub const INGEST_PATH: &str = "v1/makler_job_stats";

/// Characters of the response body kept in failure logs
const LOG_PREVIEW_CHARS: usize = 200;

/// Posts batches as a JSON array to the ingestion API
#[derive(Debug, Clone)]
pub struct ApiSink {
    client: Client,
    endpoint: Url,
}

impl ApiSink {
    /// Create a sink for `base_url`, authenticating with a `token` query
    /// parameter
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::InvalidUrl` for an unparsable base URL and
    /// `SubmitError::Http` if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        token: &str,
        timeout: std::time::Duration,
        relax_tls: bool,
    ) -> Result<Self, SubmitError> {
        let endpoint = Self::endpoint_url(base_url, token)?;

        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(relax_tls)
            .build()?;

        Ok(Self { client, endpoint })
    }

    /// Create a sink from the API section, relaxing TLS outside production
    pub fn from_config(config: &ApiConfig, mode: RunMode) -> Result<Self, SubmitError> {
        Self::new(
            &config.base_url,
            &config.token,
            config.timeout(),
            mode.relax_tls(),
        )
    }

    fn endpoint_url(base_url: &str, token: &str) -> Result<Url, SubmitError> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        let mut url = Url::parse(&base)
            .and_then(|b| b.join(INGEST_PATH))
            .map_err(|e| SubmitError::InvalidUrl(format!("{base_url}: {e}")))?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }

    /// Full endpoint URL, including the token
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Submit once, surfacing the failure
    ///
    /// # Errors
    ///
    /// Returns `SubmitError::Status` for a non-success status and
    /// `SubmitError::Http` for transport or decoding failures.
    pub async fn try_submit(&self, records: &[ListingRecord]) -> Result<Value, SubmitError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(records)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                body = %truncate_text(&body, LOG_PREVIEW_CHARS),
                "Ingestion API rejected the batch"
            );
            return Err(SubmitError::Status(status.as_u16()));
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl ResultSink for ApiSink {
    async fn submit(&self, records: &[ListingRecord]) -> Option<Value> {
        info!(count = records.len(), "Submitting batch to ingestion API");

        match self.try_submit(records).await {
            Ok(value) => {
                info!(
                    response = %truncate_text(&value.to_string(), LOG_PREVIEW_CHARS),
                    "Batch accepted"
                );
                Some(value)
            }
            Err(e) => {
                warn!(error = %e, "Batch submission failed");
                None
            }
        }
    }
}
