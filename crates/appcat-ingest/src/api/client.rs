//! HTTP client for the catalog service

use super::{endpoints, Resolver, Submitter};
use crate::config::IngestConfig;
use crate::model::{CandidateIdentifier, LookupResult, SubmissionRecord, SubmitOutcome};
use appcat_common::{CatalogError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

/// Identifies this tool to the catalog service
const USER_AGENT: &str = concat!("appcat-ingest/", env!("CARGO_PKG_VERSION"));

/// Catalog API client
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
    resource: String,
}

impl CatalogClient {
    pub fn new(config: &IngestConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CatalogError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            resource: config.lookup_resource.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

#[async_trait]
impl Resolver for CatalogClient {
    async fn resolve(&self, identifier: &CandidateIdentifier) -> LookupResult {
        let url = endpoints::lookup_url(&self.base_url, &self.resource, identifier.as_str());

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return LookupResult::TransientError(describe(&e)),
        };

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return LookupResult::TransientError(format!("lookup returned HTTP {status}"));
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                return LookupResult::TransientError(format!(
                    "malformed lookup response (HTTP {status}): {e}"
                ))
            },
        };

        match body.get("success").and_then(Value::as_bool) {
            Some(true) => {
                debug!(%identifier, "Lookup hit");
                LookupResult::Found(body)
            },
            Some(false) => LookupResult::NotFound,
            None => LookupResult::TransientError(format!(
                "lookup response (HTTP {status}) has no boolean 'success' field"
            )),
        }
    }
}

#[async_trait]
impl Submitter for CatalogClient {
    async fn submit(&self, record: &SubmissionRecord) -> SubmitOutcome {
        let url = endpoints::submit_url(&self.base_url);

        match self.client.post(&url).json(record).send().await {
            Ok(response) if response.status().is_success() => SubmitOutcome::Ok,
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!(identifier = %record.pkg_name, %status, body = %body, "Submission rejected");
                SubmitOutcome::Failed(format!("HTTP {status}"))
            },
            Err(e) => {
                let cause = describe(&e);
                warn!(identifier = %record.pkg_name, error = %cause, "Submission failed");
                SubmitOutcome::Failed(cause)
            },
        }
    }
}
