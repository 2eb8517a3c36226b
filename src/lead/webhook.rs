use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::info;

use super::LeadPayload;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webhook responded with status {0}")]
    Status(StatusCode),
}

/// Posts lead payloads to the lead-processing webhook. One attempt per lead;
/// failures are returned to the caller to log, never retried.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SubmitError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub async fn submit(&self, payload: &LeadPayload) -> Result<(), SubmitError> {
        let response = self.client.post(&self.url).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmitError::Status(status));
        }

        info!(
            url = %self.url,
            %status,
            months = payload.calculated_results.chosen_term_months,
            "lead forwarded"
        );
        Ok(())
    }
}
