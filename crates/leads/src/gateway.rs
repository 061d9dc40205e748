use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use wayfare_core::config::LeadsConfig;
use wayfare_core::errors::ApplicationError;
use wayfare_core::submission::{LeadReceipt, LeadSubmission, LeadsGateway};

use crate::response::LeadsResponse;

const USER_AGENT: &str = concat!("wayfare-leads/", env!("CARGO_PKG_VERSION"));

/// Posts each submission as JSON to one configured leads endpoint.
#[derive(Clone, Debug)]
pub struct HttpLeadsGateway {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    timeout: Duration,
}

impl HttpLeadsGateway {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, ApplicationError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|error| {
                ApplicationError::Configuration(format!("could not build http client: {error}"))
            })?;

        Ok(Self { client, endpoint: endpoint.into(), api_key, timeout })
    }

    pub fn from_config(config: &LeadsConfig) -> Result<Self, ApplicationError> {
        Self::new(
            config.endpoint.trim(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_failure(&self, error: &reqwest::Error) -> ApplicationError {
        let message = if error.is_timeout() {
            format!("no answer from leads endpoint within {}s", self.timeout.as_secs_f32())
        } else if error.is_connect() {
            format!("could not connect to leads endpoint: {error}")
        } else {
            format!("leads request failed: {error}")
        };
        ApplicationError::SubmissionNetworkFailure(message)
    }
}

#[async_trait]
impl LeadsGateway for HttpLeadsGateway {
    async fn submit_lead(
        &self,
        submission: &LeadSubmission,
    ) -> Result<LeadReceipt, ApplicationError> {
        let mut request = self.client.post(&self.endpoint).json(submission);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| self.transport_failure(&error))?;
        let status = response.status();
        let body = response.text().await.map_err(|error| self.transport_failure(&error))?;
        let parsed = LeadsResponse::parse(&body);

        debug!(
            event_name = "leads.http.response",
            correlation_id = %submission.metadata.session_id,
            status = status.as_u16(),
            parsed = parsed.is_some(),
            "leads endpoint answered"
        );

        let declined = parsed.as_ref().map(LeadsResponse::declined).unwrap_or(false);
        if !status.is_success() || declined {
            return Err(ApplicationError::SubmissionRejected {
                status: Some(status.as_u16()),
                reason: parsed.and_then(|body| body.reason()),
            });
        }

        Ok(LeadReceipt { lead_id: parsed.and_then(|body| body.lead_id()) })
    }
}
