use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info};

use crate::record::{ApplicationRecord, DayKey, ErrorBody, SubmissionInput, SubmitResponse};

/// Path of the applications collection on the intake server.
pub const APPLICATIONS_PATH: &str = "/api/applications";

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never produced a response, or the response body was unreadable.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The requested day has no applications.
    #[error("no applications found for {0}")]
    NotFound(DayKey),
}

/// The outbound call the client form makes when it is submitted.
#[async_trait]
pub trait ApplicationGateway: Send + Sync {
    async fn submit(&self, input: &SubmissionInput) -> Result<SubmitResponse, GatewayError>;
}

/// HTTP client for the intake server.
#[derive(Clone)]
pub struct IntakeClient {
    client: reqwest::Client,
    base_url: String,
}

impl IntakeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Every application across all days, newest first.
    pub async fn list_all(&self) -> Result<Vec<ApplicationRecord>, GatewayError> {
        let response = self
            .client
            .get(self.url(APPLICATIONS_PATH))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        Ok(response.json().await?)
    }

    /// Applications submitted on `day`, in submission order.
    pub async fn list_day(&self, day: &DayKey) -> Result<Vec<ApplicationRecord>, GatewayError> {
        let response = self
            .client
            .get(self.url(&format!("{}/{}", APPLICATIONS_PATH, day)))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(*day));
        }
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ApplicationGateway for IntakeClient {
    async fn submit(&self, input: &SubmissionInput) -> Result<SubmitResponse, GatewayError> {
        let url = self.url(APPLICATIONS_PATH);
        info!("Submitting application to {}", url);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(input)
            .send()
            .await?;

        debug!("Server responded with status {}", response.status());

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        Ok(response.json().await?)
    }
}

/// Turn an error response into a `Rejected`, preferring the server's `error` text.
async fn rejection(response: reqwest::Response) -> GatewayError {
    let status = response.status().as_u16();
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => return GatewayError::Transport(e),
    };
    GatewayError::Rejected {
        status,
        message: rejection_message(status, &text),
    }
}

fn rejection_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => format!("request failed with status {}", status),
    }
}
