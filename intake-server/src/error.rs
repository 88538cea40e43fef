use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use intake_core::{ErrorBody, FormField, UnknownGrade};
use thiserror::Error;
use tracing::{error, warn};

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request body is not a valid application: {0}")]
    MalformedPayload(String),

    #[error("missing required field: {0}")]
    MissingField(FormField),

    #[error(transparent)]
    UnknownGrade(#[from] UnknownGrade),

    /// The requested day is not a valid date.
    #[error("no applications stored for {0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::MalformedPayload(_)
            | ServiceError::MissingField(_)
            | ServiceError::UnknownGrade(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) | ServiceError::Storage(StoreError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Paths and I/O details stay in the log.
            ServiceError::Storage(StoreError::Io { .. } | StoreError::Encode { .. }) => {
                error!("Storage failure: {}", self);
                "failed to access application storage".to_string()
            }
            ServiceError::Storage(StoreError::Decode { day, .. }) => {
                error!("Storage failure: {}", self);
                format!("stored applications for {} are unreadable", day)
            }
            _ => {
                warn!("Request failed with {}: {}", status, self);
                self.to_string()
            }
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}
