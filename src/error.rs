//! Errors returned by the OpenAI-compatible HTTP APIs.

use reqwest::{Response, StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication failed: {body}")]
    Unauthorized { body: String },

    #[error("Request failed with status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("API returned no {what}")]
    EmptyResponse { what: &'static str },
}

impl ApiError {
    /// Passes successful responses through and turns every other status into an `ApiError`.
    pub async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Self::from_status(status, body))
    }

    fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            ApiError::Unauthorized { body }
        } else {
            ApiError::Status { code: status.as_u16(), body }
        }
    }
}

/// True when any error in the chain is an authentication failure.
pub fn is_auth_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(cause.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized { .. }))
    })
}
