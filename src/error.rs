//! Error types for the GitHub login flow
//!
//! [`ExchangeError`] is what a [`TokenExchanger`](crate::auth::TokenExchanger)
//! reports. [`AuthError`] is the visitor-facing taxonomy; every failure is
//! converted to one at the handler boundary and rendered by `IntoResponse`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Message shown when GitHub reports `bad_verification_code`
pub const EXPIRED_CODE_MESSAGE: &str =
    "This sign-in link has expired or was already used. Please sign in with GitHub again.";

const GENERIC_FAILURE_MESSAGE: &str = "Authentication failed";

/// Failure of the server-to-server code exchange
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Code already consumed or expired. Never retry with the same code.
    #[error("authorization code expired or already used")]
    BadVerificationCode,

    #[error("GitHub rejected the code exchange: {error}")]
    Provider {
        error: String,
        description: Option<String>,
    },

    #[error("token response did not contain an access token")]
    MissingToken,

    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed token response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Terminal failure of a callback request
#[derive(Debug, Error)]
pub enum AuthError {
    /// GitHub redirected back with `?error=...` (400)
    #[error("GitHub authorization failed: {error}")]
    UpstreamRejection {
        error: String,
        description: Option<String>,
    },

    /// `bad_verification_code` (400)
    #[error("authorization code expired or already used")]
    ExpiredOrReusedCode,

    /// Any other response without a token (500)
    #[error("token exchange failed")]
    ExchangeFailure(Option<String>),

    /// Network or decode failure talking to GitHub (500)
    #[error("token exchange transport failure")]
    TransportFailure,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::UpstreamRejection { .. } | AuthError::ExpiredOrReusedCode => {
                StatusCode::BAD_REQUEST
            }
            AuthError::ExchangeFailure(_) | AuthError::TransportFailure => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Body text shown to the visitor
    pub fn message(&self) -> String {
        match self {
            AuthError::UpstreamRejection {
                error,
                description: Some(description),
            } => format!("GitHub authorization failed: {} ({})", error, description),
            AuthError::UpstreamRejection { error, .. } => {
                format!("GitHub authorization failed: {}", error)
            }
            AuthError::ExpiredOrReusedCode => EXPIRED_CODE_MESSAGE.to_string(),
            AuthError::ExchangeFailure(Some(description)) => {
                format!("{}: {}", GENERIC_FAILURE_MESSAGE, description)
            }
            AuthError::ExchangeFailure(None) | AuthError::TransportFailure => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
        }
    }

    /// Metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::UpstreamRejection { .. } => "upstream_rejection",
            AuthError::ExpiredOrReusedCode => "expired_code",
            AuthError::ExchangeFailure(_) => "exchange_failure",
            AuthError::TransportFailure => "transport_failure",
        }
    }
}

impl From<ExchangeError> for AuthError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::BadVerificationCode => AuthError::ExpiredOrReusedCode,
            ExchangeError::Provider { description, .. } => AuthError::ExchangeFailure(description),
            ExchangeError::MissingToken => AuthError::ExchangeFailure(None),
            ExchangeError::Transport(_) | ExchangeError::Decode(_) => AuthError::TransportFailure,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status(), self.message()).into_response()
    }
}
