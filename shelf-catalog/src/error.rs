//! Error handling for catalog and auth API operations.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Fallback shown to users when an error carries no usable text.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Common error type for catalog API operations.
#[derive(Debug, Error)]
pub enum CatalogClientError {
    #[error("invalid request url")]
    InvalidUrl(#[source] url::ParseError),
    #[error("request failed")]
    Request(#[source] reqwest::Error),
    #[error("failed to parse response")]
    Response(#[source] reqwest::Error),
    #[error("{}", fmt_api_error(.status, .message.as_deref()))]
    Api {
        status: StatusCode,
        /// Backend-supplied message, when the error body was parseable.
        message: Option<String>,
    },
    #[error("{0}")]
    Other(String),
}

impl CatalogClientError {
    /// A message suitable for direct display to a user.
    ///
    /// Prefers the backend-supplied message, then the error's own text,
    /// then a fixed fallback.
    pub fn user_message(&self) -> String {
        match self {
            CatalogClientError::Api {
                message: Some(message),
                ..
            } => message.clone(),
            other => {
                let text = other.to_string();
                if text.is_empty() {
                    GENERIC_ERROR_MESSAGE.to_string()
                } else {
                    text
                }
            },
        }
    }
}

/// Errors from the session endpoints (login, logout, refresh).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid request url")]
    InvalidUrl(#[source] url::ParseError),
    #[error("request failed")]
    Request(#[source] reqwest::Error),
    #[error("failed to parse response")]
    Response(#[source] reqwest::Error),
    #[error("{}", fmt_api_error(.status, .message.as_deref()))]
    Api {
        status: StatusCode,
        message: Option<String>,
    },
    /// The backend answered 2xx but no token could be found in the body.
    #[error("response contained no token")]
    NoToken,
    #[error("{0}")]
    Other(String),
}

impl AuthError {
    /// Same display preference chain as [`CatalogClientError::user_message`].
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Api {
                message: Some(message),
                ..
            } => message.clone(),
            other => {
                let text = other.to_string();
                if text.is_empty() {
                    GENERIC_ERROR_MESSAGE.to_string()
                } else {
                    text
                }
            },
        }
    }
}

fn fmt_api_error(status: &StatusCode, message: Option<&str>) -> String {
    match message {
        Some(message) => format!("{status}: {message}"),
        None => format!("{status}"),
    }
}

/// Shape of ShelfHub error bodies. Anything else is ignored.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Read the backend message out of a non-2xx response, if there is one.
///
/// Consumes the response body; parse failures simply yield `None` since
/// error bodies may be HTML or empty.
pub(crate) async fn backend_message(response: reqwest::Response) -> Option<String> {
    let body = response.json::<ErrorBody>().await.ok()?;
    body.message.filter(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_prefers_backend_text() {
        let err = CatalogClientError::Api {
            status: StatusCode::FORBIDDEN,
            message: Some("token expired".to_string()),
        };
        assert_eq!(err.user_message(), "token expired");
    }

    #[test]
    fn user_message_falls_back_to_display() {
        let err = CatalogClientError::Api {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: None,
        };
        assert_eq!(err.user_message(), "500 Internal Server Error");
    }
}
