//! Auth client for the ShelfHub session endpoints.
//!
//! ShelfHub deployments are not uniform about the login response shape:
//! the token arrives as `authToken`, `token`, or `jwt`, and the profile
//! as `user`, `profile`, a bare `name`, or not at all. Extraction here
//! tolerates all of them so the session layer never has to.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::client::build_http_client;
use crate::config::ClientConfig;
use crate::error::{backend_message, AuthError};

/// Login form fields.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The signed-in user's profile.
///
/// Only the display name is interpreted; everything else the backend
/// sends rides along in `extra` and is persisted as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A successful login: the bearer token plus the resolved profile.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Raw wire shape of the login and refresh responses, before alias
/// resolution.
#[derive(Debug, Deserialize)]
struct RawLoginResponse {
    #[serde(default, alias = "authToken", alias = "jwt")]
    token: Option<String>,
    #[serde(default, alias = "profile")]
    user: Option<UserProfile>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl RawLoginResponse {
    /// The token under any of its accepted names, rejecting the empty
    /// string.
    fn token(self) -> Result<String, AuthError> {
        self.token.filter(|t| !t.is_empty()).ok_or(AuthError::NoToken)
    }

    /// Resolve the profile: explicit object, then bare `name`, then an
    /// email (from the response or the submitted credentials) standing
    /// in as the display name.
    fn resolve_user(&self, fallback_email: &str) -> UserProfile {
        if let Some(ref user) = self.user {
            return user.clone();
        }
        let name = self
            .name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| fallback_email.to_string());
        UserProfile {
            name,
            ..Default::default()
        }
    }
}

/// HTTP client for the ShelfHub auth API.
pub struct AuthClient {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl AuthClient {
    pub fn new(config: ClientConfig) -> Result<Self, AuthError> {
        let client = build_http_client(&config).map_err(AuthError::Other)?;
        Ok(AuthClient {
            client,
            base_url: config.base_url,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{path}")).map_err(AuthError::InvalidUrl)
    }

    /// Exchange credentials for a token and profile.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError> {
        debug!(email = %credentials.email, "logging in");
        let response = self
            .client
            .post(self.endpoint("auth/login")?)
            .json(credentials)
            .send()
            .await
            .map_err(AuthError::Request)?;

        let raw = parse_auth_response(response).await?;
        let user = raw.resolve_user(&credentials.email);
        let token = raw.token()?;
        Ok(LoginResponse { token, user })
    }

    /// Notify the backend that the session is over. The response body is
    /// ignored; only the status matters.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        debug!("logging out");
        let response = self
            .client
            .post(self.endpoint("auth/logout")?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(AuthError::Request)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let message = backend_message(response).await;
            Err(AuthError::Api { status, message })
        }
    }

    /// Trade the current token for a fresh one.
    pub async fn refresh(&self, token: &str) -> Result<String, AuthError> {
        debug!("refreshing token");
        let response = self
            .client
            .post(self.endpoint("auth/refresh_token")?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(AuthError::Request)?;

        parse_auth_response(response).await?.token()
    }
}

async fn parse_auth_response(response: reqwest::Response) -> Result<RawLoginResponse, AuthError> {
    let status = response.status();
    if status.is_success() {
        response.json().await.map_err(AuthError::Response)
    } else {
        let message = backend_message(response).await;
        Err(AuthError::Api { status, message })
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn raw(body: serde_json::Value) -> RawLoginResponse {
        serde_json::from_value(body).unwrap()
    }

    fn credentials() -> Credentials {
        Credentials {
            email: "a@example.com".to_string(),
            password: "pw".to_string(),
        }
    }

    #[test]
    fn token_accepts_all_aliases() {
        for key in ["token", "authToken", "jwt"] {
            let token = raw(json!({key: "t1"})).token().unwrap();
            assert_eq!(token, "t1");
        }
    }

    #[test]
    fn empty_or_missing_token_is_rejected() {
        assert!(matches!(raw(json!({})).token(), Err(AuthError::NoToken)));
        assert!(matches!(
            raw(json!({"token": ""})).token(),
            Err(AuthError::NoToken)
        ));
    }

    #[test]
    fn profile_fallback_chain() {
        let user = raw(json!({"token": "t", "user": {"name": "A", "role": "admin"}}))
            .resolve_user("a@example.com");
        assert_eq!(user.name, "A");
        assert_eq!(user.extra.get("role"), Some(&json!("admin")));

        let user = raw(json!({"token": "t", "profile": {"name": "B"}})).resolve_user("a@example.com");
        assert_eq!(user.name, "B");

        let user = raw(json!({"token": "t", "name": "C"})).resolve_user("a@example.com");
        assert_eq!(user.name, "C");

        let user = raw(json!({"token": "t"})).resolve_user("a@example.com");
        assert_eq!(user.name, "a@example.com");
    }

    #[tokio::test]
    async fn login_posts_credentials_and_resolves_response() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/login")
                .json_body(json!({"email": "a@example.com", "password": "pw"}));
            then.status(200)
                .json_body(json!({"authToken": "t1", "user": {"name": "A"}}));
        });

        let config = ClientConfig::new(Url::parse(&server.base_url()).unwrap());
        let client = AuthClient::new(config).unwrap();
        let login = client.login(&credentials()).await.unwrap();

        assert_eq!(login.token, "t1");
        assert_eq!(login.user.name, "A");
        mock.assert();
    }

    #[tokio::test]
    async fn login_failure_surfaces_backend_message() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/auth/login");
            then.status(401).json_body(json!({"message": "bad credentials"}));
        });

        let config = ClientConfig::new(Url::parse(&server.base_url()).unwrap());
        let client = AuthClient::new(config).unwrap();
        let err = client.login(&credentials()).await.unwrap_err();

        assert_eq!(err.user_message(), "bad credentials");
    }

    #[tokio::test]
    async fn refresh_returns_replacement_token() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/refresh_token")
                .header("authorization", "Bearer t1");
            then.status(200).json_body(json!({"token": "t2"}));
        });

        let config = ClientConfig::new(Url::parse(&server.base_url()).unwrap());
        let client = AuthClient::new(config).unwrap();
        let token = client.refresh("t1").await.unwrap();

        assert_eq!(token, "t2");
        mock.assert();
    }

    #[tokio::test]
    async fn logout_ignores_response_body() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/logout")
                .header("authorization", "Bearer t1");
            then.status(204);
        });

        let config = ClientConfig::new(Url::parse(&server.base_url()).unwrap());
        let client = AuthClient::new(config).unwrap();
        client.logout("t1").await.unwrap();
        mock.assert();
    }
}
