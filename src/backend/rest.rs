//! REST adapter for a hosted auth + row-store service (`/auth/v1/*` for
//! credentials, `/rest/v1/users` for profile rows). The access token returned
//! by sign-in is kept in memory only and attached as a bearer token; without
//! one, requests carry the public API key.
//!
//! No local timeout is applied; requests inherit the HTTP client defaults.

use super::{AuthService, Principal, ProgressUpdate, ServiceError, SignUpProfile, User, UserStore};
use crate::APP_USER_AGENT;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use url::Url;

/// Maximum number of error body characters surfaced to the user.
const MAX_ERROR_CHARS: usize = 200;
const USERS_TABLE: &str = "/rest/v1/users";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: SecretString,
    access_token: RwLock<Option<SecretString>>,
}

impl std::fmt::Debug for RestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBackend")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("access_token", &"***")
            .finish_non_exhaustive()
    }
}

impl RestBackend {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &Url, api_key: SecretString) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .map_err(|err| ServiceError::Network(format!("Failed to build client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.as_str().to_string(),
            api_key,
            access_token: RwLock::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        Url::parse(&build_url_with_base(&self.base_url, path))
            .map_err(|err| ServiceError::Parse(format!("Invalid endpoint URL: {err}")))
    }

    fn users_endpoint(&self, user_id: &str) -> Result<Url, ServiceError> {
        let mut url = self.endpoint(USERS_TABLE)?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{user_id}"));
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = match self.access_token.read().await.as_ref() {
            Some(token) => token.expose_secret().to_string(),
            None => self.api_key.expose_secret().to_string(),
        };
        self.client
            .request(method, url)
            .header("apikey", self.api_key.expose_secret())
            .bearer_auth(bearer)
    }
}

#[async_trait]
impl AuthService for RestBackend {
    #[instrument(skip_all)]
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<(), ServiceError> {
        let url = self.endpoint("/auth/v1/token?grant_type=password")?;
        let response = self
            .request(Method::POST, url)
            .await
            .json(&json!({ "email": email, "password": password.expose_secret() }))
            .send()
            .await
            .map_err(map_request_error)?;

        let token: TokenResponse = check(response)
            .await?
            .json()
            .await
            .map_err(|err| ServiceError::Parse(format!("Failed to decode token: {err}")))?;

        *self.access_token.write().await = Some(SecretString::from(token.access_token));
        debug!("access token stored");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        profile: &SignUpProfile,
    ) -> Result<(), ServiceError> {
        let url = self.endpoint("/auth/v1/signup")?;
        let response = self
            .request(Method::POST, url)
            .await
            .json(&json!({
                "email": email,
                "password": password.expose_secret(),
                "data": profile,
            }))
            .send()
            .await
            .map_err(map_request_error)?;

        check(response).await.map(drop)
    }

    #[instrument(skip_all)]
    async fn sign_out(&self) -> Result<(), ServiceError> {
        let Some(token) = self.access_token.write().await.take() else {
            return Ok(());
        };
        let url = self.endpoint("/auth/v1/logout")?;
        let response = self
            .client
            .post(url)
            .header("apikey", self.api_key.expose_secret())
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(map_request_error)?;

        check(response).await.map(drop)
    }

    #[instrument(skip_all)]
    async fn current_principal(&self) -> Result<Option<Principal>, ServiceError> {
        if self.access_token.read().await.is_none() {
            return Ok(None);
        }
        let url = self.endpoint("/auth/v1/user")?;
        let response = self
            .request(Method::GET, url)
            .await
            .send()
            .await
            .map_err(map_request_error)?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            debug!("session expired, dropping access token");
            *self.access_token.write().await = None;
            return Ok(None);
        }

        check(response)
            .await?
            .json::<Principal>()
            .await
            .map(Some)
            .map_err(|err| ServiceError::Parse(format!("Failed to decode principal: {err}")))
    }
}

#[async_trait]
impl UserStore for RestBackend {
    #[instrument(skip(self))]
    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, ServiceError> {
        let mut url = self.users_endpoint(user_id)?;
        url.query_pairs_mut().append_pair("select", "*");
        let response = self
            .request(Method::GET, url)
            .await
            .send()
            .await
            .map_err(map_request_error)?;

        let rows: Vec<User> = check(response)
            .await?
            .json()
            .await
            .map_err(|err| ServiceError::Parse(format!("Failed to decode user row: {err}")))?;

        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self, update))]
    async fn update_progress(
        &self,
        user_id: &str,
        update: &ProgressUpdate,
    ) -> Result<(), ServiceError> {
        let url = self.users_endpoint(user_id)?;
        let response = self
            .request(Method::PATCH, url)
            .await
            .header("Prefer", "return=minimal")
            .json(update)
            .send()
            .await
            .map_err(map_request_error)?;

        check(response).await.map(drop)
    }
}

/// Builds a URL from an explicit base URL and the provided path.
fn build_url_with_base(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

fn map_request_error(err: reqwest::Error) -> ServiceError {
    ServiceError::Network(err.to_string())
}

/// Passes successful responses through and classifies the rest.
async fn check(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::from_status(
        status.as_u16(),
        error_message(&body),
    ))
}

/// Extracts the human readable message from an error body.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let message = parsed.as_ref().and_then(|value| {
        ["msg", "error_description", "message", "error"]
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_str))
    });

    sanitize_body(message.unwrap_or(body))
}

/// Trims and truncates error bodies for user-facing messages.
fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
