//! Boundary to the hosted auth and data service.
//!
//! [`AuthService`] covers credentials and the current principal; [`UserStore`]
//! covers the profile row. Both are object safe so the controller can hold
//! them as `Arc<dyn ...>` and swap the REST adapter for the in-memory one.

pub mod memory;
pub mod rest;
mod types;

pub use types::{Principal, ProgressUpdate, SignUpProfile, User};

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The service throttled the request; the message may carry a wait time.
    #[error("{0}")]
    RateLimited(String),
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("Unable to reach the server: {0}")]
    Network(String),
    #[error("Response error: {0}")]
    Parse(String),
}

impl ServiceError {
    /// Classifies an error response by status and message.
    #[must_use]
    pub fn from_status(status: u16, message: String) -> Self {
        if status == 429 || mentions_rate_limit(&message) {
            Self::RateLimited(message)
        } else {
            Self::Rejected { status, message }
        }
    }

    /// Shorthand for a 400-class rejection carrying `message`.
    #[must_use]
    pub fn rejected(message: &str) -> Self {
        Self::from_status(400, message.to_string())
    }

    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

fn mentions_rate_limit(message: &str) -> bool {
    message.to_lowercase().contains("rate limit")
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<(), ServiceError>;

    /// Registers an account with its initial profile. Does not sign in.
    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        profile: &SignUpProfile,
    ) -> Result<(), ServiceError>;

    async fn sign_out(&self) -> Result<(), ServiceError>;

    /// Returns the signed-in principal, or `None` without a valid session.
    async fn current_principal(&self) -> Result<Option<Principal>, ServiceError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, ServiceError>;

    async fn update_progress(
        &self,
        user_id: &str,
        update: &ProgressUpdate,
    ) -> Result<(), ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_is_rate_limited() {
        let err = ServiceError::from_status(429, "Too many requests".to_string());
        assert!(err.is_rate_limited());
        assert_eq!(err.to_string(), "Too many requests");
    }

    #[test]
    fn rate_limit_message_is_rate_limited_regardless_of_status() {
        let err = ServiceError::rejected("Email Rate Limit exceeded, retry after 42 seconds");
        assert!(err.is_rate_limited());
    }

    #[test]
    fn other_failures_keep_status_and_message() {
        let err = ServiceError::from_status(400, "Invalid login credentials".to_string());
        assert!(!err.is_rate_limited());
        assert_eq!(
            err,
            ServiceError::Rejected {
                status: 400,
                message: "Invalid login credentials".to_string()
            }
        );
        assert_eq!(err.to_string(), "Invalid login credentials");
    }
}
