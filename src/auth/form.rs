//! Transient sign-in / sign-up form state: field values, the last error
//! message, the submitting flag and the cooldown. Dropped when the auth view
//! is left, which also stops its cooldown ticker.

use super::controller::AuthController;
use super::cooldown::{cooldown_for, Cooldown, DEFAULT_COOLDOWN_SECS};
use super::validation::{validate_credentials, validate_sign_up, ValidationError};
use crate::backend::ServiceError;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::warn;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Please wait {0}s")]
    CoolingDown(u64),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[derive(Debug, Default)]
pub struct AuthForm {
    mode: AuthMode,
    email: String,
    password: SecretString,
    username: String,
    error: Option<String>,
    submitting: bool,
    cooldown: Cooldown,
}

impl AuthForm {
    #[must_use]
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Switches between sign-in and sign-up. Clears the error message; a
    /// running cooldown keeps running.
    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        };
        self.error = None;
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn has_password(&self) -> bool {
        !self.password.expose_secret().is_empty()
    }

    pub fn set_email(&mut self, email: &str) {
        self.email = email.to_string();
    }

    pub fn set_password(&mut self, password: SecretString) {
        self.password = password;
    }

    pub fn set_username(&mut self, username: &str) {
        self.username = username.to_string();
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        self.submitting
    }

    #[must_use]
    pub fn cooldown_remaining(&self) -> u64 {
        self.cooldown.remaining()
    }

    #[must_use]
    pub fn can_submit(&self) -> bool {
        !self.submitting && !self.cooldown.is_active()
    }

    /// Validates and submits the form.
    ///
    /// A running cooldown rejects the submission before validation. Validation
    /// failures never reach the network and never start a cooldown. A
    /// rate-limited service error starts one, as does a successful sign-up.
    /// The exclusive borrow rules out overlapping submissions.
    ///
    /// # Errors
    /// Returns why the submission was refused or failed; the same message is
    /// kept in [`AuthForm::error`] (except for the cooldown refusal).
    pub async fn submit(&mut self, controller: &AuthController) -> Result<(), SubmitError> {
        let remaining = self.cooldown.remaining();
        if remaining > 0 {
            return Err(SubmitError::CoolingDown(remaining));
        }

        self.error = None;
        let checked = match self.mode {
            AuthMode::SignIn => validate_credentials(&self.email, self.password.expose_secret()),
            AuthMode::SignUp => {
                validate_sign_up(&self.email, self.password.expose_secret(), &self.username)
            }
        };
        if let Err(err) = checked {
            self.error = Some(err.to_string());
            return Err(err.into());
        }

        self.submitting = true;
        let result = match self.mode {
            AuthMode::SignIn => controller.sign_in(&self.email, &self.password).await,
            AuthMode::SignUp => {
                controller
                    .sign_up(&self.email, &self.password, &self.username)
                    .await
            }
        };
        self.submitting = false;

        match result {
            Ok(()) => {
                if self.mode == AuthMode::SignUp {
                    self.cooldown.start(DEFAULT_COOLDOWN_SECS);
                }
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "authentication failed");
                if let Some(seconds) = cooldown_for(&err) {
                    self.cooldown.start(seconds);
                }
                self.error = Some(err.to_string());
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryBackend, Operation};
    use std::sync::Arc;
    use std::time::Duration;

    fn setup() -> (Arc<MemoryBackend>, AuthController) {
        let backend = Arc::new(MemoryBackend::new());
        let controller = AuthController::new(backend.clone(), backend.clone());
        (backend, controller)
    }

    fn sign_in_form(email: &str, password: &str) -> AuthForm {
        let mut form = AuthForm::new(AuthMode::SignIn);
        form.set_email(email);
        form.set_password(SecretString::from(password.to_string()));
        form
    }

    #[tokio::test]
    async fn validation_failure_skips_network_and_cooldown() {
        let (backend, controller) = setup();
        let mut form = sign_in_form("not-an-email", "secret1");

        let err = form.submit(&controller).await.expect_err("invalid");
        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::EmailFormat)
        ));
        assert_eq!(form.error(), Some("Please enter a valid email address"));
        assert_eq!(form.cooldown_remaining(), 0);
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test]
    async fn short_password_rejected_locally() {
        let (backend, controller) = setup();
        let mut form = sign_in_form("a@b.com", "12345");

        let err = form.submit(&controller).await.expect_err("short");
        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::PasswordTooShort)
        ));
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_with_wait_time_sets_cooldown() {
        let (backend, controller) = setup();
        backend
            .fail_next(
                Operation::SignIn,
                ServiceError::RateLimited(
                    "For security purposes, you can only request this after 42 seconds.".into(),
                ),
            )
            .await;
        let mut form = sign_in_form("a@b.com", "secret1");

        let err = form.submit(&controller).await.expect_err("limited");
        assert!(matches!(err, SubmitError::Service(ref e) if e.is_rate_limited()));
        assert_eq!(form.cooldown_remaining(), 42);
        assert!(!form.can_submit());
        assert_eq!(
            form.error(),
            Some("For security purposes, you can only request this after 42 seconds.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_without_wait_time_defaults_to_sixty() {
        let (backend, controller) = setup();
        backend
            .fail_next(
                Operation::SignIn,
                ServiceError::from_status(429, "email rate limit exceeded".into()),
            )
            .await;
        let mut form = sign_in_form("a@b.com", "secret1");

        assert!(form.submit(&controller).await.is_err());
        assert_eq!(form.cooldown_remaining(), DEFAULT_COOLDOWN_SECS);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_blocks_even_invalid_input() {
        let (backend, controller) = setup();
        backend
            .fail_next(
                Operation::SignIn,
                ServiceError::RateLimited("rate limit, try again after 5 seconds".into()),
            )
            .await;
        let mut form = sign_in_form("a@b.com", "secret1");
        assert!(form.submit(&controller).await.is_err());

        form.set_email("");
        let err = form.submit(&controller).await.expect_err("cooling down");
        assert!(matches!(err, SubmitError::CoolingDown(5)));
        assert_eq!(backend.count(Operation::SignIn).await, 1);

        tokio::time::sleep(Duration::from_millis(5_500)).await;
        assert!(form.can_submit());
        let err = form.submit(&controller).await.expect_err("now validated");
        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::EmailRequired)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_reload_after_sign_in_starts_no_cooldown() {
        let (backend, controller) = setup();
        backend.register("a@b.com", "secret1", "alice").await;
        backend
            .fail_next(
                Operation::FetchUser,
                ServiceError::from_status(429, "rate limit exceeded".into()),
            )
            .await;
        let mut form = sign_in_form("a@b.com", "secret1");

        form.submit(&controller).await.expect("sign in accepted");
        assert!(form.error().is_none());
        assert_eq!(form.cooldown_remaining(), 0);
        assert!(form.can_submit());
    }

    #[tokio::test]
    async fn other_errors_surface_verbatim_without_cooldown() {
        let (_, controller) = setup();
        let mut form = sign_in_form("a@b.com", "secret1");

        assert!(form.submit(&controller).await.is_err());
        assert_eq!(form.error(), Some("Invalid login credentials"));
        assert_eq!(form.cooldown_remaining(), 0);
        assert!(form.can_submit());
    }

    #[tokio::test(start_paused = true)]
    async fn successful_sign_up_starts_cooldown() {
        let (backend, controller) = setup();
        let mut form = AuthForm::new(AuthMode::SignUp);
        form.set_email("a@b.com");
        form.set_password(SecretString::from("secret1".to_string()));

        let err = form.submit(&controller).await.expect_err("username");
        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::UsernameRequired)
        ));

        form.set_username("alice");
        form.submit(&controller).await.expect("sign up");
        assert_eq!(form.cooldown_remaining(), DEFAULT_COOLDOWN_SECS);
        assert!(form.error().is_none());
        assert!(!form.is_submitting());
        assert_eq!(backend.count(Operation::SignUp).await, 1);
    }

    #[test]
    fn toggle_clears_error() {
        let mut form = AuthForm::new(AuthMode::SignIn);
        form.error = Some("Email is required".to_string());
        form.toggle_mode();
        assert_eq!(form.mode(), AuthMode::SignUp);
        assert!(form.error().is_none());
        form.toggle_mode();
        assert_eq!(form.mode(), AuthMode::SignIn);
    }
}
