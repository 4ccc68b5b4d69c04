//! Auth controller: forwards credentials to the auth service and owns the
//! identity reload that keeps the session snapshot in sync with the store.

use super::session::{Session, SessionState};
use crate::backend::{AuthService, ServiceError, SignUpProfile, User, UserStore};
use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

pub struct AuthController {
    auth: Arc<dyn AuthService>,
    store: Arc<dyn UserStore>,
    session: Session,
}

impl AuthController {
    #[must_use]
    pub fn new(auth: Arc<dyn AuthService>, store: Arc<dyn UserStore>) -> Self {
        Self {
            auth,
            store,
            session: Session::new(),
        }
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.session.user()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Signs in and reloads the user snapshot. A failed reload is logged and
    /// leaves the previous snapshot in place; it does not fail the sign-in.
    ///
    /// # Errors
    /// Returns the auth service error unchanged.
    #[instrument(skip_all)]
    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<(), ServiceError> {
        self.auth.sign_in(email, password).await?;
        info!("signed in");
        if let Err(err) = self.load_user().await {
            warn!(error = %err, "failed to reload user after sign-in");
        }
        Ok(())
    }

    /// Registers an account with the initial profile (XP 0, level 1, empty
    /// sets). Does not establish a session.
    ///
    /// # Errors
    /// Returns the auth service error unchanged.
    #[instrument(skip_all)]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        username: &str,
    ) -> Result<(), ServiceError> {
        self.auth
            .sign_up(email, password, &SignUpProfile::new(username))
            .await?;
        info!("account registered");
        Ok(())
    }

    /// Best-effort remote sign-out; the local session is cleared regardless.
    #[instrument(skip_all)]
    pub async fn sign_out(&self) {
        if let Err(err) = self.auth.sign_out().await {
            warn!(error = %err, "remote sign-out failed");
        }
        self.session.clear();
        info!("signed out");
    }

    /// Replaces the cached user with the current principal's profile row, or
    /// with none when nobody is signed in. The loading flag is cleared on
    /// every outcome; on failure the previous snapshot is kept.
    ///
    /// # Errors
    /// Returns the auth service or store error.
    #[instrument(skip_all)]
    pub async fn load_user(&self) -> Result<(), ServiceError> {
        let ticket = self.session.begin();

        match self.fetch_current_user().await {
            Ok(user) => {
                debug!(authenticated = user.is_some(), "user reloaded");
                if !self.session.complete(ticket, user) {
                    debug!("discarding stale user reload");
                }
                Ok(())
            }
            Err(err) => {
                self.session.abandon(ticket);
                Err(err)
            }
        }
    }

    async fn fetch_current_user(&self) -> Result<Option<User>, ServiceError> {
        let Some(principal) = self.auth.current_principal().await? else {
            return Ok(None);
        };
        self.store.fetch_user(&principal.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryBackend, Operation};
    use crate::backend::{Principal, ProgressUpdate};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::{oneshot, Mutex};

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    fn controller(backend: &Arc<MemoryBackend>) -> AuthController {
        AuthController::new(backend.clone(), backend.clone())
    }

    #[tokio::test]
    async fn sign_in_reloads_user() {
        let backend = Arc::new(MemoryBackend::new());
        let id = backend.register("a@b.com", "secret1", "alice").await;
        let controller = controller(&backend);

        controller
            .sign_in("a@b.com", &secret("secret1"))
            .await
            .expect("sign in");

        let state = controller.session().snapshot();
        assert!(!state.loading);
        assert_eq!(state.user.map(|u| u.id), Some(id));
        assert_eq!(
            backend.calls().await,
            vec![
                Operation::SignIn,
                Operation::CurrentPrincipal,
                Operation::FetchUser
            ]
        );
    }

    #[tokio::test]
    async fn sign_in_failure_surfaces_error_without_reload() {
        let backend = Arc::new(MemoryBackend::new());
        let controller = controller(&backend);

        let err = controller
            .sign_in("a@b.com", &secret("secret1"))
            .await
            .expect_err("unknown account");
        assert_eq!(err.to_string(), "Invalid login credentials");
        assert_eq!(backend.calls().await, vec![Operation::SignIn]);
        assert!(controller.current_user().is_none());
    }

    #[tokio::test]
    async fn sign_in_succeeds_when_reload_fails() {
        let backend = Arc::new(MemoryBackend::new());
        backend.register("a@b.com", "secret1", "alice").await;
        backend
            .fail_next(
                Operation::FetchUser,
                ServiceError::from_status(429, "rate limit exceeded".to_string()),
            )
            .await;
        let controller = controller(&backend);

        controller
            .sign_in("a@b.com", &secret("secret1"))
            .await
            .expect("sign in");

        let state = controller.session().snapshot();
        assert!(!state.loading);
        assert!(state.user.is_none());
        assert_eq!(backend.count(Operation::FetchUser).await, 1);
    }

    #[tokio::test]
    async fn sign_up_does_not_sign_in() {
        let backend = Arc::new(MemoryBackend::new());
        let controller = controller(&backend);

        controller
            .sign_up("a@b.com", &secret("secret1"), "alice")
            .await
            .expect("sign up");

        assert!(controller.current_user().is_none());
        assert_eq!(backend.calls().await, vec![Operation::SignUp]);
    }

    #[tokio::test]
    async fn sign_out_clears_even_when_remote_fails() {
        let backend = Arc::new(MemoryBackend::new());
        backend.register("a@b.com", "secret1", "alice").await;
        let controller = controller(&backend);
        controller
            .sign_in("a@b.com", &secret("secret1"))
            .await
            .expect("sign in");

        backend
            .fail_next(
                Operation::SignOut,
                ServiceError::Network("offline".to_string()),
            )
            .await;
        controller.sign_out().await;

        assert_eq!(
            controller.session().snapshot(),
            SessionState {
                user: None,
                loading: false
            }
        );
    }

    #[tokio::test]
    async fn load_user_without_principal_sets_none() {
        let backend = Arc::new(MemoryBackend::new());
        let controller = controller(&backend);
        assert!(controller.session().snapshot().loading);

        controller.load_user().await.expect("load");

        let state = controller.session().snapshot();
        assert!(!state.loading);
        assert!(state.user.is_none());
        assert_eq!(backend.count(Operation::FetchUser).await, 0);
    }

    #[tokio::test]
    async fn load_user_failure_keeps_snapshot_and_clears_loading() {
        let backend = Arc::new(MemoryBackend::new());
        backend.register("a@b.com", "secret1", "alice").await;
        let controller = controller(&backend);
        controller
            .sign_in("a@b.com", &secret("secret1"))
            .await
            .expect("sign in");

        backend
            .fail_next(
                Operation::FetchUser,
                ServiceError::Network("offline".to_string()),
            )
            .await;
        assert!(controller.load_user().await.is_err());

        let state = controller.session().snapshot();
        assert!(!state.loading);
        assert_eq!(state.user.map(|u| u.username), Some("alice".to_string()));
    }

    /// Principal is fixed; each `fetch_user` waits for a row handed over by
    /// the test, so responses can be released out of order.
    struct GatedBackend {
        pending: Mutex<VecDeque<oneshot::Receiver<User>>>,
    }

    #[async_trait]
    impl AuthService for GatedBackend {
        async fn sign_in(&self, _: &str, _: &SecretString) -> Result<(), ServiceError> {
            Ok(())
        }

        async fn sign_up(
            &self,
            _: &str,
            _: &SecretString,
            _: &SignUpProfile,
        ) -> Result<(), ServiceError> {
            Ok(())
        }

        async fn sign_out(&self) -> Result<(), ServiceError> {
            Ok(())
        }

        async fn current_principal(&self) -> Result<Option<Principal>, ServiceError> {
            Ok(Some(Principal {
                id: "u-1".to_string(),
                email: "a@b.com".to_string(),
            }))
        }
    }

    #[async_trait]
    impl UserStore for GatedBackend {
        async fn fetch_user(&self, _: &str) -> Result<Option<User>, ServiceError> {
            let gate = self.pending.lock().await.pop_front();
            match gate {
                Some(gate) => gate
                    .await
                    .map(Some)
                    .map_err(|_| ServiceError::Network("gate dropped".to_string())),
                None => Ok(None),
            }
        }

        async fn update_progress(&self, _: &str, _: &ProgressUpdate) -> Result<(), ServiceError> {
            Ok(())
        }
    }

    fn row(xp: u64) -> User {
        let mut user = User::new("u-1".into(), "a@b.com".into(), "alice".into());
        user.xp = xp;
        user
    }

    #[tokio::test]
    async fn older_reload_cannot_overwrite_newer() {
        let (first_tx, first_rx) = oneshot::channel();
        let (second_tx, second_rx) = oneshot::channel();
        let backend = Arc::new(GatedBackend {
            pending: Mutex::new(VecDeque::from([first_rx, second_rx])),
        });
        let controller = Arc::new(AuthController::new(backend.clone(), backend));

        let first = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.load_user().await }
        });
        tokio::task::yield_now().await;
        let second = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.load_user().await }
        });
        tokio::task::yield_now().await;

        // Newer response lands first, then the stale one.
        second_tx.send(row(200)).expect("second");
        second.await.expect("join").expect("second load");
        first_tx.send(row(100)).expect("first");
        first.await.expect("join").expect("first load");

        assert_eq!(controller.current_user().map(|u| u.xp), Some(200));
        assert!(!controller.session().snapshot().loading);
    }

    #[tokio::test]
    async fn reload_in_flight_cannot_undo_sign_out() {
        let (tx, rx) = oneshot::channel();
        let backend = Arc::new(GatedBackend {
            pending: Mutex::new(VecDeque::from([rx])),
        });
        let controller = Arc::new(AuthController::new(backend.clone(), backend));

        let load = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.load_user().await }
        });
        tokio::task::yield_now().await;
        controller.sign_out().await;

        tx.send(row(100)).expect("send");
        load.await.expect("join").expect("load");

        assert!(controller.current_user().is_none());
    }
}
