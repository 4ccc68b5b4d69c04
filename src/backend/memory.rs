//! In-memory auth service and user store, used by the offline mode and by
//! tests. Every call is recorded so callers can assert which requests were
//! (or were not) issued, and failures can be queued per operation.

use super::{AuthService, Principal, ProgressUpdate, ServiceError, SignUpProfile, User, UserStore};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    SignIn,
    SignUp,
    SignOut,
    CurrentPrincipal,
    FetchUser,
    UpdateProgress,
}

struct Account {
    id: String,
    password: SecretString,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    rows: HashMap<String, User>,
    signed_in: Option<Principal>,
    calls: Vec<Operation>,
    failures: HashMap<Operation, VecDeque<ServiceError>>,
    updates: Vec<(String, ProgressUpdate)>,
}

impl State {
    fn record(&mut self, operation: Operation) -> Result<(), ServiceError> {
        self.calls.push(operation);
        match self
            .failures
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an account and its profile row without recording a call.
    /// Returns the new user id.
    pub async fn register(&self, email: &str, password: &str, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let mut state = self.state.lock().await;
        state.accounts.insert(
            email.to_string(),
            Account {
                id: id.clone(),
                password: SecretString::from(password.to_string()),
            },
        );
        state.rows.insert(
            id.clone(),
            User::new(id.clone(), email.to_string(), username.to_string()),
        );
        id
    }

    /// Makes the next call of `operation` fail with `error`.
    pub async fn fail_next(&self, operation: Operation, error: ServiceError) {
        self.state
            .lock()
            .await
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    pub async fn calls(&self) -> Vec<Operation> {
        self.state.lock().await.calls.clone()
    }

    pub async fn count(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| **call == operation)
            .count()
    }

    /// Progress updates applied so far, in order.
    pub async fn updates(&self) -> Vec<(String, ProgressUpdate)> {
        self.state.lock().await.updates.clone()
    }

    pub async fn row(&self, user_id: &str) -> Option<User> {
        self.state.lock().await.rows.get(user_id).cloned()
    }

    pub async fn row_by_email(&self, email: &str) -> Option<User> {
        let state = self.state.lock().await;
        let account = state.accounts.get(email)?;
        state.rows.get(&account.id).cloned()
    }
}

#[async_trait]
impl AuthService for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        state.record(Operation::SignIn)?;

        let id = match state.accounts.get(email) {
            Some(account) if account.password.expose_secret() == password.expose_secret() => {
                account.id.clone()
            }
            _ => return Err(ServiceError::rejected("Invalid login credentials")),
        };
        debug!(user_id = %id, "memory sign-in");
        state.signed_in = Some(Principal {
            id,
            email: email.to_string(),
        });
        Ok(())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        profile: &SignUpProfile,
    ) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        state.record(Operation::SignUp)?;

        if state.accounts.contains_key(email) {
            return Err(ServiceError::rejected("User already registered"));
        }
        let id = Uuid::new_v4().to_string();
        state.accounts.insert(
            email.to_string(),
            Account {
                id: id.clone(),
                password: password.clone(),
            },
        );
        let mut user = User::new(id.clone(), email.to_string(), profile.username.clone());
        user.xp = profile.xp;
        user.level = profile.level;
        user.achievements = profile.achievements.iter().cloned().collect();
        user.completed_modules = profile.completed_modules.iter().cloned().collect();
        state.rows.insert(id, user);
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        let result = state.record(Operation::SignOut);
        // A failed sign-out still drops the server side session here.
        state.signed_in = None;
        result
    }

    async fn current_principal(&self) -> Result<Option<Principal>, ServiceError> {
        let mut state = self.state.lock().await;
        state.record(Operation::CurrentPrincipal)?;
        Ok(state.signed_in.clone())
    }
}

#[async_trait]
impl UserStore for MemoryBackend {
    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, ServiceError> {
        let mut state = self.state.lock().await;
        state.record(Operation::FetchUser)?;
        Ok(state.rows.get(user_id).cloned())
    }

    async fn update_progress(
        &self,
        user_id: &str,
        update: &ProgressUpdate,
    ) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        state.record(Operation::UpdateProgress)?;

        let Some(row) = state.rows.get_mut(user_id) else {
            return Err(ServiceError::Rejected {
                status: 404,
                message: "user not found".to_string(),
            });
        };
        row.completed_modules.clone_from(&update.completed_modules);
        row.xp = update.xp;
        state.updates.push((user_id.to_string(), update.clone()));
        Ok(())
    }
}
