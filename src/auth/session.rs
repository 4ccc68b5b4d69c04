//! Process-wide session snapshot. Every change replaces the whole state and
//! is published on a `watch` channel, so views observe changes instead of
//! polling.
//!
//! Identity reloads are sequenced by a generation counter: `begin` hands out
//! a ticket and only the holder of the newest ticket may publish. Sign-out
//! also advances the generation, so a reload started before it cannot bring
//! the user back. Generation reads and writes happen inside the channel's
//! modify closures, which serializes them with the state they guard.

use crate::backend::User;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    pub loading: bool,
}

impl SessionState {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

impl Default for SessionState {
    // Nothing is known about the principal until the first reload completes.
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug)]
pub struct Session {
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            state,
            generation: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Starts a reload: invalidates older tickets and raises the loading flag.
    pub fn begin(&self) -> Ticket {
        let mut ticket = Ticket(0);
        self.state.send_if_modified(|state| {
            ticket = Ticket(self.generation.fetch_add(1, Ordering::SeqCst) + 1);
            let changed = !state.loading;
            state.loading = true;
            changed
        });
        ticket
    }

    /// Publishes the result of a reload. Returns `false` (and changes nothing)
    /// when a newer reload or a sign-out started after `ticket` was issued.
    pub fn complete(&self, ticket: Ticket, user: Option<User>) -> bool {
        self.apply(ticket, |state| {
            *state = SessionState {
                user,
                loading: false,
            };
        })
    }

    /// Ends a failed reload: the snapshot is kept, only loading is cleared.
    pub fn abandon(&self, ticket: Ticket) -> bool {
        self.apply(ticket, |state| state.loading = false)
    }

    /// Drops the user unconditionally and invalidates in-flight reloads.
    pub fn clear(&self) {
        self.state.send_modify(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *state = SessionState {
                user: None,
                loading: false,
            };
        });
    }

    fn apply(&self, ticket: Ticket, modify: impl FnOnce(&mut SessionState)) -> bool {
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != ticket.0 {
                return false;
            }
            modify(state);
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        User::new(id.to_string(), format!("{id}@example.com"), id.to_string())
    }

    #[test]
    fn starts_loading_without_user() {
        let session = Session::new();
        let state = session.snapshot();
        assert!(state.loading);
        assert!(!state.is_authenticated());
    }

    #[test]
    fn newest_ticket_wins() {
        let session = Session::new();
        let older = session.begin();
        let newer = session.begin();

        assert!(session.complete(newer, Some(user("new"))));
        assert!(!session.complete(older, Some(user("old"))));
        assert_eq!(session.user().map(|u| u.id), Some("new".to_string()));
        assert!(!session.snapshot().loading);
    }

    #[test]
    fn clear_invalidates_in_flight_reload() {
        let session = Session::new();
        let ticket = session.begin();
        session.clear();

        assert!(!session.complete(ticket, Some(user("ghost"))));
        assert_eq!(
            session.snapshot(),
            SessionState {
                user: None,
                loading: false
            }
        );
    }

    #[test]
    fn abandon_keeps_user_and_clears_loading() {
        let session = Session::new();
        let first = session.begin();
        session.complete(first, Some(user("kept")));

        let second = session.begin();
        assert!(session.snapshot().loading);
        assert!(session.abandon(second));
        let state = session.snapshot();
        assert!(!state.loading);
        assert_eq!(state.user.map(|u| u.id), Some("kept".to_string()));
    }

    #[tokio::test]
    async fn observers_see_replacements() {
        let session = Session::new();
        let mut receiver = session.subscribe();
        let ticket = session.begin();
        session.complete(ticket, Some(user("alice")));

        receiver.changed().await.expect("changed");
        assert!(receiver.borrow_and_update().is_authenticated());

        session.clear();
        receiver.changed().await.expect("changed");
        assert!(!receiver.borrow().is_authenticated());
    }
}
