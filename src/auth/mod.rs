//! Session and authentication: the session snapshot and its observers, the
//! controller that talks to the auth service, and the transient sign-in /
//! sign-up form with its validation and rate-limit cooldown.
//!
//! Flow Overview: the form validates locally (never touching the network on
//! failure), refuses to submit while a cooldown is running, and forwards to
//! the controller. The controller owns identity reloads; a successful sign-in
//! always ends with `load_user`. Passwords are carried as `SecretString` and
//! must never be logged.

pub mod controller;
pub mod cooldown;
pub mod form;
pub mod session;
pub mod validation;

pub use controller::AuthController;
pub use cooldown::Cooldown;
pub use form::{AuthForm, AuthMode, SubmitError};
pub use session::{Session, SessionState};
pub use validation::ValidationError;
