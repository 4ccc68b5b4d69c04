//! # CyberLearn (Cybersecurity Lessons & Quizzes)
//!
//! `cyberlearn` presents cybersecurity topics, each made of modules with a
//! Markdown lesson and a multiple-choice quiz. Progress (experience points,
//! level, completed modules) lives in a hosted auth + data service; this crate
//! only mirrors it.
//!
//! ## Control Flow
//!
//! 1. **Identity:** [`auth::AuthController`] signs the user in and keeps the
//!    cached [`backend::User`] snapshot current through `load_user`.
//! 2. **Selection:** the user picks a topic and module from the
//!    [`catalog::Catalog`], which is embedded at compile time.
//! 3. **Lesson & Quiz:** [`quiz::ModuleRunner`] drives the lesson, quiz and
//!    grading states and yields a [`quiz::Completion`] on a fully correct
//!    submission.
//! 4. **Sync:** [`progress::ProgressSync`] writes the completed module and XP
//!    award to the data service and then reloads the snapshot.
//!
//! ## Failure Model
//!
//! Validation failures never reach the network. Rate-limited auth failures
//! start a cooldown that blocks resubmission. Progress sync failures are only
//! logged; nothing is retried automatically.

pub mod achievements;
pub mod auth;
pub mod backend;
pub mod catalog;
pub mod cli;
pub mod progress;
pub mod quiz;
pub mod routes;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
