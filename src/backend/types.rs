//! Records exchanged with the hosted auth and data service. Passwords and
//! access tokens never appear here.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

use crate::progress::level_for_xp;

/// Authenticated principal as reported by the auth service.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
}

/// Cached snapshot of the user's profile row.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub xp: u64,
    #[serde(default = "initial_level", deserialize_with = "null_as_initial_level")]
    pub level: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub achievements: BTreeSet<String>,
    #[serde(
        default,
        alias = "completedModules",
        deserialize_with = "null_as_default"
    )]
    pub completed_modules: BTreeSet<String>,
}

impl User {
    /// Fresh profile as created at sign-up.
    #[must_use]
    pub fn new(id: String, email: String, username: String) -> Self {
        Self {
            id,
            email,
            username,
            xp: 0,
            level: initial_level(),
            achievements: BTreeSet::new(),
            completed_modules: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn has_completed(&self, module_id: &str) -> bool {
        self.completed_modules.contains(module_id)
    }

    /// Display level: the stored level, or the level implied by XP if higher.
    #[must_use]
    pub fn effective_level(&self) -> u32 {
        self.level.max(level_for_xp(self.xp))
    }
}

/// Initial profile fields sent with a sign-up request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignUpProfile {
    pub username: String,
    pub xp: u64,
    pub level: u32,
    pub achievements: Vec<String>,
    pub completed_modules: Vec<String>,
}

impl SignUpProfile {
    #[must_use]
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            xp: 0,
            level: initial_level(),
            achievements: Vec::new(),
            completed_modules: Vec::new(),
        }
    }
}

/// Partial row update written on module completion.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub completed_modules: BTreeSet<String>,
    pub xp: u64,
}

const fn initial_level() -> u32 {
    1
}

fn null_as_initial_level<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or_else(initial_level))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
