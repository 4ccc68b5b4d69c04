//! Catalog content types. Everything here is immutable once loaded; the
//! `completed` and `progress` fields are informational only, authoritative
//! completion lives on the user record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Topic {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    #[serde(default)]
    pub progress: u8,
    pub modules: Vec<Module>,
}

impl Topic {
    /// Finds a module of this topic by identifier.
    #[must_use]
    pub fn module(&self, module_id: &str) -> Option<&Module> {
        self.modules.iter().find(|module| module.id == module_id)
    }

    /// Percentage (0-100, rounded down) of this topic's modules present in
    /// `completed`. Empty topics report 0.
    #[must_use]
    pub fn completion_percent(&self, completed: &BTreeSet<String>) -> u8 {
        let total = self.modules.len();
        if total == 0 {
            return 0;
        }
        let done = self
            .modules
            .iter()
            .filter(|module| completed.contains(&module.id))
            .count();
        u8::try_from(done * 100 / total).unwrap_or(100)
    }

    /// True when the topic has modules and every one of them is in `completed`.
    #[must_use]
    pub fn is_mastered(&self, completed: &BTreeSet<String>) -> bool {
        !self.modules.is_empty()
            && self
                .modules
                .iter()
                .all(|module| completed.contains(&module.id))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Module {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    pub xp: u32,
    /// Lesson body in Markdown.
    pub content: String,
    pub quiz: Vec<QuizQuestion>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
}

/// Letter shown next to an answer option: 0 -> `A`, 1 -> `B`, ...
#[must_use]
pub fn option_label(index: usize) -> char {
    u8::try_from(index)
        .ok()
        .and_then(|offset| b'A'.checked_add(offset))
        .filter(u8::is_ascii_uppercase)
        .map_or('?', char::from)
}
