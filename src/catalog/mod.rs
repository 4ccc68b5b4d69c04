//! Content catalog: topics, their modules and quiz questions.
//!
//! The catalog is a versioned JSON document embedded at compile time and
//! validated once on load. Lookups return `Option`; a missing topic or module
//! is a normal outcome that views turn into a "not found" state.

mod types;

pub use types::{option_label, Module, QuizQuestion, Topic};

use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

const EMBEDDED_CATALOG: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/content/catalog.json"));

/// Catalog format version understood by this build.
pub const CATALOG_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported catalog version {0}")]
    Version(u32),
    #[error("duplicate topic id: {0}")]
    DuplicateTopic(String),
    #[error("duplicate module id: {0}")]
    DuplicateModule(String),
    #[error("module {0} must award a positive xp reward")]
    ZeroXp(String),
    #[error("module {module} question {question}: needs at least two options")]
    TooFewOptions { module: String, question: usize },
    #[error("module {module} question {question}: correct answer {index} out of range")]
    AnswerOutOfRange {
        module: String,
        question: usize,
        index: usize,
    },
}

#[derive(Deserialize)]
struct CatalogDocument {
    version: u32,
    topics: Vec<Topic>,
}

#[derive(Clone, Debug)]
pub struct Catalog {
    version: u32,
    topics: Vec<Topic>,
}

impl Catalog {
    /// Loads the catalog shipped with the binary.
    ///
    /// # Errors
    /// Returns an error if the embedded document fails validation.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    /// Parses and validates a catalog document.
    ///
    /// # Errors
    /// Returns a [`CatalogError`] describing the first problem found.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        if document.version != CATALOG_VERSION {
            return Err(CatalogError::Version(document.version));
        }
        validate(&document.topics)?;

        Ok(Self {
            version: document.version,
            topics: document.topics,
        })
    }

    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    #[must_use]
    pub fn topic(&self, topic_id: &str) -> Option<&Topic> {
        self.topics.iter().find(|topic| topic.id == topic_id)
    }

    /// Finds a module anywhere in the catalog, with the topic that owns it.
    #[must_use]
    pub fn module(&self, module_id: &str) -> Option<(&Topic, &Module)> {
        self.topics
            .iter()
            .find_map(|topic| topic.module(module_id).map(|module| (topic, module)))
    }

    /// Total number of modules across all topics.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.topics.iter().map(|topic| topic.modules.len()).sum()
    }
}

// Module ids are unique across topics: the user's completed set is flat.
fn validate(topics: &[Topic]) -> Result<(), CatalogError> {
    let mut topic_ids = HashSet::new();
    let mut module_ids = HashSet::new();

    for topic in topics {
        if !topic_ids.insert(topic.id.as_str()) {
            return Err(CatalogError::DuplicateTopic(topic.id.clone()));
        }
        for module in &topic.modules {
            if !module_ids.insert(module.id.as_str()) {
                return Err(CatalogError::DuplicateModule(module.id.clone()));
            }
            if module.xp == 0 {
                return Err(CatalogError::ZeroXp(module.id.clone()));
            }
            for (index, question) in module.quiz.iter().enumerate() {
                if question.options.len() < 2 {
                    return Err(CatalogError::TooFewOptions {
                        module: module.id.clone(),
                        question: index,
                    });
                }
                if question.correct_answer >= question.options.len() {
                    return Err(CatalogError::AnswerOutOfRange {
                        module: module.id.clone(),
                        question: index,
                        index: question.correct_answer,
                    });
                }
            }
        }
    }

    Ok(())
}
