//! Lesson-then-quiz state machine for a single module.
//!
//! `Lesson -> Quiz -> Graded`, with `Graded -> Quiz` allowed only after a
//! partially correct submission. A fully correct submission is terminal and
//! yields exactly one [`Completion`]. The runner never persists anything.

use crate::catalog::{option_label, Module};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Lesson,
    Quiz,
    Graded,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("action not allowed while in {0:?}")]
    WrongPhase(Phase),
    #[error("question {0} does not exist")]
    UnknownQuestion(usize),
    #[error("question {question} has no option {option}")]
    UnknownOption { question: usize, option: usize },
    #[error("{} question(s) still unanswered", .0.len())]
    Unanswered(Vec<usize>),
    #[error("module already completed")]
    AlreadyCompleted,
}

/// Module-complete signal emitted on a fully correct submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub module_id: String,
    pub xp: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    AllCorrect(Completion),
    Partial { correct: usize, total: usize },
}

#[derive(Debug)]
pub struct ModuleRunner<'a> {
    module: &'a Module,
    phase: Phase,
    answers: BTreeMap<usize, usize>,
    results: Vec<bool>,
    completed: bool,
}

impl<'a> ModuleRunner<'a> {
    #[must_use]
    pub fn new(module: &'a Module) -> Self {
        Self {
            module,
            phase: Phase::Lesson,
            answers: BTreeMap::new(),
            results: Vec::new(),
            completed: false,
        }
    }

    #[must_use]
    pub const fn module(&self) -> &'a Module {
        self.module
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Leaves the lesson and opens the quiz.
    ///
    /// # Errors
    /// Returns [`QuizError::WrongPhase`] outside of `Lesson`.
    pub fn start_quiz(&mut self) -> Result<(), QuizError> {
        if self.phase != Phase::Lesson {
            return Err(QuizError::WrongPhase(self.phase));
        }
        self.phase = Phase::Quiz;
        Ok(())
    }

    /// Records (or changes) the selected option for a question.
    ///
    /// # Errors
    /// Rejected outside of `Quiz` or for indices outside the question set;
    /// the runner state is left untouched.
    pub fn select(&mut self, question: usize, option: usize) -> Result<(), QuizError> {
        if self.phase != Phase::Quiz {
            return Err(QuizError::WrongPhase(self.phase));
        }
        let entry = self
            .module
            .quiz
            .get(question)
            .ok_or(QuizError::UnknownQuestion(question))?;
        if option >= entry.options.len() {
            return Err(QuizError::UnknownOption { question, option });
        }
        self.answers.insert(question, option);
        Ok(())
    }

    #[must_use]
    pub fn selected(&self, question: usize) -> Option<usize> {
        self.answers.get(&question).copied()
    }

    /// Indices of questions without a selected option.
    #[must_use]
    pub fn unanswered(&self) -> Vec<usize> {
        (0..self.module.quiz.len())
            .filter(|index| !self.answers.contains_key(index))
            .collect()
    }

    /// Grades the quiz once every question has an answer.
    ///
    /// # Errors
    /// Returns [`QuizError::Unanswered`] (staying in `Quiz`) while any
    /// question is unanswered, or [`QuizError::WrongPhase`] outside `Quiz`.
    pub fn submit(&mut self) -> Result<Outcome, QuizError> {
        if self.phase != Phase::Quiz {
            return Err(QuizError::WrongPhase(self.phase));
        }
        let missing = self.unanswered();
        if !missing.is_empty() {
            return Err(QuizError::Unanswered(missing));
        }

        self.results = self
            .module
            .quiz
            .iter()
            .enumerate()
            .map(|(index, question)| self.answers.get(&index) == Some(&question.correct_answer))
            .collect();
        self.phase = Phase::Graded;

        let correct = self.results.iter().filter(|ok| **ok).count();
        let total = self.results.len();
        if correct < total {
            return Ok(Outcome::Partial { correct, total });
        }

        // Graded + all correct is terminal, so this can only be reached once.
        self.completed = true;
        Ok(Outcome::AllCorrect(Completion {
            module_id: self.module.id.clone(),
            xp: self.module.xp,
        }))
    }

    /// Clears the answers and returns to `Quiz` after a partial result.
    ///
    /// # Errors
    /// Only allowed from `Graded` with at least one wrong answer.
    pub fn reset(&mut self) -> Result<(), QuizError> {
        if self.phase != Phase::Graded {
            return Err(QuizError::WrongPhase(self.phase));
        }
        if self.completed {
            return Err(QuizError::AlreadyCompleted);
        }
        self.answers.clear();
        self.results.clear();
        self.phase = Phase::Quiz;
        Ok(())
    }

    /// Per-question correctness of the last grading; empty until graded.
    #[must_use]
    pub fn results(&self) -> &[bool] {
        &self.results
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Letter of the correct option, shown as feedback after grading.
    #[must_use]
    pub fn correct_label(&self, question: usize) -> Option<char> {
        if self.phase != Phase::Graded {
            return None;
        }
        self.module
            .quiz
            .get(question)
            .map(|entry| option_label(entry.correct_answer))
    }
}
