// src/quiz/stepper.rs

//! Countdown-driven state machine for one quiz run.
//!
//! The stepper is synchronous and owns no timers or I/O. Callers feed it
//! loaded questions, answer selections and ticks, and act on the
//! [`Resolution`]s and [`Advance`] values it hands back.

use std::fmt;

use serde::Serialize;

use crate::{error::AppError, models::question::Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepperState {
    AwaitingStart,
    Loading,
    Presenting,
    Answered,
    Expired,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepperError {
    /// `start` was called without a usable category.
    MissingCategory,
    /// The selected option index does not exist on the current question.
    InvalidChoice { choice: usize, options: usize },
    /// The operation is not allowed in the current state.
    InvalidTransition { from: StepperState, action: &'static str },
}

impl fmt::Display for StepperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepperError::MissingCategory => write!(f, "A category is required to start a quiz"),
            StepperError::InvalidChoice { choice, options } => {
                write!(f, "Choice {} is out of range (question has {} options)", choice, options)
            }
            StepperError::InvalidTransition { from, action } => {
                write!(f, "Cannot {} while quiz is {:?}", action, from)
            }
        }
    }
}

impl std::error::Error for StepperError {}

impl From<StepperError> for AppError {
    fn from(err: StepperError) -> Self {
        match err {
            StepperError::MissingCategory | StepperError::InvalidChoice { .. } => {
                AppError::BadRequest(err.to_string())
            }
            StepperError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
        }
    }
}

/// Outcome of one question, emitted exactly once when it is answered or expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// 0-based question index within the attempt.
    pub order: u32,
    pub question: Question,
    /// Content of the selected option; `None` on expiry.
    pub user_answer: Option<String>,
    pub correct: bool,
    pub category: String,
}

impl Resolution {
    pub fn expired(&self) -> bool {
        self.user_answer.is_none()
    }
}

/// Result of [`QuestionStepper::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Fetch the next question and hand it back with this generation.
    Next { generation: u64 },
    /// All questions resolved.
    Finished { score: u32, total: u32 },
}

#[derive(Debug, Clone)]
pub struct QuestionStepper {
    state: StepperState,
    question_count: u32,
    question_seconds: u32,
    category: Option<String>,
    current: Option<Question>,
    remaining: u32,
    /// Number of questions resolved so far; also the order of the next one.
    resolved: u32,
    score: u32,
    generation: u64,
    last_resolution: Option<Resolution>,
}

impl QuestionStepper {
    pub fn new(question_count: u32, question_seconds: u32) -> Self {
        Self {
            state: StepperState::AwaitingStart,
            question_count: question_count.max(1),
            question_seconds: question_seconds.max(1),
            category: None,
            current: None,
            remaining: 0,
            resolved: 0,
            score: 0,
            generation: 0,
            last_resolution: None,
        }
    }

    pub fn state(&self) -> StepperState {
        self.state
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current.as_ref()
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn resolved(&self) -> u32 {
        self.resolved
    }

    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolution of the question currently on screen, if it has one.
    pub fn last_resolution(&self) -> Option<&Resolution> {
        self.last_resolution.as_ref()
    }

    /// 1-based number of the question being loaded or shown.
    pub fn question_number(&self) -> u32 {
        match self.state {
            StepperState::AwaitingStart => 0,
            StepperState::Loading | StepperState::Presenting => self.resolved + 1,
            _ => self.resolved,
        }
    }

    /// AwaitingStart -> Loading. Returns the generation of the first load.
    pub fn start(&mut self, category: Option<&str>) -> Result<u64, StepperError> {
        if self.state != StepperState::AwaitingStart {
            return Err(self.invalid("start"));
        }

        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(StepperError::MissingCategory)?;

        self.category = Some(category.to_string());
        Ok(self.begin_loading())
    }

    /// Loading -> Presenting. Returns `false` when the load is stale or unexpected.
    pub fn on_question_loaded(&mut self, generation: u64, question: Question) -> bool {
        if self.state != StepperState::Loading || generation != self.generation {
            return false;
        }

        self.current = Some(question);
        self.remaining = self.question_seconds;
        self.last_resolution = None;
        self.state = StepperState::Presenting;
        true
    }

    /// Presenting -> Answered.
    ///
    /// Returns `Ok(None)` when the selection is ignored: the question is not
    /// on screen, is already resolved, or its time has run out.
    pub fn on_answer_selected(&mut self, choice: usize) -> Result<Option<Resolution>, StepperError> {
        if self.state != StepperState::Presenting || self.remaining == 0 {
            return Ok(None);
        }
        let Some(question) = self.current.as_ref() else {
            return Ok(None);
        };
        let Some(option) = question.options.get(choice) else {
            return Err(StepperError::InvalidChoice {
                choice,
                options: question.options.len(),
            });
        };

        let correct = option.is_correct;
        let user_answer = Some(option.content.clone());
        if correct {
            self.score += 1;
        }
        self.state = StepperState::Answered;
        Ok(Some(self.resolve(user_answer, correct)))
    }

    /// One countdown unit elapsed. Returns the expiry resolution when time runs out.
    pub fn on_tick(&mut self) -> Option<Resolution> {
        if self.state != StepperState::Presenting || self.remaining == 0 {
            return None;
        }

        self.remaining -= 1;
        if self.remaining > 0 {
            return None;
        }

        self.state = StepperState::Expired;
        Some(self.resolve(None, false))
    }

    /// Answered/Expired -> Loading or Finished.
    pub fn advance(&mut self) -> Result<Advance, StepperError> {
        if !matches!(self.state, StepperState::Answered | StepperState::Expired) {
            return Err(self.invalid("advance"));
        }

        if self.resolved >= self.question_count {
            self.state = StepperState::Finished;
            self.current = None;
            return Ok(Advance::Finished {
                score: self.score,
                total: self.resolved,
            });
        }

        Ok(Advance::Next {
            generation: self.begin_loading(),
        })
    }

    /// Re-issues the pending load under a new generation.
    /// Any response still in flight for the previous generation becomes stale.
    pub fn reload(&mut self) -> Result<u64, StepperError> {
        if self.state != StepperState::Loading {
            return Err(self.invalid("reload"));
        }
        self.generation += 1;
        Ok(self.generation)
    }

    fn begin_loading(&mut self) -> u64 {
        self.state = StepperState::Loading;
        self.current = None;
        self.remaining = 0;
        self.last_resolution = None;
        self.generation += 1;
        self.generation
    }

    fn resolve(&mut self, user_answer: Option<String>, correct: bool) -> Resolution {
        let resolution = Resolution {
            order: self.resolved,
            question: self.current.clone().unwrap_or_else(|| Question {
                text: String::new(),
                options: Vec::new(),
            }),
            user_answer,
            correct,
            category: self.category.clone().unwrap_or_default(),
        };
        self.resolved += 1;
        self.last_resolution = Some(resolution.clone());
        resolution
    }

    fn invalid(&self, action: &'static str) -> StepperError {
        StepperError::InvalidTransition {
            from: self.state,
            action,
        }
    }
}
