// src/quiz/mod.rs

pub mod engine;
pub mod provider;
pub mod stepper;
pub mod ticker;

pub use engine::QuizEngine;
pub use provider::{HttpQuestionProvider, QuestionProvider};
