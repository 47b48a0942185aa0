// src/models/question.rs

use serde::{Deserialize, Serialize};

/// A single answer option of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub content: String,
    pub is_correct: bool,
}

/// A question as presented to the user.
/// Fetched per question from the provider and never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub options: Vec<AnswerOption>,
}

impl Question {
    /// Content of the first option flagged as correct.
    pub fn correct_answer(&self) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.is_correct)
            .map(|o| o.content.as_str())
    }

    /// Option contents in display order.
    pub fn option_contents(&self) -> Vec<String> {
        self.options.iter().map(|o| o.content.clone()).collect()
    }
}

/// Wire format returned by the question webhook.
#[derive(Debug, Deserialize)]
pub struct ProviderQuestion {
    pub question: String,
    pub answers: Vec<ProviderAnswer>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderAnswer {
    pub content: String,
    #[serde(rename = "is_Correct", default)]
    pub is_correct: bool,
}

/// DTO for sending a question to the client (excludes correctness flags).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub text: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            text: q.text.clone(),
            options: q.option_contents(),
        }
    }
}
