// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

/// Represents the 'results' table in the database.
/// One quiz attempt; created empty when the quiz starts and finalized once.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub score: i64,
    pub total: i64,
    #[sqlx(rename = "duration")]
    pub duration_seconds: i64,
    pub category: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'user_answers' table: the resolution of one question.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub id: i64,
    pub result_id: i64,
    pub question_text: String,
    pub options: Json<Vec<String>>,
    pub correct_answer: String,

    /// `None` when the question expired without an answer.
    pub user_answer: Option<String>,

    /// 0-based position within the attempt.
    #[sqlx(rename = "question_order")]
    pub order: i64,

    pub category: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Data needed to write one `AnsweredQuestion`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnswer {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub user_answer: Option<String>,
    pub order: i64,
    pub category: Option<String>,
}

/// Attempt row as listed on the dashboard.
#[derive(Debug, Serialize)]
pub struct AttemptView {
    #[serde(flatten)]
    pub attempt: QuizAttempt,
    pub passed: bool,
    pub duration_label: String,
}

/// One attempt with all of its answers, in question order.
#[derive(Debug, Serialize)]
pub struct AttemptDetail {
    #[serde(flatten)]
    pub attempt: AttemptView,
    pub answers: Vec<AnsweredQuestion>,
}
