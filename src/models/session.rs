// src/models/session.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

/// Represents the 'sessions' table: one login-to-logout window.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// `None` while the session is in progress.
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,

    /// Length in seconds, set when the session is closed.
    #[sqlx(rename = "duration")]
    pub duration_seconds: i64,

    pub quiz_count: i64,

    /// Ids of the attempts finished during this session, oldest first.
    pub quiz_history: Json<Vec<i64>>,
}

impl Session {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

/// Live view of a session for the dashboard.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    pub in_progress: bool,
    pub elapsed_seconds: i64,
    pub elapsed_label: String,
    pub quiz_count: i64,
    pub quiz_history: Vec<i64>,
}
