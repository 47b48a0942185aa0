// src/handlers/dashboard.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    dashboard::{DashboardSummary, attempt_view, session_view, summarize},
    error::AppError,
    models::{
        attempt::{AnsweredQuestion, AttemptDetail, AttemptView, QuizAttempt},
        session::{Session, SessionView},
    },
    recorder::SESSION_COLUMNS,
    utils::jwt::AuthContext,
};

const ATTEMPT_COLUMNS: &str =
    "id, user_id, score, total, duration, category, created_at, finished_at";

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub summary: DashboardSummary,
    pub attempts: Vec<AttemptView>,
}

/// Summary statistics and the list of finished attempts, newest first.
///
/// A failing query degrades to an empty dashboard instead of an error.
pub async fn get_dashboard(
    State(pool): State<SqlitePool>,
    Extension(auth): Extension<AuthContext>,
) -> impl IntoResponse {
    let attempts: Vec<QuizAttempt> = sqlx::query_as(&format!(
        "SELECT {ATTEMPT_COLUMNS} FROM results
         WHERE user_id = ? AND finished_at IS NOT NULL
         ORDER BY id DESC"
    ))
    .bind(auth.user_id)
    .fetch_all(&pool)
    .await
    .unwrap_or_else(|e| {
        tracing::warn!("No results found or query failed for user {}: {:?}", auth.user_id, e);
        Vec::new()
    });

    let summary = summarize(&attempts);
    Json(DashboardResponse {
        summary,
        attempts: attempts.into_iter().map(attempt_view).collect(),
    })
}

/// One attempt of the caller with its answers in question order.
pub async fn get_attempt(
    State(pool): State<SqlitePool>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt: QuizAttempt = sqlx::query_as(&format!(
        "SELECT {ATTEMPT_COLUMNS} FROM results WHERE id = ? AND user_id = ?"
    ))
    .bind(id)
    .bind(auth.user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound(format!("Attempt {} not found", id)))?;

    let answers: Vec<AnsweredQuestion> = sqlx::query_as(
        r#"
        SELECT id, result_id, question_text, options, correct_answer, user_answer,
               question_order, category, created_at
        FROM user_answers
        WHERE result_id = ?
        ORDER BY question_order
        "#,
    )
    .bind(attempt.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(AttemptDetail {
        attempt: attempt_view(attempt),
        answers,
    }))
}

/// The caller's current session with its live duration.
pub async fn get_session(
    State(pool): State<SqlitePool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<SessionView>, AppError> {
    let session: Session = sqlx::query_as(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ? AND user_id = ?"
    ))
    .bind(auth.session_id)
    .bind(auth.user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Session not found".to_string()))?;

    Ok(Json(session_view(session, Utc::now())))
}
