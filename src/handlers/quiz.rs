// src/handlers/quiz.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;

use crate::{error::AppError, quiz::QuizEngine, utils::jwt::AuthContext};

#[derive(Debug, Deserialize)]
pub struct StartQuizRequest {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    /// Index of the selected option in the question's option list.
    pub choice: usize,
}

/// Lists the categories offered by the question provider.
///
/// A provider failure degrades to an empty list.
pub async fn list_categories(State(quizzes): State<QuizEngine>) -> impl IntoResponse {
    let categories = quizzes
        .provider()
        .list_categories()
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to fetch categories: {}", e);
            Vec::new()
        });

    Json(categories)
}

/// Starts a quiz in the requested category and returns the first question.
pub async fn start_quiz(
    State(quizzes): State<QuizEngine>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<StartQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status = quizzes.start(auth.user_id, req.category.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(status)))
}

/// Current question, countdown and score.
pub async fn current_quiz(
    State(quizzes): State<QuizEngine>,
    Extension(auth): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(quizzes.status(auth.user_id)?))
}

pub async fn answer_question(
    State(quizzes): State<QuizEngine>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(quizzes.answer(auth.user_id, req.choice).await?))
}

/// Advances to the next question, or finishes the attempt after the last one.
pub async fn next_question(
    State(quizzes): State<QuizEngine>,
    Extension(auth): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(quizzes.next(auth.user_id).await?))
}

pub async fn abandon_quiz(
    State(quizzes): State<QuizEngine>,
    Extension(auth): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    if !quizzes.abandon(auth.user_id) {
        return Err(AppError::NotFound("No quiz in progress".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
