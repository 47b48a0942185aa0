// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, LoginResponse, MeResponse, RegisterRequest, User},
    quiz::QuizEngine,
    recorder::Recorder,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{AuthContext, sign_jwt},
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(pool): State<SqlitePool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();
    let hashed_password = hash_password(&payload.password)?;

    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (email, password, created_at)
        VALUES (?, ?, ?)
        RETURNING id, email, password, created_at
        "#,
    )
    .bind(&email)
    .bind(hashed_password)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        let unique_violation = e
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());
        if unique_violation {
            AppError::Conflict("Email is already in use.".to_string())
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    tracing::info!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user, opens a login session and returns a JWT bound to it.
///
/// The same message is returned for an unknown email and a wrong password.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    State(recorder): State<Recorder>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let invalid = || AppError::AuthError("Invalid email or password.".to_string());

    payload.validate().map_err(|_| invalid())?;

    let user: Option<User> = sqlx::query_as(
        r#"
        SELECT id, email, password, created_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(payload.email.trim().to_lowercase())
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let user = user.ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(invalid());
    }

    let session = recorder.open_session(user.id).await?;

    let token = sign_jwt(
        user.id,
        session.id,
        &user.email,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    tracing::info!("User {} logged in, session {}", user.id, session.id);
    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        user_id: user.id,
        email: user.email,
        session_id: session.id,
    }))
}

/// Ends the caller's session.
///
/// Stops any running quiz first. Closing the session is best-effort: a
/// failed write is logged and the logout still succeeds.
pub async fn logout(
    State(recorder): State<Recorder>,
    State(quizzes): State<QuizEngine>,
    Extension(auth): Extension<AuthContext>,
) -> impl IntoResponse {
    quizzes.abandon(auth.user_id);

    if let Err(e) = recorder.close_session(auth.session_id, Utc::now()).await {
        tracing::error!("Failed to close session {}: {}", auth.session_id, e);
    }

    StatusCode::NO_CONTENT
}

/// Returns the current user and session.
pub async fn me(
    State(pool): State<SqlitePool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    let user: User = sqlx::query_as("SELECT id, email, password, created_at FROM users WHERE id = ?")
        .bind(auth.user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        session_id: auth.session_id,
        created_at: user.created_at,
    }))
}
