// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{error::AppError, state::AppState};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// Login session the token was issued for.
    pub sid: i64,
    pub email: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Authenticated caller, injected into request extensions by [`auth_middleware`].
///
/// Handlers receive it explicitly via `Extension<AuthContext>`; there is no
/// ambient auth state anywhere else in the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: i64,
    pub session_id: i64,
    pub email: String,
}

impl TryFrom<Claims> for AuthContext {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;

        Ok(Self {
            user_id,
            session_id: claims.sid,
            email: claims.email,
        })
    }
}

/// Signs a new JWT for the user's login session.
pub fn sign_jwt(
    user_id: i64,
    session_id: i64,
    email: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    // Calculate expiration: current time + expiration_seconds
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        sid: session_id,
        email: email.to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header and checks that the
/// token's session has not been closed by a logout. If both hold, injects an
/// `AuthContext` into the request extensions; otherwise returns 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return Err(AppError::AuthError("Missing bearer token".to_string())),
    };

    let context = AuthContext::try_from(verify_jwt(token, &state.config.jwt_secret)?)?;

    if !session_is_open(&state.pool, &context).await? {
        return Err(AppError::AuthError("Session has ended, please log in again".to_string()));
    }

    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

async fn session_is_open(pool: &SqlitePool, context: &AuthContext) -> Result<bool, AppError> {
    let open: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM sessions WHERE id = ? AND user_id = ? AND end_time IS NULL",
    )
    .bind(context.session_id)
    .bind(context.user_id)
    .fetch_optional(pool)
    .await?;

    Ok(open.is_some())
}
