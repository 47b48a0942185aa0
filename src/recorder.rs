// src/recorder.rs

//! Writes quiz attempts, answers and login sessions to the record store.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction, types::Json};

use crate::{
    error::AppError,
    models::{attempt::NewAnswer, session::Session},
};

pub const SESSION_COLUMNS: &str =
    "id, user_id, created_at, end_time, duration, quiz_count, quiz_history";

/// Session/result recorder.
///
/// Every write is keyed so that repeating it is harmless: answers are unique
/// per (attempt, order) and an attempt is finalized at most once.
#[derive(Debug, Clone)]
pub struct Recorder {
    pool: SqlitePool,
}

impl Recorder {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a login session, closing any session of the user still in progress.
    pub async fn open_session(&self, user_id: i64) -> Result<Session, AppError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let still_open: Vec<Session> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = ? AND end_time IS NULL"
        ))
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        for session in &still_open {
            tracing::info!(
                "Closing session {} of user {} before opening a new one",
                session.id,
                user_id
            );
            close_in(&mut tx, session, now).await?;
        }

        let session: Session = sqlx::query_as(&format!(
            "INSERT INTO sessions (user_id, created_at, duration, quiz_count, quiz_history)
             VALUES (?, ?, 0, 0, '[]')
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(user_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(session)
    }

    /// Creates an empty attempt (score 0 of 0) and returns its id.
    pub async fn begin_attempt(&self, user_id: i64, category: &str) -> Result<i64, AppError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO results (user_id, score, total, duration, category, created_at)
             VALUES (?, 0, 0, 0, ?, ?)
             RETURNING id",
        )
        .bind(user_id)
        .bind(category)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Attempt {} started for user {} ({})", id, user_id, category);
        Ok(id)
    }

    /// Stores one resolved question. Returns `false` when that order was already recorded.
    pub async fn record_answer(&self, attempt_id: i64, answer: &NewAnswer) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO user_answers
                (result_id, question_text, options, correct_answer, user_answer, question_order, category, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (result_id, question_order) DO NOTHING",
        )
        .bind(attempt_id)
        .bind(&answer.question_text)
        .bind(Json(&answer.options))
        .bind(&answer.correct_answer)
        .bind(&answer.user_answer)
        .bind(answer.order)
        .bind(&answer.category)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() == 1;
        if !inserted {
            tracing::debug!(
                "Answer {} of attempt {} already recorded, skipping",
                answer.order,
                attempt_id
            );
        }
        Ok(inserted)
    }

    /// Writes the final score of an attempt and links it to the user's latest session.
    ///
    /// Returns `false` when the attempt had already been finalized.
    pub async fn finalize_attempt(
        &self,
        attempt_id: i64,
        score: u32,
        total: u32,
        duration_seconds: u64,
    ) -> Result<bool, AppError> {
        if score > total {
            return Err(AppError::BadRequest(format!(
                "Score {} exceeds total {}",
                score, total
            )));
        }

        let mut tx = self.pool.begin().await?;

        let user_id: Option<i64> = sqlx::query_scalar(
            "UPDATE results
             SET score = ?, total = ?, duration = ?, finished_at = ?
             WHERE id = ? AND finished_at IS NULL
             RETURNING user_id",
        )
        .bind(i64::from(score))
        .bind(i64::from(total))
        .bind(i64::try_from(duration_seconds).unwrap_or(i64::MAX))
        .bind(Utc::now())
        .bind(attempt_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = user_id else {
            let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM results WHERE id = ?")
                .bind(attempt_id)
                .fetch_optional(&mut *tx)
                .await?;

            return match exists {
                Some(_) => {
                    tracing::debug!("Attempt {} already finalized", attempt_id);
                    Ok(false)
                }
                None => Err(AppError::NotFound(format!("Attempt {} not found", attempt_id))),
            };
        };

        append_to_latest_session(&mut tx, user_id, attempt_id).await?;

        tx.commit().await?;
        tracing::info!(
            "Attempt {} finalized: {}/{} in {}s",
            attempt_id,
            score,
            total,
            duration_seconds
        );
        Ok(true)
    }

    /// Ends a session, storing its end time and duration.
    /// Returns `false` if it had already been closed.
    pub async fn close_session(&self, session_id: i64, now: DateTime<Utc>) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let session: Session = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?"
        ))
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {} not found", session_id)))?;

        if !session.is_open() {
            return Ok(false);
        }

        close_in(&mut tx, &session, now).await?;
        tx.commit().await?;
        Ok(true)
    }
}

async fn close_in(
    tx: &mut Transaction<'_, Sqlite>,
    session: &Session,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let duration = (now - session.created_at).num_seconds().max(0);

    sqlx::query("UPDATE sessions SET end_time = ?, duration = ? WHERE id = ? AND end_time IS NULL")
        .bind(now)
        .bind(duration)
        .bind(session.id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

async fn append_to_latest_session(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    attempt_id: i64,
) -> Result<(), AppError> {
    let latest: Option<Session> = sqlx::query_as(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = ? ORDER BY id DESC LIMIT 1"
    ))
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?;

    let Some(session) = latest else {
        tracing::warn!(
            "No session for user {}, attempt {} not added to any quiz history",
            user_id,
            attempt_id
        );
        return Ok(());
    };

    let mut history = session.quiz_history.0;
    if history.contains(&attempt_id) {
        return Ok(());
    }
    history.push(attempt_id);

    sqlx::query("UPDATE sessions SET quiz_history = ?, quiz_count = quiz_count + 1 WHERE id = ?")
        .bind(Json(&history))
        .bind(session.id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    /// Single-connection in-memory database with migrations applied.
    pub(crate) async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to migrate database");

        pool
    }

    pub(crate) async fn insert_user(pool: &SqlitePool, email: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO users (email, password, created_at) VALUES (?, 'hash', ?) RETURNING id",
        )
        .bind(email)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn session(pool: &SqlitePool, id: i64) -> Session {
        sqlx::query_as(&format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?"))
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn answer(order: i64, user_answer: Option<&str>) -> NewAnswer {
        NewAnswer {
            question_text: format!("Question {}", order),
            options: vec!["a".into(), "b".into()],
            correct_answer: "a".into(),
            user_answer: user_answer.map(str::to_string),
            order,
            category: Some("Math".into()),
        }
    }

    #[tokio::test]
    async fn answers_are_deduplicated_by_order() {
        let pool = test_pool().await;
        let recorder = Recorder::new(pool.clone());
        let user = insert_user(&pool, "a@example.com").await;
        let attempt = recorder.begin_attempt(user, "Math").await.unwrap();

        assert!(recorder.record_answer(attempt, &answer(0, Some("a"))).await.unwrap());
        assert!(!recorder.record_answer(attempt, &answer(0, Some("b"))).await.unwrap());
        assert!(recorder.record_answer(attempt, &answer(1, None)).await.unwrap());

        let rows: Vec<(i64, Option<String>)> = sqlx::query_as(
            "SELECT question_order, user_answer FROM user_answers WHERE result_id = ? ORDER BY question_order",
        )
        .bind(attempt)
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(rows, vec![(0, Some("a".to_string())), (1, None)]);
    }

    #[tokio::test]
    async fn finalize_updates_attempt_and_latest_session_once() {
        let pool = test_pool().await;
        let recorder = Recorder::new(pool.clone());
        let user = insert_user(&pool, "b@example.com").await;
        let session_id = recorder.open_session(user).await.unwrap().id;
        let attempt = recorder.begin_attempt(user, "Math").await.unwrap();

        assert!(recorder.finalize_attempt(attempt, 7, 10, 95).await.unwrap());
        assert!(!recorder.finalize_attempt(attempt, 9, 10, 20).await.unwrap());

        let (score, total, duration): (i64, i64, i64) =
            sqlx::query_as("SELECT score, total, duration FROM results WHERE id = ?")
                .bind(attempt)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!((score, total, duration), (7, 10, 95));

        let session = session(&pool, session_id).await;
        assert_eq!(session.quiz_count, 1);
        assert_eq!(session.quiz_history.0, vec![attempt]);
    }

    #[tokio::test]
    async fn finalize_without_session_still_succeeds() {
        let pool = test_pool().await;
        let recorder = Recorder::new(pool.clone());
        let user = insert_user(&pool, "c@example.com").await;
        let attempt = recorder.begin_attempt(user, "Math").await.unwrap();

        assert!(recorder.finalize_attempt(attempt, 3, 5, 40).await.unwrap());
    }

    #[tokio::test]
    async fn finalize_rejects_score_above_total() {
        let pool = test_pool().await;
        let recorder = Recorder::new(pool.clone());
        let user = insert_user(&pool, "d@example.com").await;
        let attempt = recorder.begin_attempt(user, "Math").await.unwrap();

        assert!(matches!(
            recorder.finalize_attempt(attempt, 6, 5, 40).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            recorder.finalize_attempt(attempt + 100, 1, 5, 40).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn opening_a_session_closes_the_previous_one() {
        let pool = test_pool().await;
        let recorder = Recorder::new(pool.clone());
        let user = insert_user(&pool, "e@example.com").await;

        let first = recorder.open_session(user).await.unwrap();
        let second = recorder.open_session(user).await.unwrap();

        assert!(!session(&pool, first.id).await.is_open());
        assert!(session(&pool, second.id).await.is_open());

        let open: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE user_id = ? AND end_time IS NULL")
                .bind(user)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(open, 1);
    }

    #[tokio::test]
    async fn close_session_records_duration_once() {
        let pool = test_pool().await;
        let recorder = Recorder::new(pool.clone());
        let user = insert_user(&pool, "f@example.com").await;
        let opened = recorder.open_session(user).await.unwrap();

        let later = opened.created_at + chrono::Duration::seconds(125);
        assert!(recorder.close_session(opened.id, later).await.unwrap());
        assert!(!recorder.close_session(opened.id, later).await.unwrap());

        let closed = session(&pool, opened.id).await;
        assert_eq!(closed.end_time, Some(later));
        assert_eq!(closed.duration_seconds, 125);
    }
}
