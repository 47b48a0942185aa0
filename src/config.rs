// src/config.rs

use std::{env, str::FromStr, time::Duration};
use dotenvy::dotenv;

/// Number of questions in one quiz attempt.
pub const DEFAULT_QUESTION_COUNT: u32 = 10;

/// Seconds a question stays open before it expires.
pub const DEFAULT_QUESTION_SECONDS: u32 = 30;

/// An attempt counts as passed at or above this share of correct answers.
pub const PASSING_RATIO: f64 = 0.5;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: u64 = 8;

/// Label used for attempts and answers recorded without a category.
pub const DEFAULT_CATEGORY_LABEL: &str = "Uncategorized";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub question_provider_url: String,
    pub categories_url: String,
    pub question_count: u32,
    pub question_seconds: u32,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://quiz.db".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let question_provider_url = env::var("QUESTION_PROVIDER_URL")
            .expect("QUESTION_PROVIDER_URL must be set");

        let categories_url = env::var("CATEGORIES_URL")
            .expect("CATEGORIES_URL must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration: parse_or("JWT_EXPIRATION", 86_400),
            rust_log,
            question_provider_url,
            categories_url,
            question_count: parse_or("QUESTION_COUNT", DEFAULT_QUESTION_COUNT).max(1),
            question_seconds: parse_or("QUESTION_SECONDS", DEFAULT_QUESTION_SECONDS).max(1),
            port: parse_or("PORT", 3000),
        }
    }

    /// Quiz timing derived from the configuration.
    pub fn quiz_settings(&self) -> QuizSettings {
        QuizSettings {
            question_count: self.question_count,
            question_seconds: self.question_seconds,
            tick_period: Duration::from_secs(1),
        }
    }
}

/// Timing and sizing of a single quiz run.
#[derive(Debug, Clone, Copy)]
pub struct QuizSettings {
    pub question_count: u32,
    pub question_seconds: u32,
    /// Wall-clock length of one countdown unit.
    pub tick_period: Duration,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            question_count: DEFAULT_QUESTION_COUNT,
            question_seconds: DEFAULT_QUESTION_SECONDS,
            tick_period: Duration::from_secs(1),
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}
