// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use quiz_backend::{
    config::Config,
    error::AppError,
    models::question::{AnswerOption, Question},
    quiz::QuestionProvider,
    routes,
    state::AppState,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

pub const QUESTION_COUNT: u32 = 3;

/// Provider serving a fixed question whose first option is correct.
pub struct StaticProvider;

#[async_trait]
impl QuestionProvider for StaticProvider {
    async fn fetch_question(&self, category: Option<&str>) -> Result<Question, AppError> {
        Ok(Question {
            text: format!("Which answer is right? ({})", category.unwrap_or("any")),
            options: vec![
                AnswerOption { content: "right".into(), is_correct: true },
                AnswerOption { content: "wrong".into(), is_correct: false },
                AnswerOption { content: "also wrong".into(), is_correct: false },
            ],
        })
    }

    async fn list_categories(&self) -> Result<Vec<String>, AppError> {
        Ok(vec!["Math".into(), "History".into()])
    }
}

/// Provider whose webhook is always down.
pub struct DownProvider;

#[async_trait]
impl QuestionProvider for DownProvider {
    async fn fetch_question(&self, _category: Option<&str>) -> Result<Question, AppError> {
        Err(AppError::Upstream("connection refused".to_string()))
    }

    async fn list_categories(&self) -> Result<Vec<String>, AppError> {
        Err(AppError::Upstream("connection refused".to_string()))
    }
}

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        question_provider_url: "http://127.0.0.1:9/webhook/que".to_string(),
        categories_url: "http://127.0.0.1:9/webhook/categories".to_string(),
        question_count: QUESTION_COUNT,
        question_seconds: 30,
        port: 0,
    }
}

pub async fn test_pool() -> SqlitePool {
    // One long-lived connection keeps the in-memory database alive.
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

/// Spawns the app on a random port for testing.
pub async fn spawn_app(provider: Arc<dyn QuestionProvider>) -> TestApp {
    let pool = test_pool().await;
    let state = AppState::new(pool.clone(), test_config(), provider);
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "password_confirm": password
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Registers a fresh user and returns a bearer token for a new session.
    pub async fn signed_in_user(&self) -> String {
        let email = format!("u_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8]);
        let password = "password123";

        assert_eq!(self.register(&email, password).await.status().as_u16(), 201);

        let body: serde_json::Value = self
            .login(&email, password)
            .await
            .json()
            .await
            .expect("Failed to parse login json");

        body["token"].as_str().expect("Token not found").to_string()
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, path: &str, token: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}
