use std::sync::Arc;

use crate::{
    config::Config,
    quiz::{QuestionProvider, QuizEngine},
    recorder::Recorder,
};
use axum::extract::FromRef;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub recorder: Recorder,
    pub quizzes: QuizEngine,
}

impl AppState {
    /// Wires the recorder and quiz engine over a shared pool and question provider.
    pub fn new(pool: SqlitePool, config: Config, provider: Arc<dyn QuestionProvider>) -> Self {
        let recorder = Recorder::new(pool.clone());
        let quizzes = QuizEngine::new(provider, recorder.clone(), config.quiz_settings());
        Self {
            pool,
            config,
            recorder,
            quizzes,
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Recorder {
    fn from_ref(state: &AppState) -> Self {
        state.recorder.clone()
    }
}

impl FromRef<AppState> for QuizEngine {
    fn from_ref(state: &AppState) -> Self {
        state.quizzes.clone()
    }
}
