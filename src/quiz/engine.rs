// src/quiz/engine.rs

use std::{
    collections::HashMap,
    ops::ControlFlow,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use serde::Serialize;
use tokio::time::Instant;

use crate::{
    config::QuizSettings,
    error::AppError,
    models::{attempt::NewAnswer, question::PublicQuestion},
    quiz::{
        provider::QuestionProvider,
        stepper::{Advance, QuestionStepper, Resolution, StepperState},
        ticker::Ticker,
    },
    recorder::Recorder,
};

type ActiveQuizzes = Mutex<HashMap<i64, ActiveQuiz>>;

/// One in-progress quiz. Dropping it cancels its countdown.
struct ActiveQuiz {
    attempt_id: i64,
    stepper: QuestionStepper,
    started: Instant,
    ticker: Option<Ticker>,
}

/// Snapshot of a user's quiz for the client.
#[derive(Debug, Clone, Serialize)]
pub struct QuizStatus {
    pub attempt_id: i64,
    pub state: StepperState,
    pub category: Option<String>,
    /// 1-based number of the current question.
    pub question_number: u32,
    pub question_count: u32,
    pub remaining_seconds: u32,
    pub score: u32,
    pub question: Option<PublicQuestion>,
    /// Set once the current question is answered or expired.
    pub resolution: Option<ResolutionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolutionView {
    pub order: u32,
    pub user_answer: Option<String>,
    pub correct_answer: Option<String>,
    pub correct: bool,
    pub expired: bool,
}

#[derive(Debug, Serialize)]
pub struct AnswerOutcome {
    /// `false` when the selection was ignored (already resolved or timed out).
    pub accepted: bool,
    /// Whether the answer reached the record store.
    pub persisted: bool,
    pub status: QuizStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizResult {
    pub attempt_id: i64,
    pub score: u32,
    pub total: u32,
    pub duration_seconds: u64,
    pub persisted: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NextOutcome {
    Question(QuizStatus),
    Finished(QuizResult),
}

enum Step {
    Load { attempt_id: i64, generation: u64 },
    Finish { attempt_id: i64, score: u32, total: u32, duration_seconds: u64 },
}

/// Runs quizzes: one per user, each driven by its own countdown ticker.
///
/// Question loads carry the generation issued by the stepper, and are only
/// applied if the same attempt is still active and that generation is still
/// current. Every resolution goes to the [`Recorder`].
#[derive(Clone)]
pub struct QuizEngine {
    provider: Arc<dyn QuestionProvider>,
    recorder: Recorder,
    settings: QuizSettings,
    active: Arc<ActiveQuizzes>,
}

impl QuizEngine {
    pub fn new(provider: Arc<dyn QuestionProvider>, recorder: Recorder, settings: QuizSettings) -> Self {
        Self {
            provider,
            recorder,
            settings,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn provider(&self) -> &Arc<dyn QuestionProvider> {
        &self.provider
    }

    /// Starts a new quiz for the user, replacing any quiz already running.
    pub async fn start(&self, user_id: i64, category: Option<&str>) -> Result<QuizStatus, AppError> {
        let mut stepper = QuestionStepper::new(self.settings.question_count, self.settings.question_seconds);
        let generation = stepper.start(category)?;
        let category = stepper.category().unwrap_or_default().to_string();

        if self.abandon(user_id) {
            tracing::info!("User {} restarted, previous quiz abandoned", user_id);
        }

        // The attempt must exist before the first question is requested.
        let attempt_id = self.recorder.begin_attempt(user_id, &category).await?;

        lock(&self.active).insert(
            user_id,
            ActiveQuiz {
                attempt_id,
                stepper,
                started: Instant::now(),
                ticker: None,
            },
        );
        tracing::info!("User {} started attempt {} ({})", user_id, attempt_id, category);

        self.load(user_id, attempt_id, generation).await
    }

    pub fn status(&self, user_id: i64) -> Result<QuizStatus, AppError> {
        let guard = lock(&self.active);
        let quiz = guard.get(&user_id).ok_or_else(no_quiz)?;
        Ok(status_of(quiz))
    }

    /// Selects an option of the question on screen.
    pub async fn answer(&self, user_id: i64, choice: usize) -> Result<AnswerOutcome, AppError> {
        let (attempt_id, resolution, status) = {
            let mut guard = lock(&self.active);
            let quiz = guard.get_mut(&user_id).ok_or_else(no_quiz)?;
            let resolution = quiz.stepper.on_answer_selected(choice)?;
            if resolution.is_some() {
                if let Some(ticker) = quiz.ticker.take() {
                    ticker.cancel();
                }
            }
            (quiz.attempt_id, resolution, status_of(quiz))
        };

        let Some(resolution) = resolution else {
            tracing::debug!("Ignored answer from user {} in state {:?}", user_id, status.state);
            return Ok(AnswerOutcome {
                accepted: false,
                persisted: false,
                status,
            });
        };

        let persisted = persist(&self.recorder, attempt_id, &resolution).await;
        Ok(AnswerOutcome {
            accepted: true,
            persisted,
            status,
        })
    }

    /// Moves past a resolved question, or retries a question load that failed.
    ///
    /// The resolved question is written before the stepper advances, so a
    /// finalized attempt always has every answer row, including expiries
    /// whose background write has not landed yet.
    pub async fn next(&self, user_id: i64) -> Result<NextOutcome, AppError> {
        let pending = {
            let guard = lock(&self.active);
            let quiz = guard.get(&user_id).ok_or_else(no_quiz)?;
            match quiz.stepper.state() {
                StepperState::Answered | StepperState::Expired => quiz
                    .stepper
                    .last_resolution()
                    .cloned()
                    .map(|resolution| (quiz.attempt_id, resolution)),
                _ => None,
            }
        };
        if let Some((attempt_id, resolution)) = &pending {
            persist(&self.recorder, *attempt_id, resolution).await;
        }

        let step = {
            let mut guard = lock(&self.active);
            let quiz = guard.get_mut(&user_id).ok_or_else(no_quiz)?;
            let attempt_id = quiz.attempt_id;
            if pending.as_ref().is_some_and(|(pending_id, _)| *pending_id != attempt_id) {
                return Err(AppError::Conflict("Quiz was restarted or abandoned".to_string()));
            }

            if quiz.stepper.state() == StepperState::Loading {
                Step::Load {
                    attempt_id,
                    generation: quiz.stepper.reload()?,
                }
            } else {
                match quiz.stepper.advance()? {
                    Advance::Next { generation } => Step::Load { attempt_id, generation },
                    Advance::Finished { score, total } => {
                        let duration_seconds = quiz.started.elapsed().as_secs();
                        guard.remove(&user_id);
                        Step::Finish {
                            attempt_id,
                            score,
                            total,
                            duration_seconds,
                        }
                    }
                }
            }
        };

        match step {
            Step::Load { attempt_id, generation } => {
                Ok(NextOutcome::Question(self.load(user_id, attempt_id, generation).await?))
            }
            Step::Finish {
                attempt_id,
                score,
                total,
                duration_seconds,
            } => {
                let persisted = match self
                    .recorder
                    .finalize_attempt(attempt_id, score, total, duration_seconds)
                    .await
                {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::error!("Failed to finalize attempt {}: {}", attempt_id, e);
                        false
                    }
                };

                Ok(NextOutcome::Finished(QuizResult {
                    attempt_id,
                    score,
                    total,
                    duration_seconds,
                    persisted,
                }))
            }
        }
    }

    /// Drops the user's quiz and stops its countdown. Returns `false` if none was running.
    pub fn abandon(&self, user_id: i64) -> bool {
        let removed = lock(&self.active).remove(&user_id);
        match removed {
            Some(quiz) => {
                tracing::debug!("Attempt {} of user {} abandoned", quiz.attempt_id, user_id);
                true
            }
            None => false,
        }
    }

    async fn load(&self, user_id: i64, attempt_id: i64, generation: u64) -> Result<QuizStatus, AppError> {
        let category = {
            let guard = lock(&self.active);
            let quiz = guard
                .get(&user_id)
                .filter(|q| q.attempt_id == attempt_id)
                .ok_or_else(no_quiz)?;
            quiz.stepper.category().map(str::to_string)
        };

        let question = self
            .provider
            .fetch_question(category.as_deref())
            .await
            .inspect_err(|e| {
                tracing::warn!("Question fetch for attempt {} failed: {}", attempt_id, e);
            })?;

        let mut guard = lock(&self.active);
        let Some(quiz) = guard
            .get_mut(&user_id)
            .filter(|q| q.attempt_id == attempt_id)
        else {
            tracing::debug!("Discarding question for attempt {}: no longer active", attempt_id);
            return Err(AppError::Conflict("Quiz was restarted or abandoned".to_string()));
        };

        if !quiz.stepper.on_question_loaded(generation, question) {
            tracing::debug!(
                "Discarding stale question (generation {}, current {})",
                generation,
                quiz.stepper.generation()
            );
            return Err(AppError::Conflict(
                "A newer question request replaced this one".to_string(),
            ));
        }

        // Replacing the handle cancels any previous countdown.
        quiz.ticker = Some(self.spawn_ticker(user_id, attempt_id, generation));
        Ok(status_of(quiz))
    }

    fn spawn_ticker(&self, user_id: i64, attempt_id: i64, generation: u64) -> Ticker {
        let active: Weak<ActiveQuizzes> = Arc::downgrade(&self.active);
        let recorder = self.recorder.clone();

        Ticker::spawn(self.settings.tick_period, move || {
            let Some(active) = active.upgrade() else {
                return ControlFlow::Break(());
            };
            let mut guard = lock(&active);
            let Some(quiz) = guard.get_mut(&user_id).filter(|q| {
                q.attempt_id == attempt_id
                    && q.stepper.generation() == generation
                    && q.stepper.state() == StepperState::Presenting
            }) else {
                return ControlFlow::Break(());
            };

            let Some(resolution) = quiz.stepper.on_tick() else {
                return ControlFlow::Continue(());
            };

            tracing::debug!(
                "Question {} of attempt {} expired unanswered",
                resolution.order,
                attempt_id
            );
            let recorder = recorder.clone();
            tokio::spawn(async move {
                persist(&recorder, attempt_id, &resolution).await;
            });
            ControlFlow::Break(())
        })
    }
}

fn lock(active: &ActiveQuizzes) -> MutexGuard<'_, HashMap<i64, ActiveQuiz>> {
    active.lock().unwrap_or_else(PoisonError::into_inner)
}

fn no_quiz() -> AppError {
    AppError::NotFound("No quiz in progress".to_string())
}

fn status_of(quiz: &ActiveQuiz) -> QuizStatus {
    let stepper = &quiz.stepper;
    QuizStatus {
        attempt_id: quiz.attempt_id,
        state: stepper.state(),
        category: stepper.category().map(str::to_string),
        question_number: stepper.question_number(),
        question_count: stepper.question_count(),
        remaining_seconds: stepper.remaining(),
        score: stepper.score(),
        question: stepper.current_question().map(PublicQuestion::from),
        resolution: stepper.last_resolution().map(|r| ResolutionView {
            order: r.order,
            user_answer: r.user_answer.clone(),
            correct_answer: r.question.correct_answer().map(str::to_string),
            correct: r.correct,
            expired: r.expired(),
        }),
    }
}

/// Best-effort write of one resolution; failures are logged, not propagated.
async fn persist(recorder: &Recorder, attempt_id: i64, resolution: &Resolution) -> bool {
    let answer = NewAnswer {
        question_text: resolution.question.text.clone(),
        options: resolution.question.option_contents(),
        correct_answer: resolution
            .question
            .correct_answer()
            .unwrap_or_default()
            .to_string(),
        user_answer: resolution.user_answer.clone(),
        order: i64::from(resolution.order),
        category: Some(resolution.category.clone()),
    };

    match recorder.record_answer(attempt_id, &answer).await {
        Ok(_) => true,
        Err(e) => {
            tracing::error!(
                "Failed to record answer {} of attempt {}: {}",
                resolution.order,
                attempt_id,
                e
            );
            false
        }
    }
}
