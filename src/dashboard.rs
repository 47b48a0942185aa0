// src/dashboard.rs

//! Read-only statistics over finished quiz attempts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    config::{DEFAULT_CATEGORY_LABEL, PASSING_RATIO},
    models::{
        attempt::{AttemptView, QuizAttempt},
        session::{Session, SessionView},
    },
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub attempts: u64,
    pub correct: u64,
    pub incorrect: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub attempt_count: u64,
    pub total_correct: u64,
    pub total_questions: u64,
    /// Whole percent of questions answered correctly.
    pub accuracy: u32,
    pub passed_count: u64,
    /// Whole percent of attempts passed.
    pub pass_rate: u32,
    pub total_duration_seconds: u64,
    pub average_duration_seconds: u64,
    pub categories: BTreeMap<String, CategoryStats>,
}

/// An attempt passes when at least half of its questions were answered correctly.
/// Attempts without questions never pass.
pub fn passed(attempt: &QuizAttempt) -> bool {
    attempt.total > 0 && attempt.score as f64 / attempt.total as f64 >= PASSING_RATIO
}

pub fn summarize(attempts: &[QuizAttempt]) -> DashboardSummary {
    let mut summary = DashboardSummary {
        attempt_count: attempts.len() as u64,
        ..DashboardSummary::default()
    };

    for attempt in attempts {
        let score = attempt.score.max(0) as u64;
        let total = attempt.total.max(0) as u64;

        summary.total_correct += score;
        summary.total_questions += total;
        summary.total_duration_seconds += attempt.duration_seconds.max(0) as u64;
        if passed(attempt) {
            summary.passed_count += 1;
        }

        let label = attempt
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY_LABEL);
        let stats = summary.categories.entry(label.to_string()).or_default();
        stats.attempts += 1;
        stats.correct += score;
        stats.total += total;
        stats.incorrect = stats.total.saturating_sub(stats.correct);
    }

    summary.accuracy = percent(summary.total_correct, summary.total_questions);
    summary.pass_rate = percent(summary.passed_count, summary.attempt_count);
    if summary.attempt_count > 0 {
        summary.average_duration_seconds = summary.total_duration_seconds / summary.attempt_count;
    }

    summary
}

/// Seconds a session has lasted: live while it is open, stored once closed.
pub fn live_elapsed(session: &Session, now: DateTime<Utc>) -> i64 {
    match session.end_time {
        None => (now - session.created_at).num_seconds().max(0),
        Some(_) => session.duration_seconds.max(0),
    }
}

/// Formats seconds as `"{minutes}m {seconds}s"`.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}m {}s", seconds / 60, seconds % 60)
}

pub fn attempt_view(attempt: QuizAttempt) -> AttemptView {
    AttemptView {
        passed: passed(&attempt),
        duration_label: format_duration(attempt.duration_seconds),
        attempt,
    }
}

pub fn session_view(session: Session, now: DateTime<Utc>) -> SessionView {
    let elapsed = live_elapsed(&session, now);
    SessionView {
        id: session.id,
        created_at: session.created_at,
        end_time: session.end_time,
        in_progress: session.is_open(),
        elapsed_seconds: elapsed,
        elapsed_label: format_duration(elapsed),
        quiz_count: session.quiz_count,
        quiz_history: session.quiz_history.0,
    }
}

fn percent(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    (100.0 * part as f64 / whole as f64).round() as u32
}
