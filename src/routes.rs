// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, dashboard, quiz},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, quiz, dashboard).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, recorder, quiz engine).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        // Protected auth routes
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .route("/me", get(auth::me))
                .layer(require_auth.clone()),
        );

    let quiz_routes = Router::new()
        .route("/categories", get(quiz::list_categories))
        // Protected quiz routes
        .merge(
            Router::new()
                .route("/", axum::routing::delete(quiz::abandon_quiz))
                .route("/start", post(quiz::start_quiz))
                .route("/current", get(quiz::current_quiz))
                .route("/answer", post(quiz::answer_question))
                .route("/next", post(quiz::next_question))
                .layer(require_auth.clone()),
        );

    let dashboard_routes = Router::new()
        .route("/", get(dashboard::get_dashboard))
        .route("/results/{id}", get(dashboard::get_attempt))
        .route("/session", get(dashboard::get_session))
        .layer(require_auth);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/dashboard", dashboard_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
