// src/routes.rs

use axum::{Router, http::Method, routing::get, routing::post};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{attempt, test};
use crate::state::AppState;

/// Assembles the main application router.
///
/// * Test delivery and the attempt endpoints the session core depends on.
/// * Global middleware (Trace, CORS).
/// * Injects global state (database pool + config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let test_routes = Router::new()
        .route("/{test_id}", get(test::get_test))
        .route("/{test_id}/results", get(attempt::test_results));

    let attempt_routes = Router::new()
        .route("/", post(attempt::submit_attempt))
        .route("/{test_id}/{student_id}", get(attempt::check_completion));

    let student_routes = Router::new().route("/{student_id}/attempts", get(attempt::student_attempts));

    Router::new()
        .nest("/api/tests", test_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/students", student_routes)
        // Global middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
