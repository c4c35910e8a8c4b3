//! # survey-api — Axum API Service for the Survey Admin Backend
//!
//! Serves the admin dashboard, the researcher workspace and the public
//! survey-taking page from one router.
//!
//! ## API Surface
//!
//! | Prefix                          | Module                  | Access      |
//! |---------------------------------|-------------------------|-------------|
//! | `/api/summary`, `/api/users/*`, `/api/transactions/*` | [`routes::users`] | admin |
//! | `/api/packages/*`               | [`routes::packages`]    | admin       |
//! | `/api/templates/*`              | [`routes::templates`]   | researcher  |
//! | `/api/surveys/*`                | [`routes::surveys`]     | researcher  |
//! | `/api/surveys/public/*`, `/api/surveys/*/responses` | [`routes::public`] | public |
//! | `/health/*`                     | this module             | public      |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! CorsLayer → TraceLayer → AuthMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated via utoipa derive macros at `/openapi.json`.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Respondent endpoints and health probes are mounted outside the auth
/// middleware so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let api = Router::new()
        .merge(routes::users::router())
        .merge(routes::packages::router())
        .merge(routes::templates::router())
        .merge(routes::surveys::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    let public = routes::public::router().with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .with_state(state);

    Router::new()
        .merge(health)
        .merge(public)
        .merge(api)
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — the database, when configured, answers a trivial
/// query. In-memory mode is always ready.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
