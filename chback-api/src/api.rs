//! Route table

use crate::handlers::{self, AppState};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Build the router with every endpoint
pub fn build_router(state: AppState) -> Router {
    let v1 = Router::new()
        // Accounts
        .route("/register", get(handlers::register))
        .route("/auth", get(handlers::auth))
        .route("/logout", get(handlers::logout))
        .route("/change_password", get(handlers::change_password))
        .route("/delete", get(handlers::delete))
        .route("/verify_token", get(handlers::verify_token))
        // Rating
        .route("/like", get(handlers::like))
        .route("/dislike", get(handlers::dislike))
        .route("/unlike", get(handlers::unlike))
        .route("/undislike", get(handlers::undislike));

    Router::new()
        .nest("/api/v1", v1)
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
