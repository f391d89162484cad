pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/auth/signup", post(handlers::auth::signup))
        .route("/api/auth/signin", post(handlers::auth::signin))
        .route("/api/auth/signout", post(handlers::auth::signout))
        .route("/api/auth/session", get(handlers::auth::current_session))
        .route("/api/auth/password-reset", post(handlers::auth::password_reset))
        .route(
            "/api/profile",
            get(handlers::profile::get_profile).patch(handlers::profile::update_profile),
        )
        .route(
            "/api/services",
            get(handlers::services::list_services)
                .post(handlers::services::create_service)
                .put(handlers::services::update_service)
                .delete(handlers::services::delete_service),
        )
        .route(
            "/api/services/public",
            get(handlers::services::list_public_services),
        )
        .route("/api/services/:id", get(handlers::services::get_service))
        .route(
            "/api/services/:id/image",
            post(handlers::services::create_image_upload),
        )
        .route(
            "/api/bookings",
            get(handlers::bookings::list_bookings).post(handlers::bookings::create_booking),
        )
        .route(
            "/api/bookings/:id",
            get(handlers::bookings::get_booking).patch(handlers::bookings::update_booking),
        )
        .route(
            "/api/messages",
            get(handlers::messages::list_messages).post(handlers::messages::send_message),
        )
        .route("/api/messages/mark-read", post(handlers::messages::mark_read))
        .route(
            "/api/messages/conversations",
            get(handlers::messages::list_conversations),
        )
        .route(
            "/api/payments/create-intent",
            post(handlers::payments::create_intent),
        )
        .route(
            "/api/payments/confirm",
            post(handlers::payments::confirm_payment),
        )
        .route(
            "/api/payments/webhook",
            post(handlers::payments::stripe_webhook),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
