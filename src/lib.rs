//! REALMS Library Management System
//!
//! A REST JSON backend for a small library: users and privilege levels,
//! cookie sessions, a book catalog, and borrowing with deadlines,
//! extensions and overdue suspension. A typed client and the `realms`
//! command-line front-end live alongside the server.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Sessions
        .route("/login", post(api::auth::login))
        .route("/logout", get(api::auth::logout))
        .route("/status", get(api::auth::status))
        // Catalog
        .route("/books", get(api::books::list_books))
        .route("/books/find", post(api::books::find_books))
        .route("/books/:id", get(api::books::get_book))
        // Logged-in user
        .route("/user/me", get(api::auth::me))
        .route("/user/books", get(api::records::list_borrowed))
        .route(
            "/user/books/:id",
            get(api::records::get_borrowed)
                .post(api::records::borrow_book)
                .patch(api::records::extend_deadline)
                .delete(api::records::return_book),
        )
        .route("/user/overdue", get(api::records::list_overdue))
        .route("/user/history", get(api::records::list_history))
        // Administration
        .route("/admin/books", post(api::books::create_book))
        .route(
            "/admin/books/:id",
            axum::routing::patch(api::books::update_book).delete(api::books::delete_book),
        )
        .route(
            "/admin/users",
            get(api::users::list_users).post(api::users::create_user),
        )
        .route(
            "/admin/users/:id",
            get(api::users::get_user)
                .patch(api::users::update_user)
                .delete(api::users::delete_user),
        )
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
