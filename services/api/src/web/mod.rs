pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod stats;
pub mod users;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use middleware::require_user;
pub use rest::ApiDoc;
pub use state::AppState;

/// Builds the full HTTP surface: public and user-scoped API routes plus the
/// Swagger UI. CORS is layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no user header required)
    let public_routes = Router::new().route("/users", post(users::create_user_handler));

    // User-scoped routes
    let protected_routes = Router::new()
        .route("/user/me", get(users::me_handler))
        .route(
            "/user/preferences",
            get(users::get_preferences_handler).patch(users::update_preferences_handler),
        )
        .route(
            "/books",
            get(rest::list_books_handler).post(rest::create_book_handler),
        )
        .route(
            "/books/{id}",
            get(rest::get_book_handler)
                .patch(rest::update_book_handler)
                .delete(rest::delete_book_handler),
        )
        .route(
            "/reading-sessions",
            get(rest::list_sessions_handler).post(rest::log_pages_handler),
        )
        .route("/stats", get(stats::stats_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_user,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
