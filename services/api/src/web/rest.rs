//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the book and reading-session endpoints and
//! the master definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::protocol::{
    BookResponse, BookStatusDto, CreateBookRequest, CreateUserRequest, DeleteBookResponse,
    LogPagesRequest, LogPagesResponse, PreferencesResponse, SessionResponse, UpdateBookRequest,
    UpdatePreferencesRequest, UserResponse,
};
use crate::web::state::{caller_today, AppState};
use crate::web::stats::{GoalsResponse, HeatDay, HeatMapResponse, PeriodResponse, StatsResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use lireon_core::domain::NewBook;
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_books_handler,
        create_book_handler,
        get_book_handler,
        update_book_handler,
        delete_book_handler,
        list_sessions_handler,
        log_pages_handler,
        crate::web::stats::stats_handler,
        crate::web::users::create_user_handler,
        crate::web::users::me_handler,
        crate::web::users::get_preferences_handler,
        crate::web::users::update_preferences_handler,
    ),
    components(
        schemas(
            BookResponse, BookStatusDto, CreateBookRequest, UpdateBookRequest, DeleteBookResponse,
            LogPagesRequest, LogPagesResponse, SessionResponse, CreateUserRequest, UserResponse,
            PreferencesResponse, UpdatePreferencesRequest, StatsResponse, GoalsResponse,
            PeriodResponse, HeatMapResponse, HeatDay
        )
    ),
    tags(
        (name = "Lireon API", description = "Books, reading logs and reading statistics.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Book Handlers
//=========================================================================================

/// List the caller's books, most recently updated first.
#[utoipa::path(
    get,
    path = "/books",
    responses(
        (status = 200, description = "The caller's books", body = [BookResponse]),
        (status = 401, description = "Missing or unknown x-user-id")
    ),
    params(("x-user-id" = Uuid, Header, description = "The unique ID of the user."))
)]
pub async fn list_books_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let books = state.db.list_books(user_id).await?;
    info!("Fetched {} books for user {}", books.len(), user_id);
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// Add a book to the caller's shelf. New books start as `to-read` on page 0.
#[utoipa::path(
    post,
    path = "/books",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 400, description = "Missing title/author or zero pages")
    ),
    params(("x-user-id" = Uuid, Header, description = "The unique ID of the user."))
)]
pub async fn create_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateBookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let book = state
        .db
        .create_book(
            user_id,
            NewBook {
                title: req.title,
                author: req.author,
                total_pages: req.total_pages,
            },
        )
        .await?;
    info!("Book {} created for user {}", book.id, user_id);
    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

#[utoipa::path(
    get,
    path = "/books/{id}",
    responses(
        (status = 200, description = "The book", body = BookResponse),
        (status = 404, description = "No such book for this user")
    ),
    params(
        ("id" = Uuid, Path, description = "Book id"),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn get_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = state.db.get_book(user_id, book_id).await?;
    Ok(Json(book.into()))
}

/// Edit a book. Only the fields present in the body change.
#[utoipa::path(
    patch,
    path = "/books/{id}",
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Updated book", body = BookResponse),
        (status = 400, description = "Edit would break a book invariant"),
        (status = 404, description = "No such book for this user")
    ),
    params(
        ("id" = Uuid, Path, description = "Book id"),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn update_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<UpdateBookRequest>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = state.db.update_book(user_id, book_id, req.into()).await?;
    info!(
        "Book {} updated for user {} (status {})",
        book.id,
        user_id,
        book.status.as_str()
    );
    Ok(Json(book.into()))
}

/// Delete a book together with its reading sessions.
///
/// Pages already credited to the user's lifetime total are kept.
#[utoipa::path(
    delete,
    path = "/books/{id}",
    responses(
        (status = 200, description = "Book deleted", body = DeleteBookResponse),
        (status = 404, description = "No such book for this user")
    ),
    params(
        ("id" = Uuid, Path, description = "Book id"),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn delete_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<DeleteBookResponse>, ApiError> {
    let deleted = state.reading_log.delete_book(user_id, book_id).await?;
    info!("Book {} deleted for user {}", book_id, user_id);
    Ok(Json(DeleteBookResponse { deleted }))
}

//=========================================================================================
// Reading Session Handlers
//=========================================================================================

/// The caller's reading sessions, newest day first.
#[utoipa::path(
    get,
    path = "/reading-sessions",
    responses((status = 200, description = "Reading sessions", body = [SessionResponse])),
    params(("x-user-id" = Uuid, Header, description = "The unique ID of the user."))
)]
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let sessions = state.db.list_sessions(user_id).await?;
    info!("Fetched {} reading sessions for user {}", sessions.len(), user_id);
    Ok(Json(sessions.into_iter().map(SessionResponse::from).collect()))
}

/// Log pages read today for one book.
///
/// Repeated logs for the same book on the same day add to one session.
/// Not idempotent: resending the request counts the pages again.
#[utoipa::path(
    post,
    path = "/reading-sessions",
    request_body = LogPagesRequest,
    responses(
        (status = 200, description = "Pages logged; the book after the update", body = LogPagesResponse),
        (status = 400, description = "Non-positive page count or bad offset"),
        (status = 404, description = "No such book for this user"),
        (status = 500, description = "The log was rolled back")
    ),
    params(("x-user-id" = Uuid, Header, description = "The unique ID of the user."))
)]
pub async fn log_pages_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<LogPagesRequest>,
) -> Result<Json<LogPagesResponse>, ApiError> {
    let today = caller_today(req.utc_offset_minutes)?;
    let book = state
        .reading_log
        .log_pages(user_id, req.book_id, req.pages_read, req.minutes, today)
        .await?;
    info!(
        "Logged {} pages for book {} on {} (now {}/{})",
        req.pages_read, req.book_id, today, book.current_page, book.total_pages
    );
    Ok(Json(LogPagesResponse { book: book.into() }))
}
