//! services/api/src/web/protocol.rs
//!
//! Request and response bodies of the REST API, and their conversions from
//! the core domain types. Field names are snake_case on the wire.

use chrono::{DateTime, NaiveDate, Utc};
use lireon_core::domain::{Book, BookStatus, BookUpdate, ReadingSession, User};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Books
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum BookStatusDto {
    ToRead,
    Reading,
    Completed,
}

impl From<BookStatus> for BookStatusDto {
    fn from(status: BookStatus) -> Self {
        match status {
            BookStatus::ToRead => BookStatusDto::ToRead,
            BookStatus::Reading => BookStatusDto::Reading,
            BookStatus::Completed => BookStatusDto::Completed,
        }
    }
}

impl From<BookStatusDto> for BookStatus {
    fn from(status: BookStatusDto) -> Self {
        match status {
            BookStatusDto::ToRead => BookStatus::ToRead,
            BookStatusDto::Reading => BookStatus::Reading,
            BookStatusDto::Completed => BookStatus::Completed,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub total_pages: u32,
    pub current_page: u32,
    pub status: BookStatusDto,
    pub rating: Option<u8>,
    pub progress_percent: u8,
    pub pages_left: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            progress_percent: book.progress_percent(),
            pages_left: book.pages_left(),
            id: book.id,
            title: book.title,
            author: book.author,
            total_pages: book.total_pages,
            current_page: book.current_page,
            status: book.status.into(),
            rating: book.rating,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub total_pages: u32,
}

/// Only the fields present in the body are changed. `"rating": null`
/// clears the rating; leaving `rating` out keeps it.
#[derive(Deserialize, ToSchema)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub total_pages: Option<u32>,
    pub current_page: Option<u32>,
    pub status: Option<BookStatusDto>,
    #[serde(default, deserialize_with = "present_or_null")]
    #[schema(value_type = Option<u8>)]
    pub rating: Option<Option<u8>>,
}

impl From<UpdateBookRequest> for BookUpdate {
    fn from(req: UpdateBookRequest) -> Self {
        BookUpdate {
            title: req.title,
            author: req.author,
            total_pages: req.total_pages,
            current_page: req.current_page,
            status: req.status.map(Into::into),
            rating: req.rating,
        }
    }
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field,
/// which `#[serde(default)]` turns into `None`.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Serialize, ToSchema)]
pub struct DeleteBookResponse {
    pub deleted: bool,
}

//=========================================================================================
// Reading Sessions
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LogPagesRequest {
    pub book_id: Uuid,
    /// Must be at least 1.
    pub pages_read: i64,
    /// Minutes from the reading timer, if the log came from it.
    pub minutes: Option<i64>,
    /// The caller's offset from UTC in minutes (e.g. `-300` for UTC-5).
    /// Defaults to the server's zone.
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct LogPagesResponse {
    pub book: BookResponse,
}

#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: Uuid,
    pub date: NaiveDate,
    pub pages_read: u32,
    pub minutes: Option<u32>,
    pub book_id: Option<Uuid>,
    pub book_title: Option<String>,
}

impl From<ReadingSession> for SessionResponse {
    fn from(session: ReadingSession) -> Self {
        Self {
            id: session.id,
            date: session.date,
            pages_read: session.pages_read,
            minutes: session.minutes,
            book_id: session.book_id,
            book_title: session.book_title,
        }
    }
}

//=========================================================================================
// Users
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub display_name: String,
    #[serde(default)]
    pub daily_goal: u32,
    #[serde(default)]
    pub weekly_goal: u32,
    #[serde(default)]
    pub monthly_goal: u32,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub display_name: String,
    pub total_pages_read: u64,
    pub daily_goal: u32,
    pub weekly_goal: u32,
    pub monthly_goal: u32,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            display_name: user.display_name,
            total_pages_read: user.total_pages_read,
            daily_goal: user.goals.daily,
            weekly_goal: user.goals.weekly,
            monthly_goal: user.goals.monthly,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PreferencesResponse {
    pub tutorial_seen: bool,
    pub welcome_dismissed: bool,
}

/// Flags left out of the body keep their stored value.
#[derive(Deserialize, ToSchema)]
pub struct UpdatePreferencesRequest {
    pub tutorial_seen: Option<bool>,
    pub welcome_dismissed: Option<bool>,
}
