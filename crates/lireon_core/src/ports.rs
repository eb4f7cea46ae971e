//! crates/lireon_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific storage implementations.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{
    Book, BookUpdate, Goals, NewBook, PageLog, Preference, ReadingSession, User,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The record doesn't exist, or doesn't belong to the requesting user.
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The input was rejected before anything was written.
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistence for users, books and reading sessions.
///
/// Every book and session lookup is scoped by `user_id`; a record owned by
/// someone else is reported as `NotFound`.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn create_user(&self, display_name: &str, goals: Goals) -> PortResult<User>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    // --- Book Management ---
    async fn list_books(&self, user_id: Uuid) -> PortResult<Vec<Book>>;

    async fn get_book(&self, user_id: Uuid, book_id: Uuid) -> PortResult<Book>;

    async fn create_book(&self, user_id: Uuid, new_book: NewBook) -> PortResult<Book>;

    async fn update_book(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        update: BookUpdate,
    ) -> PortResult<Book>;

    /// Removes the book and every session referencing it.
    async fn delete_book(&self, user_id: Uuid, book_id: Uuid) -> PortResult<()>;

    // --- Reading Sessions ---
    async fn list_sessions(&self, user_id: Uuid) -> PortResult<Vec<ReadingSession>>;

    async fn find_session(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        day: NaiveDate,
    ) -> PortResult<Option<ReadingSession>>;

    /// Applies a page log as one atomic unit: upserts the day's session,
    /// advances the book and credits the user's lifetime total.
    /// Returns the book as it stands after the commit.
    async fn log_pages(&self, log: PageLog) -> PortResult<Book>;
}

/// Per-user UI flags (tutorial seen, banners dismissed).
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Unset flags read as `false`.
    async fn get_preference(&self, user_id: Uuid, preference: Preference) -> PortResult<bool>;

    async fn set_preference(
        &self,
        user_id: Uuid,
        preference: Preference,
        value: bool,
    ) -> PortResult<()>;
}
