//! crates/lireon_core/src/reading_log.rs
//!
//! The entry point for recording reading activity. Input is validated here,
//! before anything reaches storage; the writes themselves happen atomically
//! inside `DatabaseService::log_pages`.

use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Book, PageLog};
use crate::ports::{DatabaseService, PortError, PortResult};

#[derive(Clone)]
pub struct ReadingLog {
    db: Arc<dyn DatabaseService>,
}

impl ReadingLog {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Records that `user_id` read `pages` pages of `book_id` on `today`.
    ///
    /// `today` is the caller's local calendar day. The returned book reflects
    /// the committed progress. Not idempotent: calling it twice counts the
    /// pages twice.
    pub async fn log_pages(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        pages: i64,
        minutes: Option<i64>,
        today: NaiveDate,
    ) -> PortResult<Book> {
        let pages = match u32::try_from(pages) {
            Ok(pages) if pages >= 1 => pages,
            _ => {
                return Err(PortError::Validation(format!(
                    "pages read must be a positive number, got {pages}"
                )))
            }
        };
        let minutes = minutes
            .map(|minutes| {
                u32::try_from(minutes).map_err(|_| {
                    PortError::Validation(format!(
                        "minutes must not be negative, got {minutes}"
                    ))
                })
            })
            .transpose()?;

        self.db
            .log_pages(PageLog {
                user_id,
                book_id,
                day: today,
                pages,
                minutes,
            })
            .await
    }

    /// Deletes a book and its sessions. The user's lifetime page count is
    /// left alone.
    pub async fn delete_book(&self, user_id: Uuid, book_id: Uuid) -> PortResult<bool> {
        // Ownership check up front so a foreign id is a plain NotFound.
        self.db.get_book(user_id, book_id).await?;
        self.db.delete_book(user_id, book_id).await?;
        Ok(true)
    }
}
