//! crates/lireon_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Page targets a user wants to hit per period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Goals {
    pub daily: u32,
    pub weekly: u32,
    pub monthly: u32,
}

/// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub display_name: String,
    /// Lifetime counter, credited with the raw page count of every log.
    pub total_pages_read: u64,
    pub goals: Goals,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookStatus {
    ToRead,
    Reading,
    Completed,
}

impl BookStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookStatus::ToRead => "to-read",
            BookStatus::Reading => "reading",
            BookStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "to-read" => Some(BookStatus::ToRead),
            "reading" => Some(BookStatus::Reading),
            "completed" => Some(BookStatus::Completed),
            _ => None,
        }
    }
}

/// A book on a user's shelf.
///
/// `current_page` never exceeds `total_pages`, and `rating` is only set
/// while the book is completed.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub author: String,
    pub total_pages: u32,
    pub current_page: u32,
    pub status: BookStatus,
    pub rating: Option<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    pub fn pages_left(&self) -> u32 {
        self.total_pages.saturating_sub(self.current_page)
    }

    /// Whole-number reading progress in `0..=100`.
    pub fn progress_percent(&self) -> u8 {
        if self.total_pages == 0 {
            return 0;
        }
        let percent = u64::from(self.current_page) * 100 / u64::from(self.total_pages);
        percent.min(100) as u8
    }
}

/// One day's recorded reading for one book, by one user.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Option<Uuid>,
    /// Title kept alongside the reference for when the book can't be resolved.
    pub book_title: Option<String>,
    /// Local calendar day the pages were read on.
    pub date: NaiveDate,
    pub pages_read: u32,
    pub minutes: Option<u32>,
}

/// Input for adding a book to a user's shelf.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub total_pages: u32,
}

/// A partial edit of a book. `None` leaves the field untouched.
///
/// `rating` is doubly optional so that a rating can be cleared
/// (`Some(None)`) as well as left alone (`None`).
#[derive(Debug, Clone, Default)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub total_pages: Option<u32>,
    pub current_page: Option<u32>,
    pub status: Option<BookStatus>,
    pub rating: Option<Option<u8>>,
}

/// A validated "read N pages of this book today" event.
#[derive(Debug, Clone, Copy)]
pub struct PageLog {
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub day: NaiveDate,
    pub pages: u32,
    pub minutes: Option<u32>,
}

/// Per-user UI flags that used to live in browser storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preference {
    TutorialSeen,
    WelcomeDismissed,
}

impl Preference {
    pub fn key(self) -> &'static str {
        match self {
            Preference::TutorialSeen => "tutorial_seen",
            Preference::WelcomeDismissed => "welcome_dismissed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(current: u32, total: u32) -> Book {
        Book {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            total_pages: total,
            current_page: current,
            status: BookStatus::Reading,
            rating: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn progress_is_rounded_down() {
        assert_eq!(book(1, 3).progress_percent(), 33);
        assert_eq!(book(3, 3).progress_percent(), 100);
        assert_eq!(book(0, 0).progress_percent(), 0);
    }

    #[test]
    fn status_names_parse_back() {
        for status in [BookStatus::ToRead, BookStatus::Reading, BookStatus::Completed] {
            assert_eq!(BookStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookStatus::parse("abandoned"), None);
    }
}
