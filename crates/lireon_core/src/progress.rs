//! crates/lireon_core/src/progress.rs
//!
//! Rules for how a book's progress, status and rating may change.
//! Adapters call these inside their write paths so every storage backend
//! enforces the same invariants.

use crate::domain::{Book, BookStatus, BookUpdate, NewBook};
use crate::ports::{PortError, PortResult};

/// Moves a book forward by `pages`, capped at its length.
///
/// Reaching the last page completes the book; otherwise the status is left
/// as it was (a `ToRead` book stays `ToRead`).
pub fn advance(book: &Book, pages: u32) -> Book {
    let mut next = book.clone();
    next.current_page = book.current_page.saturating_add(pages).min(book.total_pages);
    if next.current_page >= next.total_pages {
        next.status = BookStatus::Completed;
    }
    next
}

/// Checks and normalizes the fields of a book about to be created.
pub fn validate_new_book(new_book: NewBook) -> PortResult<NewBook> {
    let title = required_text("title", &new_book.title)?;
    let author = required_text("author", &new_book.author)?;
    if new_book.total_pages == 0 {
        return Err(PortError::Validation(
            "total pages must be at least 1".to_string(),
        ));
    }
    Ok(NewBook {
        title,
        author,
        total_pages: new_book.total_pages,
    })
}

/// Applies a partial edit, returning the edited book or why it was refused.
pub fn apply_update(book: &Book, update: BookUpdate) -> PortResult<Book> {
    let mut next = book.clone();

    if let Some(title) = update.title {
        next.title = required_text("title", &title)?;
    }
    if let Some(author) = update.author {
        next.author = required_text("author", &author)?;
    }
    if let Some(total_pages) = update.total_pages {
        if total_pages == 0 {
            return Err(PortError::Validation(
                "total pages must be at least 1".to_string(),
            ));
        }
        next.total_pages = total_pages;
    }
    if let Some(current_page) = update.current_page {
        next.current_page = current_page;
    }
    if next.current_page > next.total_pages {
        return Err(PortError::Validation(format!(
            "current page {} exceeds total pages {}",
            next.current_page, next.total_pages
        )));
    }

    match update.status {
        Some(status) => next.status = status,
        // A book on its last page is finished, whichever field put it there.
        None if next.current_page >= next.total_pages => {
            next.status = BookStatus::Completed;
        }
        None => {}
    }

    match update.rating {
        Some(Some(rating)) => {
            if !(1..=5).contains(&rating) {
                return Err(PortError::Validation(format!(
                    "rating must be between 1 and 5, got {rating}"
                )));
            }
            if next.status != BookStatus::Completed {
                return Err(PortError::Validation(
                    "only completed books can be rated".to_string(),
                ));
            }
            next.rating = Some(rating);
        }
        Some(None) => next.rating = None,
        None => {}
    }
    if next.status != BookStatus::Completed {
        next.rating = None;
    }

    Ok(next)
}

fn required_text(field: &str, value: &str) -> PortResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PortError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn book(current: u32, total: u32, status: BookStatus) -> Book {
        Book {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "The Left Hand of Darkness".to_string(),
            author: "Ursula K. Le Guin".to_string(),
            total_pages: total,
            current_page: current,
            status,
            rating: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn advance_caps_at_total_and_completes() {
        let next = advance(&book(90, 100, BookStatus::Reading), 15);
        assert_eq!(next.current_page, 100);
        assert_eq!(next.status, BookStatus::Completed);
    }

    #[test]
    fn advance_keeps_status_until_finished() {
        let next = advance(&book(0, 300, BookStatus::ToRead), 20);
        assert_eq!(next.current_page, 20);
        assert_eq!(next.status, BookStatus::ToRead);

        let next = advance(&book(10, 300, BookStatus::Reading), 20);
        assert_eq!(next.status, BookStatus::Reading);
    }

    #[test]
    fn advance_never_regresses_completed() {
        let next = advance(&book(100, 100, BookStatus::Completed), 5);
        assert_eq!(next.current_page, 100);
        assert_eq!(next.status, BookStatus::Completed);
    }

    #[test]
    fn new_book_requires_fields() {
        let ok = validate_new_book(NewBook {
            title: "  Piranesi ".to_string(),
            author: "Susanna Clarke".to_string(),
            total_pages: 272,
        })
        .unwrap();
        assert_eq!(ok.title, "Piranesi");

        let err = validate_new_book(NewBook {
            title: " ".to_string(),
            author: "Susanna Clarke".to_string(),
            total_pages: 272,
        })
        .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));

        let err = validate_new_book(NewBook {
            title: "Piranesi".to_string(),
            author: "Susanna Clarke".to_string(),
            total_pages: 0,
        })
        .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
    }

    #[test]
    fn update_rejects_current_past_total() {
        let original = book(50, 100, BookStatus::Reading);
        let err = apply_update(
            &original,
            BookUpdate {
                current_page: Some(120),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));

        let err = apply_update(
            &original,
            BookUpdate {
                total_pages: Some(40),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
    }

    #[test]
    fn update_to_last_page_completes() {
        let next = apply_update(
            &book(50, 100, BookStatus::Reading),
            BookUpdate {
                current_page: Some(100),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(next.status, BookStatus::Completed);
    }

    #[test]
    fn shrinking_total_to_current_page_completes() {
        let next = apply_update(
            &book(50, 100, BookStatus::Reading),
            BookUpdate {
                total_pages: Some(50),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(next.current_page, 50);
        assert_eq!(next.total_pages, 50);
        assert_eq!(next.status, BookStatus::Completed);

        let kept_open = apply_update(
            &book(50, 100, BookStatus::Reading),
            BookUpdate {
                total_pages: Some(50),
                status: Some(BookStatus::Reading),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(kept_open.status, BookStatus::Reading);
    }

    #[test]
    fn rating_needs_completed_book() {
        let reading = book(50, 100, BookStatus::Reading);
        let err = apply_update(
            &reading,
            BookUpdate {
                rating: Some(Some(4)),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));

        let rated = apply_update(
            &reading,
            BookUpdate {
                status: Some(BookStatus::Completed),
                rating: Some(Some(4)),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(rated.rating, Some(4));

        let err = apply_update(
            &rated,
            BookUpdate {
                rating: Some(Some(6)),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
    }

    #[test]
    fn leaving_completed_clears_rating() {
        let mut finished = book(100, 100, BookStatus::Completed);
        finished.rating = Some(5);

        let reopened = apply_update(
            &finished,
            BookUpdate {
                status: Some(BookStatus::Reading),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(reopened.rating, None);
    }
}
