//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! `DatabaseService` and `PreferenceStore` ports from the core crate. It handles
//! all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use lireon_core::domain::{
    Book, BookStatus, BookUpdate, Goals, NewBook, PageLog, Preference, ReadingSession, User,
};
use lireon_core::ports::{DatabaseService, PortError, PortResult, PreferenceStore};
use lireon_core::progress;
use sqlx::{FromRow, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the storage ports on Postgres.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

const BOOK_COLUMNS: &str =
    "id, user_id, title, author, total_pages, current_page, status, rating, created_at, updated_at";
const USER_COLUMNS: &str =
    "user_id, display_name, total_pages_read, daily_goal, weekly_goal, monthly_goal, created_at";

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn book_not_found(book_id: Uuid) -> PortError {
    PortError::NotFound(format!("Book {} not found", book_id))
}

/// Postgres has no unsigned integers; values beyond `i32::MAX` are refused.
fn to_db_int(field: &str, value: u32) -> PortResult<i32> {
    i32::try_from(value).map_err(|_| PortError::Validation(format!("{} is too large", field)))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    display_name: String,
    total_pages_read: i64,
    daily_goal: i32,
    weekly_goal: i32,
    monthly_goal: i32,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            display_name: self.display_name,
            total_pages_read: self.total_pages_read.max(0) as u64,
            goals: Goals {
                daily: self.daily_goal.max(0) as u32,
                weekly: self.weekly_goal.max(0) as u32,
                monthly: self.monthly_goal.max(0) as u32,
            },
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct BookRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    author: String,
    total_pages: i32,
    current_page: i32,
    status: String,
    rating: Option<i16>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl BookRecord {
    fn to_domain(self) -> PortResult<Book> {
        let status = BookStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("Book {} has unknown status '{}'", self.id, self.status))
        })?;
        Ok(Book {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            author: self.author,
            total_pages: self.total_pages.max(0) as u32,
            current_page: self.current_page.max(0) as u32,
            status,
            rating: self.rating.map(|r| r.clamp(1, 5) as u8),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    user_id: Uuid,
    book_id: Option<Uuid>,
    book_title: Option<String>,
    date: NaiveDate,
    pages_read: i32,
    minutes: Option<i32>,
}
impl SessionRecord {
    fn to_domain(self) -> ReadingSession {
        ReadingSession {
            id: self.id,
            user_id: self.user_id,
            book_id: self.book_id,
            book_title: self.book_title,
            date: self.date,
            pages_read: self.pages_read.max(0) as u32,
            minutes: self.minutes.map(|m| m.max(0) as u32),
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, display_name: &str, goals: Goals) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (user_id, display_name, daily_goal, weekly_goal, monthly_goal) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(display_name)
        .bind(to_db_int("daily goal", goals.daily)?)
        .bind(to_db_int("weekly goal", goals.weekly)?)
        .bind(to_db_int("monthly goal", goals.monthly)?)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.to_domain())
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => unexpected(e),
        })?;

        Ok(record.to_domain())
    }

    async fn list_books(&self, user_id: Uuid) -> PortResult<Vec<Book>> {
        let records = sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE user_id = $1 ORDER BY updated_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(BookRecord::to_domain).collect()
    }

    async fn get_book(&self, user_id: Uuid, book_id: Uuid) -> PortResult<Book> {
        sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1 AND user_id = $2"
        ))
        .bind(book_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| book_not_found(book_id))?
        .to_domain()
    }

    async fn create_book(&self, user_id: Uuid, new_book: NewBook) -> PortResult<Book> {
        let new_book = progress::validate_new_book(new_book)?;
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "INSERT INTO books (id, user_id, title, author, total_pages, current_page, status) \
             VALUES ($1, $2, $3, $4, $5, 0, $6) RETURNING {BOOK_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&new_book.title)
        .bind(&new_book.author)
        .bind(to_db_int("total pages", new_book.total_pages)?)
        .bind(BookStatus::ToRead.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        record.to_domain()
    }

    async fn update_book(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        update: BookUpdate,
    ) -> PortResult<Book> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let current = sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1 AND user_id = $2 FOR UPDATE"
        ))
        .bind(book_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| book_not_found(book_id))?
        .to_domain()?;

        let next = progress::apply_update(&current, update)?;

        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "UPDATE books SET title = $1, author = $2, total_pages = $3, current_page = $4, \
             status = $5, rating = $6, updated_at = now() WHERE id = $7 RETURNING {BOOK_COLUMNS}"
        ))
        .bind(&next.title)
        .bind(&next.author)
        .bind(to_db_int("total pages", next.total_pages)?)
        .bind(to_db_int("current page", next.current_page)?)
        .bind(next.status.as_str())
        .bind(next.rating.map(i16::from))
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }

    async fn delete_book(&self, user_id: Uuid, book_id: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Sessions first; the foreign key cascades too, this keeps the order explicit.
        let sessions = sqlx::query("DELETE FROM reading_sessions WHERE book_id = $1 AND user_id = $2")
            .bind(book_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        let books = sqlx::query("DELETE FROM books WHERE id = $1 AND user_id = $2")
            .bind(book_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        if books.rows_affected() == 0 {
            return Err(book_not_found(book_id));
        }

        tx.commit().await.map_err(unexpected)?;
        info!(
            "Deleted book {} and {} reading sessions",
            book_id,
            sessions.rows_affected()
        );
        Ok(())
    }

    async fn list_sessions(&self, user_id: Uuid) -> PortResult<Vec<ReadingSession>> {
        let records = sqlx::query_as::<_, SessionRecord>(
            "SELECT s.id, s.user_id, s.book_id, COALESCE(b.title, s.book_title) AS book_title, \
             s.date, s.pages_read, s.minutes \
             FROM reading_sessions s LEFT JOIN books b ON b.id = s.book_id \
             WHERE s.user_id = $1 ORDER BY s.date DESC, s.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(SessionRecord::to_domain).collect())
    }

    async fn find_session(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        day: NaiveDate,
    ) -> PortResult<Option<ReadingSession>> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, user_id, book_id, book_title, date, pages_read, minutes \
             FROM reading_sessions WHERE user_id = $1 AND book_id = $2 AND date = $3",
        )
        .bind(user_id)
        .bind(book_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.map(SessionRecord::to_domain))
    }

    async fn log_pages(&self, log: PageLog) -> PortResult<Book> {
        let pages = to_db_int("pages read", log.pages)?;
        let minutes = log
            .minutes
            .map(|m| to_db_int("minutes", m))
            .transpose()?;

        // Dropping `tx` without committing rolls every step back.
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // The row lock serializes concurrent logs against the same book.
        let book = sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1 AND user_id = $2 FOR UPDATE"
        ))
        .bind(log.book_id)
        .bind(log.user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| book_not_found(log.book_id))?
        .to_domain()?;

        // 1. One row per (user, book, day); a repeat log increments it.
        sqlx::query(
            "INSERT INTO reading_sessions (id, user_id, book_id, book_title, date, pages_read, minutes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (user_id, book_id, date) DO UPDATE SET \
             pages_read = reading_sessions.pages_read + EXCLUDED.pages_read, \
             minutes = COALESCE(reading_sessions.minutes + EXCLUDED.minutes, \
                                reading_sessions.minutes, EXCLUDED.minutes)",
        )
        .bind(Uuid::new_v4())
        .bind(log.user_id)
        .bind(log.book_id)
        .bind(&book.title)
        .bind(log.day)
        .bind(pages)
        .bind(minutes)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        // 2. Book progress, capped at the last page.
        let advanced = progress::advance(&book, log.pages);
        let record = sqlx::query_as::<_, BookRecord>(&format!(
            "UPDATE books SET current_page = $1, status = $2, updated_at = now() \
             WHERE id = $3 RETURNING {BOOK_COLUMNS}"
        ))
        .bind(to_db_int("current page", advanced.current_page)?)
        .bind(advanced.status.as_str())
        .bind(book.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        // 3. Lifetime credit uses the raw count, not the capped progress.
        let credited = sqlx::query(
            "UPDATE users SET total_pages_read = total_pages_read + $1 WHERE user_id = $2",
        )
        .bind(i64::from(log.pages))
        .bind(log.user_id)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        if credited.rows_affected() == 0 {
            warn!("User {} vanished while logging pages; rolling back", log.user_id);
            return Err(PortError::Unexpected(format!(
                "User {} not found while logging pages",
                log.user_id
            )));
        }

        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }
}

//=========================================================================================
// `PreferenceStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl PreferenceStore for DbAdapter {
    async fn get_preference(&self, user_id: Uuid, preference: Preference) -> PortResult<bool> {
        let value = sqlx::query_scalar::<_, bool>(
            "SELECT value FROM user_preferences WHERE user_id = $1 AND key = $2",
        )
        .bind(user_id)
        .bind(preference.key())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(value.unwrap_or(false))
    }

    async fn set_preference(
        &self,
        user_id: Uuid,
        preference: Preference,
        value: bool,
    ) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO user_preferences (user_id, key, value) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(user_id)
        .bind(preference.key())
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}
