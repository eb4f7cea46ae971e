//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the storage ports. All tables sit behind
//! one async mutex; multi-step writes run against a staged copy that only
//! replaces the live tables once every step has succeeded.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use lireon_core::domain::{
    Book, BookStatus, BookUpdate, Goals, NewBook, PageLog, Preference, ReadingSession, User,
};
use lireon_core::ports::{DatabaseService, PortError, PortResult, PreferenceStore};
use lireon_core::progress;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    books: HashMap<Uuid, Book>,
    sessions: Vec<ReadingSession>,
    preferences: HashSet<(Uuid, Preference)>,
}

impl Tables {
    fn owned_book(&self, user_id: Uuid, book_id: Uuid) -> PortResult<&Book> {
        self.books
            .get(&book_id)
            .filter(|book| book.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatabaseService for MemoryStore {
    async fn create_user(&self, display_name: &str, goals: Goals) -> PortResult<User> {
        let user = User {
            user_id: Uuid::new_v4(),
            display_name: display_name.to_string(),
            total_pages_read: 0,
            goals,
            created_at: Utc::now(),
        };
        self.tables
            .lock()
            .await
            .users
            .insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        self.tables
            .lock()
            .await
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn list_books(&self, user_id: Uuid) -> PortResult<Vec<Book>> {
        let tables = self.tables.lock().await;
        let mut books: Vec<Book> = tables
            .books
            .values()
            .filter(|book| book.user_id == user_id)
            .cloned()
            .collect();
        books.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(books)
    }

    async fn get_book(&self, user_id: Uuid, book_id: Uuid) -> PortResult<Book> {
        self.tables
            .lock()
            .await
            .owned_book(user_id, book_id)
            .cloned()
    }

    async fn create_book(&self, user_id: Uuid, new_book: NewBook) -> PortResult<Book> {
        let new_book = progress::validate_new_book(new_book)?;
        let now = Utc::now();
        let book = Book {
            id: Uuid::new_v4(),
            user_id,
            title: new_book.title,
            author: new_book.author,
            total_pages: new_book.total_pages,
            current_page: 0,
            status: BookStatus::ToRead,
            rating: None,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().await.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update_book(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        update: BookUpdate,
    ) -> PortResult<Book> {
        let mut tables = self.tables.lock().await;
        let mut next = progress::apply_update(tables.owned_book(user_id, book_id)?, update)?;
        next.updated_at = Utc::now();
        tables.books.insert(book_id, next.clone());
        Ok(next)
    }

    async fn delete_book(&self, user_id: Uuid, book_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.lock().await;
        tables.owned_book(user_id, book_id)?;
        tables
            .sessions
            .retain(|session| !(session.user_id == user_id && session.book_id == Some(book_id)));
        tables.books.remove(&book_id);
        Ok(())
    }

    async fn list_sessions(&self, user_id: Uuid) -> PortResult<Vec<ReadingSession>> {
        let tables = self.tables.lock().await;
        let mut sessions: Vec<ReadingSession> = tables
            .sessions
            .iter()
            .filter(|session| session.user_id == user_id)
            .map(|session| {
                let mut session = session.clone();
                if let Some(book) = session.book_id.and_then(|id| tables.books.get(&id)) {
                    session.book_title = Some(book.title.clone());
                }
                session
            })
            .collect();
        sessions.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(sessions)
    }

    async fn find_session(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        day: NaiveDate,
    ) -> PortResult<Option<ReadingSession>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .sessions
            .iter()
            .find(|s| s.user_id == user_id && s.book_id == Some(book_id) && s.date == day)
            .cloned())
    }

    async fn log_pages(&self, log: PageLog) -> PortResult<Book> {
        let mut tables = self.tables.lock().await;
        let mut staged = tables.clone();

        let book = staged.owned_book(log.user_id, log.book_id)?.clone();

        // 1. Session upsert.
        match staged.sessions.iter_mut().find(|s| {
            s.user_id == log.user_id && s.book_id == Some(log.book_id) && s.date == log.day
        }) {
            Some(session) => {
                session.pages_read = session.pages_read.saturating_add(log.pages);
                session.minutes = match (session.minutes, log.minutes) {
                    (Some(a), Some(b)) => Some(a.saturating_add(b)),
                    (a, b) => a.or(b),
                };
            }
            None => staged.sessions.push(ReadingSession {
                id: Uuid::new_v4(),
                user_id: log.user_id,
                book_id: Some(log.book_id),
                book_title: Some(book.title.clone()),
                date: log.day,
                pages_read: log.pages,
                minutes: log.minutes,
            }),
        }

        // 2. Book progress.
        let mut advanced = progress::advance(&book, log.pages);
        advanced.updated_at = Utc::now();
        staged.books.insert(advanced.id, advanced.clone());

        // 3. Lifetime total.
        let user = staged.users.get_mut(&log.user_id).ok_or_else(|| {
            PortError::Unexpected(format!("User {} not found while logging pages", log.user_id))
        })?;
        user.total_pages_read = user.total_pages_read.saturating_add(u64::from(log.pages));

        *tables = staged;
        Ok(advanced)
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn get_preference(&self, user_id: Uuid, preference: Preference) -> PortResult<bool> {
        Ok(self
            .tables
            .lock()
            .await
            .preferences
            .contains(&(user_id, preference)))
    }

    async fn set_preference(
        &self,
        user_id: Uuid,
        preference: Preference,
        value: bool,
    ) -> PortResult<()> {
        let mut tables = self.tables.lock().await;
        if value {
            tables.preferences.insert((user_id, preference));
        } else {
            tables.preferences.remove(&(user_id, preference));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lireon_core::{stats, ReadingLog};
    use std::sync::Arc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 18).unwrap()
    }

    async fn setup() -> (Arc<MemoryStore>, ReadingLog, User) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user("Ada", Goals::default())
            .await
            .unwrap();
        let log = ReadingLog::new(store.clone());
        (store, log, user)
    }

    /// Drops the user row but keeps the books and sessions pointing at it.
    async fn remove_user(store: &MemoryStore, user_id: Uuid) {
        store.tables.lock().await.users.remove(&user_id);
    }

    async fn add_book(store: &MemoryStore, user: &User, total: u32) -> Book {
        store
            .create_book(
                user.user_id,
                NewBook {
                    title: "Middlemarch".to_string(),
                    author: "George Eliot".to_string(),
                    total_pages: total,
                },
            )
            .await
            .unwrap()
    }

    async fn set_progress(store: &MemoryStore, user: &User, book: &Book, page: u32) -> Book {
        store
            .update_book(
                user.user_id,
                book.id,
                BookUpdate {
                    current_page: Some(page),
                    status: Some(BookStatus::Reading),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn same_day_logs_share_one_session() {
        let (store, log, user) = setup().await;
        let book = add_book(&store, &user, 400).await;

        log.log_pages(user.user_id, book.id, 12, None, today()).await.unwrap();
        log.log_pages(user.user_id, book.id, 8, Some(20), today()).await.unwrap();

        let sessions = store.list_sessions(user.user_id).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].pages_read, 20);
        assert_eq!(sessions[0].minutes, Some(20));

        let found = store
            .find_session(user.user_id, book.id, today())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, sessions[0].id);
    }

    #[tokio::test]
    async fn a_new_day_opens_a_new_session() {
        let (store, log, user) = setup().await;
        let book = add_book(&store, &user, 400).await;

        log.log_pages(user.user_id, book.id, 10, None, today() - Duration::days(1))
            .await
            .unwrap();
        log.log_pages(user.user_id, book.id, 10, None, today()).await.unwrap();

        let sessions = store.list_sessions(user.user_id).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(stats::compute_streak(&sessions, today()), 2);
    }

    #[tokio::test]
    async fn overshoot_caps_book_but_credits_user_in_full() {
        let (store, log, user) = setup().await;
        let book = add_book(&store, &user, 100).await;
        set_progress(&store, &user, &book, 90).await;

        let updated = log.log_pages(user.user_id, book.id, 15, None, today()).await.unwrap();
        assert_eq!(updated.current_page, 100);
        assert_eq!(updated.status, BookStatus::Completed);

        let user = store.get_user(user.user_id).await.unwrap();
        assert_eq!(user.total_pages_read, 15);
    }

    #[tokio::test]
    async fn logging_does_not_start_an_unread_book() {
        let (store, log, user) = setup().await;
        let book = add_book(&store, &user, 300).await;
        assert_eq!(book.status, BookStatus::ToRead);

        let updated = log.log_pages(user.user_id, book.id, 30, None, today()).await.unwrap();
        assert_eq!(updated.current_page, 30);
        assert_eq!(updated.status, BookStatus::ToRead);

        let finished = log.log_pages(user.user_id, book.id, 300, None, today()).await.unwrap();
        assert_eq!(finished.status, BookStatus::Completed);
    }

    #[tokio::test]
    async fn non_positive_pages_write_nothing() {
        let (store, log, user) = setup().await;
        let book = add_book(&store, &user, 100).await;

        for pages in [0, -5] {
            let err = log
                .log_pages(user.user_id, book.id, pages, None, today())
                .await
                .unwrap_err();
            assert!(matches!(err, PortError::Validation(_)));
        }
        let err = log
            .log_pages(user.user_id, book.id, 5, Some(-1), today())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));

        assert!(store.list_sessions(user.user_id).await.unwrap().is_empty());
        assert_eq!(store.get_book(user.user_id, book.id).await.unwrap(), book);
        assert_eq!(store.get_user(user.user_id).await.unwrap().total_pages_read, 0);
    }

    #[tokio::test]
    async fn foreign_book_is_not_found_and_untouched() {
        let (store, log, owner) = setup().await;
        let intruder = store.create_user("Mallory", Goals::default()).await.unwrap();
        let book = add_book(&store, &owner, 100).await;

        let err = log
            .log_pages(intruder.user_id, book.id, 10, None, today())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));

        let err = log
            .log_pages(owner.user_id, Uuid::new_v4(), 10, None, today())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));

        assert!(store.list_sessions(intruder.user_id).await.unwrap().is_empty());
        assert!(store.list_sessions(owner.user_id).await.unwrap().is_empty());
        assert_eq!(store.get_book(owner.user_id, book.id).await.unwrap(), book);
        assert_eq!(store.get_user(intruder.user_id).await.unwrap().total_pages_read, 0);
    }

    #[tokio::test]
    async fn failure_in_last_step_rolls_back_everything() {
        let (store, log, user) = setup().await;
        let book = add_book(&store, &user, 100).await;
        remove_user(&store, user.user_id).await;

        let err = log
            .log_pages(user.user_id, book.id, 10, None, today())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));

        assert!(store.list_sessions(user.user_id).await.unwrap().is_empty());
        let unchanged = store.get_book(user.user_id, book.id).await.unwrap();
        assert_eq!(unchanged.current_page, 0);
    }

    #[tokio::test]
    async fn delete_book_removes_sessions_but_keeps_credit() {
        let (store, log, user) = setup().await;
        let kept = add_book(&store, &user, 500).await;
        let dropped = add_book(&store, &user, 500).await;

        log.log_pages(user.user_id, kept.id, 10, None, today()).await.unwrap();
        log.log_pages(user.user_id, dropped.id, 40, None, today()).await.unwrap();
        log.log_pages(user.user_id, dropped.id, 5, None, today() - Duration::days(1))
            .await
            .unwrap();

        assert!(log.delete_book(user.user_id, dropped.id).await.unwrap());

        let sessions = store.list_sessions(user.user_id).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].book_id, Some(kept.id));
        assert_eq!(stats::aggregate_pages(&sessions, today()).today, 10);
        assert_eq!(stats::compute_streak(&sessions, today()), 1);

        let err = store.get_book(user.user_id, dropped.id).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
        assert_eq!(store.get_user(user.user_id).await.unwrap().total_pages_read, 55);
    }

    #[tokio::test]
    async fn delete_foreign_book_is_not_found() {
        let (store, log, owner) = setup().await;
        let other = store.create_user("Grace", Goals::default()).await.unwrap();
        let book = add_book(&store, &owner, 100).await;

        let err = log.delete_book(other.user_id, book.id).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
        assert!(store.get_book(owner.user_id, book.id).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_logs_do_not_duplicate_sessions() {
        let (store, log, user) = setup().await;
        let book = add_book(&store, &user, 10_000).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let log = log.clone();
            let (user_id, book_id) = (user.user_id, book.id);
            handles.push(tokio::spawn(async move {
                log.log_pages(user_id, book_id, 3, None, today()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let sessions = store.list_sessions(user.user_id).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].pages_read, 48);
        assert_eq!(store.get_user(user.user_id).await.unwrap().total_pages_read, 48);
    }

    #[tokio::test]
    async fn preferences_default_to_false() {
        let (store, _, user) = setup().await;
        assert!(!store.get_preference(user.user_id, Preference::TutorialSeen).await.unwrap());

        store
            .set_preference(user.user_id, Preference::TutorialSeen, true)
            .await
            .unwrap();
        assert!(store.get_preference(user.user_id, Preference::TutorialSeen).await.unwrap());
        assert!(!store
            .get_preference(user.user_id, Preference::WelcomeDismissed)
            .await
            .unwrap());
    }
}
