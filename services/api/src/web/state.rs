//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and how handlers work out the
//! caller's calendar day.

use crate::error::ApiError;
use chrono::{FixedOffset, Local, NaiveDate, Utc};
use lireon_core::ports::{DatabaseService, PreferenceStore};
use lireon_core::stats;
use lireon_core::ReadingLog;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub reading_log: ReadingLog,
}

impl AppState {
    pub fn new(db: Arc<dyn DatabaseService>, preferences: Arc<dyn PreferenceStore>) -> Self {
        Self {
            reading_log: ReadingLog::new(db.clone()),
            db,
            preferences,
        }
    }
}

/// Today's date on the caller's wall clock.
///
/// Clients send their UTC offset in minutes; without one the server's own
/// zone is used.
pub fn caller_today(utc_offset_minutes: Option<i32>) -> Result<NaiveDate, ApiError> {
    let Some(minutes) = utc_offset_minutes else {
        return Ok(stats::local_day(Utc::now(), &Local));
    };
    let offset = minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            ApiError::BadRequest(format!("utc_offset_minutes {} is out of range", minutes))
        })?;
    Ok(stats::local_day(Utc::now(), &offset))
}
