//! services/api/src/web/stats.rs
//!
//! The dashboard endpoint: streaks, period totals, goal progress and the
//! calendar heat map, all derived from the caller's session history.

use crate::error::ApiError;
use crate::web::state::{caller_today, AppState};
use axum::{
    extract::{Query, State},
    response::Json,
    Extension,
};
use chrono::{Datelike, NaiveDate};
use lireon_core::stats::{self, PeriodProgress};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct PeriodResponse {
    pub actual: u64,
    pub target: u32,
    pub percent: u8,
}

impl From<PeriodProgress> for PeriodResponse {
    fn from(p: PeriodProgress) -> Self {
        Self {
            actual: p.actual,
            target: p.target,
            percent: p.percent,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct GoalsResponse {
    pub daily: PeriodResponse,
    pub weekly: PeriodResponse,
    pub monthly: PeriodResponse,
}

#[derive(Serialize, ToSchema)]
pub struct HeatDay {
    pub day: u32,
    pub pages: u64,
    /// Display bucket 0-4.
    pub level: u8,
}

#[derive(Serialize, ToSchema)]
pub struct HeatMapResponse {
    pub year: i32,
    pub month: u32,
    pub days: Vec<HeatDay>,
}

#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub as_of: NaiveDate,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub today_pages: u64,
    pub weekly_pages: u64,
    pub monthly_pages: u64,
    pub minutes_read: u64,
    pub total_pages_read: u64,
    pub goals: GoalsResponse,
    pub heat_map: HeatMapResponse,
}

/// Buckets a day's page count for the calendar colours.
pub fn heat_level(pages: u64) -> u8 {
    match pages {
        0 => 0,
        1..=9 => 1,
        10..=29 => 2,
        30..=59 => 3,
        _ => 4,
    }
}

/// Reading statistics as of the caller's today.
///
/// The heat map covers `year`/`month` when given, otherwise the current month.
#[utoipa::path(
    get,
    path = "/stats",
    responses((status = 200, description = "Derived reading statistics", body = StatsResponse)),
    params(
        ("year" = Option<i32>, Query, description = "Heat map year"),
        ("month" = Option<u32>, Query, description = "Heat map month, 1-12"),
        ("utc_offset_minutes" = Option<i32>, Query, description = "Caller's UTC offset in minutes"),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, ApiError> {
    let as_of = caller_today(query.utc_offset_minutes)?;
    let user = state.db.get_user(user_id).await?;
    let sessions = state.db.list_sessions(user_id).await?;

    let summary = stats::build_stats(&sessions, &user.goals, as_of);
    let year = query.year.unwrap_or(as_of.year());
    let month = query.month.unwrap_or(as_of.month());
    let days = stats::daily_heat(&sessions, year, month)
        .into_iter()
        .map(|(day, pages)| HeatDay {
            day,
            pages,
            level: heat_level(pages),
        })
        .collect();

    Ok(Json(StatsResponse {
        as_of,
        current_streak: summary.current_streak,
        longest_streak: summary.longest_streak,
        today_pages: summary.pages.today,
        weekly_pages: summary.pages.week,
        monthly_pages: summary.pages.month,
        minutes_read: summary.minutes,
        total_pages_read: user.total_pages_read,
        goals: GoalsResponse {
            daily: summary.goals.daily.into(),
            weekly: summary.goals.weekly.into(),
            monthly: summary.goals.monthly.into(),
        },
        heat_map: HeatMapResponse { year, month, days },
    }))
}
