//! crates/lireon_core/src/stats.rs
//!
//! Derived reading statistics: page totals per period, streaks, goal progress
//! and the per-day totals behind the calendar heat map.
//!
//! Everything here is a pure function of a session list and a reference day.
//! Sessions are bucketed by their local calendar day; use [`local_day`] to
//! turn an instant into that day, never the UTC date.

use crate::domain::{Goals, ReadingSession};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Pages read in the periods ending on the reference day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageTotals {
    pub today: u64,
    pub week: u64,
    pub month: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodProgress {
    pub actual: u64,
    pub target: u32,
    /// `actual / target` as a percentage, capped at 100. Zero without a target.
    pub percent: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoalProgress {
    pub daily: PeriodProgress,
    pub weekly: PeriodProgress,
    pub monthly: PeriodProgress,
}

/// Everything the dashboard shows, computed in one pass over the history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadingStats {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub pages: PageTotals,
    pub minutes: u64,
    pub goals: GoalProgress,
}

/// The calendar day `instant` falls on in `tz`.
pub fn local_day<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// The most recent Sunday at or before `day`.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_sunday()))
}

/// Number of consecutive days with at least one session, ending on `as_of`.
///
/// A day without a session on `as_of` itself means the streak is broken: the
/// result is 0 even if yesterday had one.
pub fn compute_streak(sessions: &[ReadingSession], as_of: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = sessions.iter().map(|session| session.date).collect();

    let mut streak = 0;
    let mut day = as_of;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    streak
}

/// The longest run of consecutive reading days anywhere in the history.
pub fn longest_streak(sessions: &[ReadingSession]) -> u32 {
    let days: BTreeSet<NaiveDate> = sessions.iter().map(|session| session.date).collect();

    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for day in days {
        run = match previous {
            Some(prev) if prev.succ_opt() == Some(day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    longest
}

/// Sums pages for `as_of`, its Sunday-based week and its calendar month.
///
/// The week and month windows end on `as_of` inclusive; sessions dated after
/// it are ignored.
pub fn aggregate_pages(sessions: &[ReadingSession], as_of: NaiveDate) -> PageTotals {
    let week_from = week_start(as_of);
    let month_from = as_of.with_day(1).unwrap_or(as_of);

    let mut totals = PageTotals::default();
    for session in sessions.iter().filter(|session| session.date <= as_of) {
        let pages = u64::from(session.pages_read);
        if session.date == as_of {
            totals.today = totals.today.saturating_add(pages);
        }
        if session.date >= week_from {
            totals.week = totals.week.saturating_add(pages);
        }
        if session.date >= month_from {
            totals.month = totals.month.saturating_add(pages);
        }
    }
    totals
}

/// Pages read on each day of the month, keyed by day-of-month.
///
/// Every day `1..=N` is present; days without sessions map to 0.
/// An out-of-range `month` gives an empty map.
pub fn daily_heat(sessions: &[ReadingSession], year: i32, month: u32) -> BTreeMap<u32, u64> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return BTreeMap::new();
    };

    let mut heat: BTreeMap<u32, u64> = (1..=days_in_month(first)).map(|day| (day, 0)).collect();
    for session in sessions {
        if session.date.year() == year && session.date.month() == month {
            let total = heat.entry(session.date.day()).or_default();
            *total = total.saturating_add(u64::from(session.pages_read));
        }
    }
    heat
}

/// Total minutes recorded by the reading timer.
pub fn minutes_read(sessions: &[ReadingSession]) -> u64 {
    sessions
        .iter()
        .filter_map(|session| session.minutes)
        .map(u64::from)
        .sum()
}

pub fn goal_progress(totals: &PageTotals, goals: &Goals) -> GoalProgress {
    GoalProgress {
        daily: period(totals.today, goals.daily),
        weekly: period(totals.week, goals.weekly),
        monthly: period(totals.month, goals.monthly),
    }
}

pub fn build_stats(sessions: &[ReadingSession], goals: &Goals, as_of: NaiveDate) -> ReadingStats {
    let pages = aggregate_pages(sessions, as_of);
    ReadingStats {
        current_streak: compute_streak(sessions, as_of),
        longest_streak: longest_streak(sessions),
        pages,
        minutes: minutes_read(sessions),
        goals: goal_progress(&pages, goals),
    }
}

fn period(actual: u64, target: u32) -> PeriodProgress {
    let percent = if target == 0 {
        0
    } else {
        (actual.saturating_mul(100) / u64::from(target)).min(100) as u8
    };
    PeriodProgress {
        actual,
        target,
        percent,
    }
}

fn days_in_month(first: NaiveDate) -> u32 {
    first
        .checked_add_months(Months::new(1))
        .map(|next| (next - first).num_days() as u32)
        .unwrap_or(31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use uuid::Uuid;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn session(date: NaiveDate, pages: u32) -> ReadingSession {
        ReadingSession {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            book_id: Some(Uuid::nil()),
            book_title: None,
            date,
            pages_read: pages,
            minutes: None,
        }
    }

    #[test]
    fn streak_of_empty_history_is_zero() {
        assert_eq!(compute_streak(&[], day(2024, 1, 2)), 0);
        assert_eq!(longest_streak(&[]), 0);
    }

    #[test]
    fn streak_counts_back_to_the_first_gap() {
        let today = day(2024, 5, 10);
        let sessions = vec![
            session(today, 5),
            session(today - Duration::days(1), 5),
            session(today - Duration::days(2), 5),
            session(today - Duration::days(4), 5),
        ];
        assert_eq!(compute_streak(&sessions, today), 3);
    }

    #[test]
    fn missed_today_resets_streak() {
        let today = day(2024, 5, 10);
        let sessions = vec![
            session(today - Duration::days(1), 12),
            session(today - Duration::days(2), 12),
        ];
        assert_eq!(compute_streak(&sessions, today), 0);
    }

    #[test]
    fn several_sessions_on_one_day_count_once_for_streak() {
        let today = day(2024, 5, 10);
        let sessions = vec![session(today, 3), session(today, 4), session(today, 9)];
        assert_eq!(compute_streak(&sessions, today), 1);
    }

    #[test]
    fn longest_streak_finds_best_run() {
        let sessions = vec![
            session(day(2024, 1, 1), 1),
            session(day(2024, 1, 2), 1),
            session(day(2024, 1, 2), 1),
            session(day(2024, 1, 3), 1),
            session(day(2024, 1, 7), 1),
            session(day(2024, 1, 8), 1),
        ];
        assert_eq!(longest_streak(&sessions), 3);
    }

    #[test]
    fn two_day_example() {
        let sessions = vec![session(day(2024, 1, 1), 20), session(day(2024, 1, 2), 15)];
        let as_of = day(2024, 1, 2);

        assert_eq!(compute_streak(&sessions, as_of), 2);
        let totals = aggregate_pages(&sessions, as_of);
        assert_eq!(totals.today, 15);
        // Sunday 2023-12-31 starts the week holding both days.
        assert_eq!(week_start(as_of), day(2023, 12, 31));
        assert_eq!(totals.week, 35);
        assert_eq!(totals.month, 35);
    }

    #[test]
    fn week_starts_on_sunday_inclusive() {
        // 2024-06-09 is a Sunday.
        assert_eq!(week_start(day(2024, 6, 9)), day(2024, 6, 9));
        assert_eq!(week_start(day(2024, 6, 15)), day(2024, 6, 9));

        let sessions = vec![
            session(day(2024, 6, 8), 40),
            session(day(2024, 6, 9), 10),
            session(day(2024, 6, 12), 5),
        ];
        let totals = aggregate_pages(&sessions, day(2024, 6, 12));
        assert_eq!(totals.today, 5);
        assert_eq!(totals.week, 15);
        assert_eq!(totals.month, 55);
    }

    #[test]
    fn month_window_excludes_previous_month_and_future_days() {
        let sessions = vec![
            session(day(2024, 2, 29), 7),
            session(day(2024, 3, 1), 11),
            session(day(2024, 3, 20), 100),
        ];
        let totals = aggregate_pages(&sessions, day(2024, 3, 2));
        assert_eq!(totals.month, 11);
        assert_eq!(totals.today, 0);
    }

    #[test]
    fn empty_history_aggregates_to_zero() {
        assert_eq!(aggregate_pages(&[], day(2024, 3, 2)), PageTotals::default());
    }

    #[test]
    fn same_day_sessions_sum_in_totals_and_heat() {
        let today = day(2024, 2, 14);
        let sessions = vec![session(today, 8), session(today, 13)];

        assert_eq!(aggregate_pages(&sessions, today).today, 21);
        let heat = daily_heat(&sessions, 2024, 2);
        assert_eq!(heat.get(&14), Some(&21));
    }

    #[test]
    fn heat_covers_every_day_of_month() {
        let sessions = vec![session(day(2024, 2, 3), 4), session(day(2024, 3, 3), 99)];
        let heat = daily_heat(&sessions, 2024, 2);

        assert_eq!(heat.len(), 29);
        assert_eq!(heat.get(&1), Some(&0));
        assert_eq!(heat.get(&3), Some(&4));
        assert_eq!(heat.values().sum::<u64>(), 4);

        assert_eq!(daily_heat(&[], 2023, 4).len(), 30);
        assert!(daily_heat(&sessions, 2024, 13).is_empty());
    }

    #[test]
    fn local_day_ignores_the_utc_date() {
        let new_york = FixedOffset::west_opt(5 * 3600).unwrap();
        let morning = Utc.with_ymd_and_hms(2024, 3, 10, 13, 0, 0).unwrap();
        let late_night = Utc.with_ymd_and_hms(2024, 3, 11, 4, 30, 0).unwrap();

        assert_ne!(morning.date_naive(), late_night.date_naive());
        assert_eq!(local_day(morning, &new_york), day(2024, 3, 10));
        assert_eq!(local_day(late_night, &new_york), day(2024, 3, 10));
    }

    #[test]
    fn goal_percent_is_capped() {
        let totals = PageTotals {
            today: 30,
            week: 50,
            month: 0,
        };
        let goals = Goals {
            daily: 20,
            weekly: 200,
            monthly: 0,
        };
        let progress = goal_progress(&totals, &goals);
        assert_eq!(progress.daily.percent, 100);
        assert_eq!(progress.weekly.percent, 25);
        assert_eq!(progress.monthly.percent, 0);
    }

    #[test]
    fn build_stats_combines_everything() {
        let today = day(2024, 4, 3);
        let mut timed = session(today, 10);
        timed.minutes = Some(25);
        let sessions = vec![timed, session(today - Duration::days(1), 5)];

        let stats = build_stats(
            &sessions,
            &Goals {
                daily: 20,
                weekly: 0,
                monthly: 0,
            },
            today,
        );
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.longest_streak, 2);
        assert_eq!(stats.pages.today, 10);
        assert_eq!(stats.minutes, 25);
        assert_eq!(stats.goals.daily.percent, 50);
    }
}
