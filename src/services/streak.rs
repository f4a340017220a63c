//! Streak and freeze accounting.
//!
//! Everything here is a pure function of already-committed facts: the user's
//! reading logs, their recorded freezes, and the daily page goal. No cached
//! counter feeds back into the math. Handlers persist the result as a display
//! snapshot, but the next computation starts from the tables again, so
//! retroactive log edits are always reflected.
//!
//! The one qualification rule shared by the streak walk, freeze eligibility and
//! the calendar projection: a day counts iff it has a log with
//! `pages_read >= daily_page_goal`, or a freeze covers it.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// Why a freeze request was refused. All of these are caller-correctable and
/// leave the ledger untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FreezeDenied {
    #[error("no freezes available")]
    InsufficientFreezes,

    #[error("day already has a qualifying log")]
    AlreadyQualifying,

    #[error("day is not the gap adjacent to the current run")]
    NotEligible,

    #[error("day is already covered by a freeze")]
    DuplicateFreeze,
}

/// Per-day status for the calendar view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Qualifying,
    Frozen,
    Missed,
    NoData,
    Future,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub status: DayStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_read: Option<i32>,
}

/// Result of a streak computation as of a given day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Computation {
    pub current_streak: i32,
    pub longest_streak: i32,
    /// Log dates later than the as-of day. Skipped, never counted; the caller
    /// reports them (clock skew or a corrupted write upstream).
    pub excluded: Vec<NaiveDate>,
}

/// A user's full reading history plus freeze ledger, keyed by calendar day.
///
/// Dates are timezone-free: the caller resolves "today" once at the boundary
/// and passes it in as `as_of`.
#[derive(Debug, Clone)]
pub struct History {
    goal: i32,
    pages: BTreeMap<NaiveDate, i32>,
    frozen: BTreeSet<NaiveDate>,
}

impl History {
    /// Build from raw log rows and freeze dates. Returns the offending date if
    /// the store hands back two logs for the same day, which violates the
    /// one-row-per-(user, date) invariant and cannot be safely isolated.
    pub fn new(
        goal: i32,
        logs: impl IntoIterator<Item = (NaiveDate, i32)>,
        frozen: impl IntoIterator<Item = NaiveDate>,
    ) -> Result<Self, NaiveDate> {
        let mut pages = BTreeMap::new();
        for (date, pages_read) in logs {
            if pages.insert(date, pages_read).is_some() {
                return Err(date);
            }
        }
        Ok(Self {
            goal,
            pages,
            frozen: frozen.into_iter().collect(),
        })
    }

    fn qualifies(&self, day: NaiveDate) -> bool {
        self.frozen.contains(&day) || self.pages.get(&day).is_some_and(|p| *p >= self.goal)
    }

    fn has_log(&self, day: NaiveDate) -> bool {
        self.pages.contains_key(&day)
    }

    fn first_activity(&self) -> Option<NaiveDate> {
        let first_log = self.pages.keys().next().copied();
        let first_frozen = self.frozen.iter().next().copied();
        match (first_log, first_frozen) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Current and longest streak as of `as_of`.
    ///
    /// The walk anchors at `as_of` when that day already qualifies, otherwise
    /// at the day before: the in-progress day is never required to qualify for
    /// the run to stay alive, and a below-goal log today does not end it early.
    pub fn compute(&self, as_of: NaiveDate) -> Computation {
        let excluded: Vec<NaiveDate> = self
            .pages
            .range(as_of + Duration::days(1)..)
            .map(|(d, _)| *d)
            .collect();

        let anchor = if self.qualifies(as_of) {
            as_of
        } else {
            as_of - Duration::days(1)
        };

        let mut current_streak = 0;
        let mut day = anchor;
        while self.qualifies(day) {
            current_streak += 1;
            day -= Duration::days(1);
        }

        // Longest run over full history, same per-day rule. The current run is
        // one of the scanned chains, so longest >= current always holds.
        let qualifying: BTreeSet<NaiveDate> = self
            .pages
            .iter()
            .filter(|(_, p)| **p >= self.goal)
            .map(|(d, _)| *d)
            .chain(self.frozen.iter().copied())
            .filter(|d| *d <= as_of)
            .collect();

        let mut longest_streak = 0;
        let mut run = 0;
        let mut prev: Option<NaiveDate> = None;
        for day in qualifying {
            run = match prev {
                Some(p) if day == p + Duration::days(1) => run + 1,
                _ => 1,
            };
            longest_streak = longest_streak.max(run);
            prev = Some(day);
        }

        Computation {
            current_streak,
            longest_streak,
            excluded,
        }
    }

    /// A copy of this history with one more day frozen. Used to observe the
    /// post-consumption streak inside the same transaction that spends the
    /// freeze.
    pub fn with_freeze(mut self, day: NaiveDate) -> Self {
        self.frozen.insert(day);
        self
    }

    /// The only freezable day: the first non-qualifying day walking backward
    /// from the live run's anchor. Older, already-broken gaps are not
    /// repairable.
    pub fn freeze_gap(&self, as_of: NaiveDate) -> NaiveDate {
        let mut day = if self.qualifies(as_of) {
            as_of
        } else {
            as_of - Duration::days(1)
        };
        while self.qualifies(day) {
            day -= Duration::days(1);
        }
        day
    }

    /// Evaluate every freeze precondition against this history. Read-only;
    /// the caller holds the per-user lock and applies the ledger change.
    pub fn check_freeze(
        &self,
        as_of: NaiveDate,
        target: NaiveDate,
        freezes_available: i32,
    ) -> Result<(), FreezeDenied> {
        if target >= as_of {
            return Err(FreezeDenied::NotEligible);
        }
        if self.frozen.contains(&target) {
            return Err(FreezeDenied::DuplicateFreeze);
        }
        if self.pages.get(&target).is_some_and(|p| *p >= self.goal) {
            return Err(FreezeDenied::AlreadyQualifying);
        }
        if target != self.freeze_gap(as_of) {
            return Err(FreezeDenied::NotEligible);
        }
        if freezes_available <= 0 {
            return Err(FreezeDenied::InsufficientFreezes);
        }
        Ok(())
    }

    /// Project a date range onto per-day statuses for rendering. Uses the same
    /// qualification rule as [`compute`](Self::compute), so the calendar can
    /// never disagree with the streak numbers.
    pub fn project_calendar(
        &self,
        as_of: NaiveDate,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<CalendarDay> {
        let first_activity = self.first_activity();
        let mut days = Vec::new();
        let mut date = from;
        while date <= to {
            let pages_read = self.pages.get(&date).copied();
            let status = if date > as_of {
                DayStatus::Future
            } else if pages_read.is_some_and(|p| p >= self.goal) {
                DayStatus::Qualifying
            } else if self.frozen.contains(&date) {
                DayStatus::Frozen
            } else if date == as_of && !self.has_log(date) {
                DayStatus::NoData
            } else if first_activity.map_or(true, |first| date < first) {
                DayStatus::NoData
            } else {
                DayStatus::Missed
            };
            days.push(CalendarDay {
                date,
                status,
                pages_read,
            });
            date += Duration::days(1);
        }
        days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn history(goal: i32, logs: &[(&str, i32)], frozen: &[&str]) -> History {
        History::new(
            goal,
            logs.iter().map(|(s, p)| (d(s), *p)),
            frozen.iter().map(|s| d(s)),
        )
        .unwrap()
    }

    #[test]
    fn single_qualifying_day() {
        let h = history(10, &[("2026-03-07", 10)], &[]);
        let c = h.compute(d("2026-03-07"));
        assert_eq!(c.current_streak, 1);
        assert_eq!(c.longest_streak, 1);
    }

    #[test]
    fn gap_breaks_current_but_not_longest() {
        // Days 1-5 qualify, day 6 missing, day 7 qualifies.
        let logs: Vec<(String, i32)> = (1..=5)
            .map(|day| (format!("2026-03-0{day}"), 10))
            .chain(std::iter::once(("2026-03-07".to_string(), 10)))
            .collect();
        let h = History::new(10, logs.iter().map(|(s, p)| (d(s), *p)), []).unwrap();
        let c = h.compute(d("2026-03-07"));
        assert_eq!(c.current_streak, 1);
        assert_eq!(c.longest_streak, 5);
    }

    #[test]
    fn freeze_bridges_the_gap() {
        let h = history(
            10,
            &[
                ("2026-03-01", 10),
                ("2026-03-02", 10),
                ("2026-03-03", 10),
                ("2026-03-04", 10),
                ("2026-03-05", 10),
                ("2026-03-07", 10),
            ],
            &["2026-03-06"],
        );
        let c = h.compute(d("2026-03-07"));
        assert_eq!(c.current_streak, 7);
        assert_eq!(c.longest_streak, 7);
    }

    #[test]
    fn today_without_log_keeps_run_alive() {
        let h = history(10, &[("2026-03-05", 10), ("2026-03-06", 12)], &[]);
        let c = h.compute(d("2026-03-07"));
        assert_eq!(c.current_streak, 2);
    }

    #[test]
    fn below_goal_log_today_does_not_end_run_early() {
        let h = history(
            10,
            &[("2026-03-05", 10), ("2026-03-06", 10), ("2026-03-07", 3)],
            &[],
        );
        let c = h.compute(d("2026-03-07"));
        assert_eq!(c.current_streak, 2);
    }

    #[test]
    fn below_goal_day_in_the_past_breaks_the_run() {
        let h = history(
            10,
            &[("2026-03-05", 10), ("2026-03-06", 9), ("2026-03-07", 10)],
            &[],
        );
        let c = h.compute(d("2026-03-07"));
        assert_eq!(c.current_streak, 1);
        assert_eq!(c.longest_streak, 1);
    }

    #[test]
    fn future_dated_rows_are_excluded_and_reported() {
        let h = history(10, &[("2026-03-07", 10), ("2026-03-20", 50)], &[]);
        let c = h.compute(d("2026-03-07"));
        assert_eq!(c.current_streak, 1);
        assert_eq!(c.longest_streak, 1);
        assert_eq!(c.excluded, vec![d("2026-03-20")]);
    }

    #[test]
    fn computation_is_idempotent() {
        let h = history(
            10,
            &[("2026-03-03", 15), ("2026-03-04", 2), ("2026-03-05", 10)],
            &["2026-03-02"],
        );
        assert_eq!(h.compute(d("2026-03-05")), h.compute(d("2026-03-05")));
    }

    #[test]
    fn longest_never_below_current() {
        let histories = [
            history(10, &[], &[]),
            history(10, &[("2026-03-07", 10)], &[]),
            history(1, &[("2026-03-05", 1), ("2026-03-06", 1), ("2026-03-07", 1)], &[]),
            history(10, &[("2026-03-01", 10), ("2026-03-07", 10)], &["2026-03-06"]),
        ];
        for h in &histories {
            let c = h.compute(d("2026-03-07"));
            assert!(c.longest_streak >= c.current_streak, "{c:?}");
        }
    }

    #[test]
    fn appending_next_day_extends_current_by_one() {
        let h = history(10, &[("2026-03-05", 10), ("2026-03-06", 10)], &[]);
        let before = h.compute(d("2026-03-06"));

        let h2 = history(
            10,
            &[("2026-03-05", 10), ("2026-03-06", 10), ("2026-03-07", 11)],
            &[],
        );
        let after = h2.compute(d("2026-03-07"));

        assert_eq!(after.current_streak, before.current_streak + 1);
        assert!(after.longest_streak >= before.longest_streak);
    }

    #[test]
    fn freeze_gap_is_day_behind_live_run() {
        let h = history(10, &[("2026-03-05", 10), ("2026-03-07", 10)], &[]);
        assert_eq!(h.freeze_gap(d("2026-03-07")), d("2026-03-06"));
    }

    #[test]
    fn freeze_gap_with_no_activity_is_yesterday() {
        let h = history(10, &[], &[]);
        assert_eq!(h.freeze_gap(d("2026-03-07")), d("2026-03-06"));
    }

    #[test]
    fn check_freeze_happy_path() {
        let h = history(10, &[("2026-03-05", 10), ("2026-03-07", 10)], &[]);
        assert_eq!(h.check_freeze(d("2026-03-07"), d("2026-03-06"), 1), Ok(()));
    }

    #[test]
    fn check_freeze_rejects_today_and_future() {
        let h = history(10, &[("2026-03-06", 10)], &[]);
        assert_eq!(
            h.check_freeze(d("2026-03-07"), d("2026-03-07"), 1),
            Err(FreezeDenied::NotEligible)
        );
        assert_eq!(
            h.check_freeze(d("2026-03-07"), d("2026-03-08"), 1),
            Err(FreezeDenied::NotEligible)
        );
    }

    #[test]
    fn check_freeze_rejects_non_adjacent_gap() {
        // Gaps on both day 3 and day 6; only day 6 is adjacent to the live run.
        let h = history(
            10,
            &[
                ("2026-03-01", 10),
                ("2026-03-02", 10),
                ("2026-03-04", 10),
                ("2026-03-05", 10),
                ("2026-03-07", 10),
            ],
            &[],
        );
        assert_eq!(
            h.check_freeze(d("2026-03-07"), d("2026-03-03"), 1),
            Err(FreezeDenied::NotEligible)
        );
        assert_eq!(h.check_freeze(d("2026-03-07"), d("2026-03-06"), 1), Ok(()));
    }

    #[test]
    fn check_freeze_rejects_qualifying_day() {
        let h = history(10, &[("2026-03-05", 10), ("2026-03-06", 10)], &[]);
        assert_eq!(
            h.check_freeze(d("2026-03-07"), d("2026-03-05"), 1),
            Err(FreezeDenied::AlreadyQualifying)
        );
    }

    #[test]
    fn check_freeze_rejects_duplicate() {
        let h = history(10, &[("2026-03-07", 10)], &["2026-03-06"]);
        assert_eq!(
            h.check_freeze(d("2026-03-07"), d("2026-03-06"), 1),
            Err(FreezeDenied::DuplicateFreeze)
        );
    }

    #[test]
    fn check_freeze_rejects_when_none_available() {
        let h = history(10, &[("2026-03-05", 10), ("2026-03-07", 10)], &[]);
        assert_eq!(
            h.check_freeze(d("2026-03-07"), d("2026-03-06"), 0),
            Err(FreezeDenied::InsufficientFreezes)
        );
    }

    #[test]
    fn with_freeze_joins_the_runs() {
        let h = history(10, &[("2026-03-05", 10), ("2026-03-07", 10)], &[]);
        assert_eq!(h.compute(d("2026-03-07")).current_streak, 1);
        let frozen = h.with_freeze(d("2026-03-06"));
        assert_eq!(frozen.compute(d("2026-03-07")).current_streak, 3);
    }

    #[test]
    fn duplicate_log_dates_are_rejected() {
        let err = History::new(10, [(d("2026-03-05"), 10), (d("2026-03-05"), 4)], []);
        assert_eq!(err.unwrap_err(), d("2026-03-05"));
    }

    #[test]
    fn calendar_statuses_match_qualification_rule() {
        let h = history(
            10,
            &[("2026-03-03", 12), ("2026-03-04", 4), ("2026-03-06", 10)],
            &["2026-03-05"],
        );
        let days = h.project_calendar(d("2026-03-06"), d("2026-03-01"), d("2026-03-08"));
        let statuses: Vec<DayStatus> = days.iter().map(|day| day.status).collect();
        assert_eq!(
            statuses,
            vec![
                DayStatus::NoData,     // before first activity
                DayStatus::NoData,
                DayStatus::Qualifying, // 12 >= 10
                DayStatus::Missed,     // logged but below goal, not frozen
                DayStatus::Frozen,
                DayStatus::Qualifying,
                DayStatus::Future,
                DayStatus::Future,
            ]
        );
    }

    #[test]
    fn calendar_marks_today_without_log_as_no_data() {
        let h = history(10, &[("2026-03-06", 10)], &[]);
        let days = h.project_calendar(d("2026-03-07"), d("2026-03-07"), d("2026-03-07"));
        assert_eq!(days[0].status, DayStatus::NoData);
    }

    #[test]
    fn frozen_day_with_below_goal_log_renders_frozen() {
        let h = history(10, &[("2026-03-05", 3)], &["2026-03-05"]);
        let days = h.project_calendar(d("2026-03-06"), d("2026-03-05"), d("2026-03-05"));
        assert_eq!(days[0].status, DayStatus::Frozen);
        assert_eq!(days[0].pages_read, Some(3));
    }
}
