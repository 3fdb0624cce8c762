// crates/roulette-engine/src/availability.rs
// Meal-time validity of a candidate at a given wall-clock time
//
// A candidate that was valid when it entered the pool can go stale as time
// passes (the place closes, or the meal window ends), so the pool re-checks
// this on every pick.

use crate::clock::week_minute;
use chrono::{Datelike, NaiveDateTime};
use roulette_types::{
    Candidate, MINUTES_PER_DAY, MINUTES_PER_WEEK, MealTime, OpeningHours, OperationalStatus,
};

/// Whether `candidate` is worth showing for `meal` at local time `now`
pub fn is_available(candidate: &Candidate, meal: MealTime, now: NaiveDateTime) -> bool {
    if candidate.status == OperationalStatus::Closed {
        return false;
    }
    let Some(hours) = &candidate.hours else {
        return true;
    };

    let now_wm = week_minute(now);
    match meal.window() {
        None => hours.is_open_at(now_wm),
        Some((start, end)) => {
            let (from, to) = upcoming_window(now, now_wm, start, end);
            if from <= i64::from(now_wm) && i64::from(now_wm) < to {
                hours.is_open_at(now_wm) && overlaps(hours, i64::from(now_wm), to)
            } else {
                overlaps(hours, from, to)
            }
        }
    }
}

/// The meal window that is in progress or comes next, as week minutes.
///
/// Yesterday's window is considered first so that 01:00 still counts as part
/// of the previous night's late-night window.
fn upcoming_window(now: NaiveDateTime, now_wm: u32, start: u32, end: u32) -> (i64, i64) {
    let today = i64::from(now.weekday().num_days_from_monday() * MINUTES_PER_DAY);
    let day = i64::from(MINUTES_PER_DAY);
    let span = if end <= start {
        i64::from(end) + day - i64::from(start)
    } else {
        i64::from(end) - i64::from(start)
    };

    for offset in [-day, 0, day] {
        let from = today + offset + i64::from(start);
        let to = from + span;
        if to > i64::from(now_wm) {
            return (from, to);
        }
    }
    // Unreachable in practice: tomorrow's window always ends after now
    let from = today + day + i64::from(start);
    (from, from + span)
}

fn overlaps(hours: &OpeningHours, from: i64, to: i64) -> bool {
    let week = i64::from(MINUTES_PER_WEEK);
    let start = from.rem_euclid(week);
    let end = start + (to - from);
    match (u32::try_from(start), u32::try_from(end)) {
        (Ok(start), Ok(end)) => hours.overlaps(start, end),
        _ => false,
    }
}
