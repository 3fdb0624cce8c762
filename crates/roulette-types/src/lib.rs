// crates/roulette-types/src/lib.rs
// Shared types for restaurant roulette (native + WASM compatible)
// No native-only dependencies allowed here

use serde::{Deserialize, Serialize};
use std::fmt;

/// Minutes in one day
pub const MINUTES_PER_DAY: u32 = 24 * 60;
/// Minutes in one week, the period of every opening-hours calculation
pub const MINUTES_PER_WEEK: u32 = 7 * MINUTES_PER_DAY;

// ═══════════════════════════════════════
// LOCATION
// ═══════════════════════════════════════

/// A WGS84 coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}

// ═══════════════════════════════════════
// CANDIDATE
// ═══════════════════════════════════════

/// Business status reported by the places provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationalStatus {
    Operational,
    Closed,
    #[default]
    Unknown,
}

/// One restaurant eligible for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Stable external identifier (provider place id)
    pub id: String,
    pub name: String,
    pub location: LatLng,
    /// Distance from the session location, annotated on arrival in the pool
    #[serde(default)]
    pub distance_km: f64,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub price_level: Option<u8>,
    #[serde(default)]
    pub cuisine_tags: Vec<String>,
    #[serde(default)]
    pub status: OperationalStatus,
    /// Weekly opening hours; `None` when the provider doesn't know them
    #[serde(default)]
    pub hours: Option<OpeningHours>,
}

impl Candidate {
    pub fn is_operational(&self) -> bool {
        self.status == OperationalStatus::Operational
    }
}

// ═══════════════════════════════════════
// MEAL TIME
// ═══════════════════════════════════════

/// Meal-time filter selecting which restaurants are worth showing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealTime {
    /// Open right now
    #[default]
    Now,
    Breakfast,
    Lunch,
    Dinner,
    LateNight,
}

impl MealTime {
    pub const ALL: [MealTime; 5] = [
        MealTime::Now,
        MealTime::Breakfast,
        MealTime::Lunch,
        MealTime::Dinner,
        MealTime::LateNight,
    ];

    /// Parse from a user-facing name
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "now" | "open_now" | "open-now" => Some(Self::Now),
            "breakfast" => Some(Self::Breakfast),
            "lunch" => Some(Self::Lunch),
            "dinner" => Some(Self::Dinner),
            "late_night" | "late-night" | "latenight" => Some(Self::LateNight),
            _ => None,
        }
    }

    /// Local-time window as `(start_minute, end_minute)` of the day.
    ///
    /// `end <= start` means the window runs past midnight. `Now` has no window.
    pub fn window(&self) -> Option<(u32, u32)> {
        match self {
            Self::Now => None,
            Self::Breakfast => Some((6 * 60, 10 * 60 + 30)),
            Self::Lunch => Some((11 * 60, 14 * 60 + 30)),
            Self::Dinner => Some((17 * 60, 21 * 60 + 30)),
            Self::LateNight => Some((21 * 60 + 30, 2 * 60)),
        }
    }
}

impl fmt::Display for MealTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Now => write!(f, "now"),
            Self::Breakfast => write!(f, "breakfast"),
            Self::Lunch => write!(f, "lunch"),
            Self::Dinner => write!(f, "dinner"),
            Self::LateNight => write!(f, "late_night"),
        }
    }
}

// ═══════════════════════════════════════
// OPENING HOURS
// ═══════════════════════════════════════

/// One weekly opening period. Days count from Monday = 0.
///
/// A `close_minute` at or before `open_minute` runs into the next day, so
/// `open 0, close 0` is a full 24 hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPeriod {
    pub day: u8,
    pub open_minute: u16,
    pub close_minute: u16,
}

impl OpenPeriod {
    /// Period as a half-open `[start, end)` range of week minutes; `end` may
    /// exceed one week when the period wraps past Sunday night.
    fn week_range(&self) -> (u32, u32) {
        let day_start = u32::from(self.day % 7) * MINUTES_PER_DAY;
        let start = day_start + u32::from(self.open_minute);
        let mut end = day_start + u32::from(self.close_minute);
        if end <= start {
            end += MINUTES_PER_DAY;
        }
        (start, end)
    }
}

/// Weekly opening hours
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHours {
    pub periods: Vec<OpenPeriod>,
}

impl OpeningHours {
    pub fn new(periods: Vec<OpenPeriod>) -> Self {
        Self { periods }
    }

    /// Open around the clock, every day
    pub fn always() -> Self {
        Self::new(
            (0..7)
                .map(|day| OpenPeriod {
                    day,
                    open_minute: 0,
                    close_minute: 0,
                })
                .collect(),
        )
    }

    /// Whether the place is open at the given minute of the week
    pub fn is_open_at(&self, week_minute: u32) -> bool {
        let p = week_minute % MINUTES_PER_WEEK;
        self.periods.iter().any(|period| {
            let (start, end) = period.week_range();
            (start <= p && p < end) || (start <= p + MINUTES_PER_WEEK && p + MINUTES_PER_WEEK < end)
        })
    }

    /// Whether any opening period intersects `[from, to)` in week minutes.
    ///
    /// `to` may exceed one week for ranges that wrap past Sunday night.
    pub fn overlaps(&self, from: u32, to: u32) -> bool {
        if to <= from {
            return false;
        }
        let from = i64::from(from);
        let to = i64::from(to);
        let week = i64::from(MINUTES_PER_WEEK);
        self.periods.iter().any(|period| {
            let (start, end) = period.week_range();
            let (start, end) = (i64::from(start), i64::from(end));
            [-week, 0, week]
                .iter()
                .any(|shift| start + shift < to && from < end + shift)
        })
    }
}

// ═══════════════════════════════════════
// KEPT LIST
// ═══════════════════════════════════════

/// Whether a candidate can be added to the kept list, and why not
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepStatus {
    Available,
    AlreadyKept,
    ListFull,
    NotOperational,
}

impl KeepStatus {
    /// Button label for the presentation layer
    pub fn label(&self) -> &'static str {
        match self {
            Self::Available => "Keep",
            Self::AlreadyKept => "Kept",
            Self::ListFull => "List full",
            Self::NotOperational => "Closed",
        }
    }

    /// Whether the keep button should be enabled
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Available)
    }
}
