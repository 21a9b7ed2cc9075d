//! Severity classification and time-of-day periods.

use serde::{Deserialize, Serialize};

/// Calibration severity, ordered by urgency (`Overdue` is the greatest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    OnSchedule,
    DueWithin60,
    DueWithin30,
    Overdue,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OnSchedule => write!(f, "ON_SCHEDULE"),
            Self::DueWithin60 => write!(f, "DUE_WITHIN_60"),
            Self::DueWithin30 => write!(f, "DUE_WITHIN_30"),
            Self::Overdue => write!(f, "OVERDUE"),
        }
    }
}

/// Classify a signed day count (negative = already past due).
///
/// Thresholds are inclusive and checked from most to least severe.
pub fn classify(days_until_due: i64) -> Severity {
    if days_until_due <= 0 {
        Severity::Overdue
    } else if days_until_due <= 30 {
        Severity::DueWithin30
    } else if days_until_due <= 60 {
        Severity::DueWithin60
    } else {
        Severity::OnSchedule
    }
}

/// Part of the day used to throttle announcements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Morning,
    Afternoon,
    Night,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Morning, Period::Afternoon, Period::Night];

    /// [0,12) morning, [12,18) afternoon, [18,24) night.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            _ => Self::Night,
        }
    }

    /// Persisted key holding the last announced date for this period.
    pub fn store_key(self) -> &'static str {
        match self {
            Self::Morning => "calibra_last_announce_morning",
            Self::Afternoon => "calibra_last_announce_afternoon",
            Self::Night => "calibra_last_announce_night",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Night => "night",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "morning" | "manha" | "manhã" => Some(Self::Morning),
            "afternoon" | "tarde" => Some(Self::Afternoon),
            "night" | "noite" => Some(Self::Night),
            _ => None,
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
