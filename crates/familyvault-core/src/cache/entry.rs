use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    /// Short relative age for listings, rounded to the nearest unit.
    pub fn age_display(&self) -> String {
        match self.age_minutes() {
            // Future timestamps from clock skew read as fresh too
            m if m < 1 => "just now".to_string(),
            m if m < MINUTES_PER_HOUR => format!("{}m ago", m),
            m if m < MINUTES_PER_DAY => format!("{}h ago", round_div(m, MINUTES_PER_HOUR)),
            m => format!("{}d ago", round_div(m, MINUTES_PER_DAY)),
        }
    }
}

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;

/// Integer division rounding half up
fn round_div(value: i64, unit: i64) -> i64 {
    (value + unit / 2) / unit
}

/// One stored request/response pair as listed by `CacheStorage::entries`.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub response: CachedData<crate::models::Response>,
}
