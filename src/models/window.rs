use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Time range an event must fall in to count toward a delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    /// True when `from <= timestamp <= to`
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.from && timestamp <= self.to
    }

    /// True when `timestamp` lies before the lower bound
    pub fn is_before(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp < self.from
    }
}

/// Window as requested by a caller, before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowRequest {
    /// Last `days` days up to now; `None` means unbounded
    Relative { days: Option<u32> },
    /// Explicit bounds (RFC 3339 or YYYY-MM-DD)
    Custom {
        from: Option<String>,
        to: Option<String>,
    },
}

impl Default for WindowRequest {
    fn default() -> Self {
        WindowRequest::Relative { days: Some(7) }
    }
}
