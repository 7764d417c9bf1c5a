//! Wall-clock abstraction.
//!
//! Quiet hours are evaluated against the local time of day of the process,
//! so every time read goes through [`Clock`] to keep the filter testable.

use chrono::{DateTime, Local, NaiveTime, Utc};

/// Source of "now".
pub trait Clock: Send + Sync {
    /// Current instant, used for message timestamps.
    fn now(&self) -> DateTime<Utc>;

    /// Current local time of day, used for quiet hours.
    fn local_time(&self) -> NaiveTime;
}

/// Clock backed by the system time and the process timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_time(&self) -> NaiveTime {
        Local::now().time()
    }
}

/// Clock pinned to a fixed instant and time of day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub now: DateTime<Utc>,
    pub local_time: NaiveTime,
}

impl FixedClock {
    /// Pin the local time of day to `hour:minute`.
    pub fn at(hour: u32, minute: u32) -> Self {
        Self {
            now: Utc::now(),
            local_time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn local_time(&self) -> NaiveTime {
        self.local_time
    }
}
