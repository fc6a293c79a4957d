// libs/waiting-room-cell/src/services/wait_time.rs
use chrono::{DateTime, Utc};

/// Pure derivation of elapsed/remaining time for one appointment. No I/O,
/// no global clock; callers pass `now` in.
pub struct WaitTimeEstimator;

#[derive(Debug, Clone, PartialEq)]
pub enum WaitDirection {
    Past,
    Future,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaitEstimate {
    pub direction: WaitDirection,
    pub minutes: i64,
}

impl WaitTimeEstimator {
    /// `now >= scheduled_start` reports minutes already waited (the boundary
    /// `now == scheduled_start` is `Past, 0`); otherwise minutes until start.
    pub fn elapsed_or_until(
        &self,
        scheduled_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> WaitEstimate {
        if now >= scheduled_start {
            WaitEstimate {
                direction: WaitDirection::Past,
                minutes: (now - scheduled_start).num_minutes(),
            }
        } else {
            WaitEstimate {
                direction: WaitDirection::Future,
                minutes: (scheduled_start - now).num_minutes(),
            }
        }
    }
}

impl WaitEstimate {
    /// Dashboard string: "waiting 15 min", "waiting 1h 5m", "in 20 min".
    pub fn to_display_string(&self) -> String {
        let (hours, minutes) = (self.minutes / 60, self.minutes % 60);
        match self.direction {
            WaitDirection::Past => {
                if self.minutes < 60 {
                    format!("waiting {} min", self.minutes)
                } else {
                    format!("waiting {}h {}m", hours, minutes)
                }
            }
            WaitDirection::Future => {
                if self.minutes < 60 {
                    format!("in {} min", self.minutes)
                } else {
                    format!("in {}h {}m", hours, minutes)
                }
            }
        }
    }
}
