//! Rate Limiting Arithmetic
//!
//! Pure window and cooldown calculations. Callers persist the window
//! state themselves and apply the decision under their own atomic
//! read-modify-write.

use chrono::{DateTime, Duration, Utc};

/// Request quota over a window anchored at the first request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Window length
    pub window: Duration,
}

/// Outcome of [`RateWindow::check`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowDecision {
    /// Request admitted; store the returned state
    Allowed {
        window_start: DateTime<Utc>,
        count: u32,
    },
    /// Quota used up until the window elapses
    Exhausted { retry_after_secs: u64 },
}

impl Default for RateWindow {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::seconds(60),
        }
    }
}

impl RateWindow {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    /// Decide whether one more request fits
    ///
    /// A missing or elapsed window starts over at `now` with a count of one.
    pub fn check(
        &self,
        window_start: Option<DateTime<Utc>>,
        count: u32,
        now: DateTime<Utc>,
    ) -> WindowDecision {
        match window_start {
            Some(start) if now - start < self.window => {
                if count >= self.max_requests {
                    WindowDecision::Exhausted {
                        retry_after_secs: ceil_secs(start + self.window - now),
                    }
                } else {
                    WindowDecision::Allowed {
                        window_start: start,
                        count: count + 1,
                    }
                }
            }
            _ => WindowDecision::Allowed {
                window_start: now,
                count: 1,
            },
        }
    }
}

/// Seconds left before `cooldown` has passed since `last`, rounded up
///
/// `None` once the cooldown is over.
pub fn cooldown_remaining(
    last: DateTime<Utc>,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> Option<u64> {
    let elapsed = now - last;
    if elapsed >= cooldown {
        return None;
    }
    let remaining = (cooldown - elapsed).min(cooldown);
    Some(ceil_secs(remaining))
}

/// Whole seconds, rounded up; negative durations count as zero
pub fn ceil_secs(d: Duration) -> u64 {
    let ms = d.num_milliseconds().max(0) as u64;
    ms.div_ceil(1000)
}

/// Whole minutes, rounded up
pub fn ceil_minutes(secs: u64) -> u64 {
    secs.div_ceil(60)
}
