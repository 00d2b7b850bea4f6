//! Monotonic commit clock.

use chrono::{DateTime, Duration, SubsecRound, Utc};

/// Issues strictly increasing millisecond timestamps.
///
/// Wall-clock time is used when it has moved past the last issued instant;
/// otherwise the clock steps one millisecond past it. Timestamps are
/// truncated to milliseconds so they survive the epoch-millis wire format
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    last: Option<DateTime<Utc>>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// a clock that will only issue instants after `last`
    pub fn starting_after(last: Option<DateTime<Utc>>) -> Self {
        Self { last }
    }

    pub fn tick(&mut self) -> DateTime<Utc> {
        self.tick_from(Utc::now())
    }

    fn tick_from(&mut self, wall: DateTime<Utc>) -> DateTime<Utc> {
        let wall = wall.trunc_subsecs(3);
        let next = match self.last {
            Some(last) if wall <= last => last + Duration::milliseconds(1),
            _ => wall,
        };
        self.last = Some(next);
        next
    }
}
