// Time source for entity timestamps

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::cell::Cell;
use std::rc::Rc;

/// Produces ISO 8601 UTC timestamps
pub trait Clock {
    fn now(&self) -> String;
}

/// Wall-clock time, millisecond precision with a `Z` suffix
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> String {
        format_timestamp(Utc::now())
    }
}

/// Clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Rc::new(Cell::new(start)),
        }
    }

    /// Start at 2025-01-01T00:00:00Z
    pub fn epoch() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_089))
    }

    pub fn advance(&self, by: Duration) {
        self.current.set(self.current.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> String {
        format_timestamp(self.current.get())
    }
}

pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Return whichever of two timestamps is later.
///
/// Both are parsed as RFC 3339. If either fails to parse, `candidate` wins so
/// a malformed stored value is replaced rather than kept.
pub fn later_of(current: &str, candidate: &str) -> String {
    match (
        DateTime::parse_from_rfc3339(current),
        DateTime::parse_from_rfc3339(candidate),
    ) {
        (Ok(cur), Ok(cand)) if cand < cur => current.to_string(),
        _ => candidate.to_string(),
    }
}
