//! A clock tests can move forward by hand.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

/// Starts at a fixed instant and only moves when [`MutableClock::advance`]
/// is called, so sweep windows and signature tolerances are deterministic.
pub struct MutableClock {
    now: Mutex<DateTime<Utc>>,
}

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// # Panics
    ///
    /// Panics if `by` does not fit in a [`TimeDelta`].
    pub fn advance(&self, by: Duration) {
        let Ok(step) = TimeDelta::from_std(by) else {
            panic!("cannot advance the test clock by {by:?}");
        };
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += step;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
