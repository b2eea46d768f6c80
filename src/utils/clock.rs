use chrono::{DateTime, Utc};

/// Source of wall-clock dates, swapped out in tests.
pub trait Clock: Send + 'static {
    fn time(&self) -> DateTime<Utc>;
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
