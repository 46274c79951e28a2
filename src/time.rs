use chrono::{DateTime, Utc};
use std::fmt::Debug;

pub trait TimeProvider: Send + Sync + Debug {
    fn now(&self) -> i64; // Returns the current time as a Unix UTC timestamp

    fn now_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.now(), 0).unwrap_or_default()
    }
}

#[derive(Debug)]
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}
