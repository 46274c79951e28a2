use crate::time::TimeProvider;

/// Frozen clock.
#[derive(Debug)]
pub struct MockTimeProvider {
    current_time: i64,
}

impl MockTimeProvider {
    pub fn new(start_time: i64) -> Self {
        Self { current_time: start_time }
    }
}

impl TimeProvider for MockTimeProvider {
    fn now(&self) -> i64 {
        self.current_time
    }
}
