use crate::db::models::{NewReading, SensorReading, TimeRange};
use crate::db::DatabaseTrait;
use crate::error::AppError;
use crate::feed::ChangeEvent;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::trace;

/// In-memory store with the same notification semantics as the real one.
#[derive(Debug)]
pub struct MockDatabase {
    readings: Mutex<Vec<SensorReading>>,
    feed: Mutex<Option<broadcast::Sender<ChangeEvent>>>,
}

impl MockDatabase {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { readings: Mutex::new(Vec::new()), feed: Mutex::new(Some(tx)) }
    }

    /// Simulates the store going away: open subscriptions see the feed close and
    /// new ones are refused.
    pub fn close_feed(&self) {
        self.feed.lock().unwrap().take();
    }
}

impl DatabaseTrait for MockDatabase {
    fn insert_reading(&self, reading: NewReading) -> Result<SensorReading, AppError> {
        let mut readings = self.readings.lock().unwrap();
        let stored = SensorReading::from_new(readings.len() as i64 + 1, reading);
        readings.push(stored.clone());
        if let Some(feed) = self.feed.lock().unwrap().as_ref() {
            let notified = feed.send(ChangeEvent::insert(stored.clone())).unwrap_or(0);
            trace!(id = stored.id, notified, "Mock insert published.");
        }
        Ok(stored)
    }

    fn readings_between(&self, range: Option<TimeRange>) -> Result<Vec<SensorReading>, AppError> {
        let mut readings: Vec<_> = self
            .readings
            .lock()
            .unwrap()
            .iter()
            .filter(|r| range.map_or(true, |range| range.contains(r.timestamp)))
            .cloned()
            .collect();
        readings.sort_by_key(|r| (r.timestamp, r.id));
        Ok(readings)
    }

    fn watch_readings(&self) -> Result<broadcast::Receiver<ChangeEvent>, AppError> {
        self.feed.lock().unwrap().as_ref().map(|feed| feed.subscribe()).ok_or(AppError::StoreUnavailable)
    }

    fn watch_count(&self) -> Result<usize, AppError> {
        Ok(self.feed.lock().unwrap().as_ref().map_or(0, |feed| feed.receiver_count()))
    }

    fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
