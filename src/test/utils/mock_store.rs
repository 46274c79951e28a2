use crate::db::models::{NewReading, SensorReading, TimeRange};
use crate::db::DatabaseTrait;
use crate::error::AppError;
use crate::feed::ChangeEvent;
use mockall::mock;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

mock! {
    pub Store {}

    impl DatabaseTrait for Store {
        fn insert_reading(&self, reading: NewReading) -> Result<SensorReading, AppError>;
        fn readings_between(&self, range: Option<TimeRange>) -> Result<Vec<SensorReading>, AppError>;
        fn watch_readings(&self) -> Result<broadcast::Receiver<ChangeEvent>, AppError>;
        fn watch_count(&self) -> Result<usize, AppError>;
        fn ping(&self) -> Result<(), AppError>;
    }
}

impl fmt::Debug for MockStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MockStore")
    }
}

/// A store whose every call fails as if its thread had died.
pub fn unavailable_store() -> Arc<MockStore> {
    let mut store = MockStore::new();
    store.expect_insert_reading().times(0..).returning(|_| Err(AppError::StoreUnavailable));
    store.expect_readings_between().times(0..).returning(|_| Err(AppError::StoreUnavailable));
    store.expect_watch_readings().times(0..).returning(|| {
        trace!("Mocked watch refused.");
        Err(AppError::StoreUnavailable)
    });
    store.expect_watch_count().times(0..).returning(|| Err(AppError::StoreUnavailable));
    store.expect_ping().times(0..).returning(|| Err(AppError::StoreUnavailable));
    Arc::new(store)
}
