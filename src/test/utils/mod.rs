pub mod mock_cfg;
pub mod mock_db;
pub mod mock_store;
pub mod mock_time;

use crate::{db::DatabaseTrait, state::AppState};
use mock_cfg::mock_cfg;
use mock_db::MockDatabase;
use mock_store::unavailable_store;
use mock_time::MockTimeProvider;
use std::sync::Arc;

pub fn set_app_state_with(db: Arc<dyn DatabaseTrait>, start_time: i64) -> Arc<AppState> {
    let time_provider = Arc::new(MockTimeProvider::new(start_time));
    AppState::new(db, time_provider, &mock_cfg())
}

pub fn set_app_state(start_time: i64) -> (Arc<AppState>, Arc<MockDatabase>) {
    let db = Arc::new(MockDatabase::new());
    (set_app_state_with(db.clone(), start_time), db)
}

pub fn set_unavailable_app_state(start_time: i64) -> Arc<AppState> {
    set_app_state_with(unavailable_store(), start_time)
}
