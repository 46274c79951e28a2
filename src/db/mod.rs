pub mod models;

use crate::error::AppError;
use crate::feed::ChangeEvent;
use chrono::DateTime;
use models::{NewReading, SensorReading, TimeRange};
use rusqlite::{params, Connection, Result, Row};
use std::fmt::Debug;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

/// Narrow store interface: append readings, read them back by time, and watch inserts.
pub trait DatabaseTrait: Send + Sync + Debug {
    fn insert_reading(&self, reading: NewReading) -> Result<SensorReading, AppError>;
    /// Ascending by timestamp. `None` returns every reading.
    fn readings_between(&self, range: Option<TimeRange>) -> Result<Vec<SensorReading>, AppError>;
    /// Subscribes to inserts committed after this call returns, in commit order.
    fn watch_readings(&self) -> Result<broadcast::Receiver<ChangeEvent>, AppError>;
    /// Number of live insert subscriptions.
    fn watch_count(&self) -> Result<usize, AppError>;
    fn ping(&self) -> Result<(), AppError>;
}

pub enum DatabaseCommand {
    InsertReading {
        reading: NewReading,
        response: Sender<Result<SensorReading>>,
    },
    ReadingsBetween {
        range: Option<TimeRange>,
        response: Sender<Result<Vec<SensorReading>>>,
    },
    Watch {
        response: Sender<broadcast::Receiver<ChangeEvent>>,
    },
    WatchCount {
        response: Sender<usize>,
    },
    Ping {
        response: Sender<Result<()>>,
    },
}

/// Handle to the store thread.
///
/// The connection lives on one dedicated thread that serves commands in arrival order. The
/// same thread owns the change feed sender, so notifications leave in commit order. Dropping
/// the last handle stops the thread and closes every open subscription.
#[derive(Clone, Debug)]
pub struct Database {
    pub sender: Sender<DatabaseCommand>,
}

impl Database {
    pub fn new(path: &str, feed_capacity: usize) -> Result<Self, AppError> {
        let (tx, rx) = mpsc::channel();

        let conn = Connection::open(path)?;
        initialize(&conn)?;
        let (feed, _) = broadcast::channel(feed_capacity.max(1));
        thread::Builder::new().name("store".to_owned()).spawn(move || serve(conn, rx, feed))?;

        info!(path, "Store opened.");
        Ok(Self { sender: tx })
    }

    fn request<T>(&self, command: impl FnOnce(Sender<T>) -> DatabaseCommand) -> Result<T, AppError> {
        let (response_tx, response_rx) = mpsc::channel();
        self.sender.send(command(response_tx)).map_err(|_| AppError::StoreUnavailable)?;
        response_rx.recv().map_err(|_| AppError::StoreUnavailable)
    }
}

fn serve(conn: Connection, rx: Receiver<DatabaseCommand>, feed: broadcast::Sender<ChangeEvent>) {
    while let Ok(command) = rx.recv() {
        match command {
            DatabaseCommand::InsertReading { reading, response } => {
                let res = insert_reading(&conn, reading);
                if let Ok(stored) = &res {
                    // no subscribers is not an error
                    let notified = feed.send(ChangeEvent::insert(stored.clone())).unwrap_or(0);
                    trace!(id = stored.id, notified, "Insert published.");
                }
                let _ = response.send(res);
            }
            DatabaseCommand::ReadingsBetween { range, response } => {
                let _ = response.send(readings_between(&conn, range));
            }
            DatabaseCommand::Watch { response } => {
                let _ = response.send(feed.subscribe());
            }
            DatabaseCommand::WatchCount { response } => {
                let _ = response.send(feed.receiver_count());
            }
            DatabaseCommand::Ping { response } => {
                let res = conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)).map(|_| ());
                let _ = response.send(res);
            }
        }
    }
    debug!("Store thread stopped.");
}

impl DatabaseTrait for Database {
    fn insert_reading(&self, reading: NewReading) -> Result<SensorReading, AppError> {
        let res = self.request(|response| DatabaseCommand::InsertReading { reading, response })?;
        Ok(res?)
    }

    fn readings_between(&self, range: Option<TimeRange>) -> Result<Vec<SensorReading>, AppError> {
        let res = self.request(|response| DatabaseCommand::ReadingsBetween { range, response })?;
        Ok(res?)
    }

    fn watch_readings(&self) -> Result<broadcast::Receiver<ChangeEvent>, AppError> {
        self.request(|response| DatabaseCommand::Watch { response })
    }

    fn watch_count(&self) -> Result<usize, AppError> {
        self.request(|response| DatabaseCommand::WatchCount { response })
    }

    fn ping(&self) -> Result<(), AppError> {
        let res = self.request(|response| DatabaseCommand::Ping { response })?;
        Ok(res?)
    }
}

pub fn initialize(conn: &Connection) -> Result<()> {
    let query = "
        CREATE TABLE IF NOT EXISTS soil_moisture (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp_ms INTEGER NOT NULL,  -- UTC, epoch milliseconds
            raw_value INTEGER NOT NULL,
            moisture_percentage INTEGER NOT NULL CHECK (moisture_percentage BETWEEN 0 AND 100)
        );
        CREATE INDEX IF NOT EXISTS soil_moisture_timestamp ON soil_moisture (timestamp_ms);
        ";

    conn.execute_batch(query)?;
    Ok(())
}

pub fn insert_reading(conn: &Connection, reading: NewReading) -> Result<SensorReading> {
    conn.execute(
        "INSERT INTO soil_moisture (timestamp_ms, raw_value, moisture_percentage) VALUES (?1, ?2, ?3)",
        params![reading.timestamp.timestamp_millis(), reading.raw_value, reading.moisture_percentage],
    )?;
    Ok(SensorReading::from_new(conn.last_insert_rowid(), reading))
}

pub fn readings_between(conn: &Connection, range: Option<TimeRange>) -> Result<Vec<SensorReading>> {
    let (start, end) = match range {
        Some(range) => (range.start.timestamp_millis(), range.end.timestamp_millis()),
        None => (i64::MIN, i64::MAX),
    };
    let mut stmt = conn.prepare(
        "SELECT id, timestamp_ms, raw_value, moisture_percentage FROM soil_moisture
         WHERE timestamp_ms BETWEEN ?1 AND ?2
         ORDER BY timestamp_ms, id",
    )?;
    let readings = stmt.query_map(params![start, end], reading_from_row)?.collect::<Result<Vec<_>>>()?;
    Ok(readings)
}

fn reading_from_row(row: &Row) -> Result<SensorReading> {
    let ts_ms: i64 = row.get(1)?;
    let timestamp = DateTime::from_timestamp_millis(ts_ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(1, ts_ms))?;
    Ok(SensorReading { id: row.get(0)?, timestamp, raw_value: row.get(2)?, moisture_percentage: row.get(3)? })
}
