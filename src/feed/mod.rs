pub mod session;

pub use session::{ChangeFeed, Session, SessionTracker};

use crate::db::models::SensorReading;
use axum::response::sse::Event;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Insert,
}

/// Notification for one write to the readings collection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub operation_type: OperationType,
    pub full_document: SensorReading,
}

impl ChangeEvent {
    pub fn insert(full_document: SensorReading) -> Self {
        Self { operation_type: OperationType::Insert, full_document }
    }
}

/// One unit pushed to a dashboard over the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Connected,
    KeepAlive,
    /// serialized [`ChangeEvent`]
    Data(String),
}

impl Frame {
    pub const CONNECTED: &'static str = "Connected";
    pub const KEEP_ALIVE: &'static str = "keep-alive";

    pub fn change(evt: &ChangeEvent) -> Result<Self, serde_json::Error> {
        Ok(Frame::Data(serde_json::to_string(evt)?))
    }

    /// Wire form, as written to the text event stream.
    #[cfg(test)]
    pub fn to_text(&self) -> String {
        match self {
            Frame::Connected => format!("data: {}\n\n", Self::CONNECTED),
            Frame::KeepAlive => format!(":{}\n\n", Self::KEEP_ALIVE),
            Frame::Data(payload) => format!("data: {}\n\n", payload),
        }
    }

    pub fn into_event(self) -> Event {
        match self {
            Frame::Connected => Event::default().data(Self::CONNECTED),
            Frame::KeepAlive => Event::default().comment(Self::KEEP_ALIVE),
            Frame::Data(payload) => Event::default().data(payload),
        }
    }
}
