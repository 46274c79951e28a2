#![allow(dead_code)]

use axum::{
    body::{Body, BodyDataStream},
    extract::Request,
    response::Response,
    Router,
};
use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use soilwatch::feed::ChangeEvent;
use std::time::Duration;
use tower::ServiceExt;

pub const START_TIME: i64 = 1_717_228_800; // 2024-06-01T08:00:00Z

pub fn get(uri: &str) -> Request {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &str) -> Request {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

pub async fn send(app: &Router, request: Request) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn json_body<T: DeserializeOwned>(response: Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Splits an event stream body into `data:` payloads, skipping comment frames.
pub struct EventReader<S> {
    stream: S,
    pending: String,
}

impl<S, B, E> EventReader<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Debug,
{
    pub fn new(stream: S) -> Self {
        Self { stream, pending: String::new() }
    }

    pub async fn next_data(&mut self) -> String {
        loop {
            if let Some(pos) = self.pending.find("\n\n") {
                let event: String = self.pending.drain(..pos + 2).collect();
                if let Some(data) = event.lines().find_map(|line| line.strip_prefix("data: ")) {
                    return data.to_owned();
                }
                continue;
            }
            let chunk = tokio::time::timeout(Duration::from_secs(5), self.stream.next())
                .await
                .expect("event stream stalled")
                .expect("event stream ended")
                .unwrap();
            self.pending.push_str(std::str::from_utf8(chunk.as_ref()).unwrap());
        }
    }

    pub async fn next_change(&mut self) -> ChangeEvent {
        serde_json::from_str(&self.next_data().await).unwrap()
    }

    /// `None` once the server ended the stream.
    pub async fn next_chunk(&mut self) -> Option<Result<B, E>> {
        tokio::time::timeout(Duration::from_secs(5), self.stream.next()).await.expect("event stream stalled")
    }
}

pub fn sse_reader(response: Response) -> EventReader<BodyDataStream> {
    EventReader::new(response.into_body().into_data_stream())
}

/// Polls until `check` holds, failing after a few seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}
