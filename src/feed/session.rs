use super::{ChangeEvent, Frame};
use crate::{config::Feed as FeedCfg, db::DatabaseTrait, error::AppError};
use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// Counts live sessions. A session is live from `open` until its task has released
/// its subscription and timer.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    live: Arc<AtomicUsize>,
    next_id: Arc<AtomicU64>,
}

impl SessionTracker {
    fn register(&self) -> SessionGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.live.fetch_add(1, Ordering::SeqCst);
        SessionGuard { id, live: self.live.clone() }
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct SessionGuard {
    id: u64,
    live: Arc<AtomicUsize>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        debug!(session = self.id, "Session released.");
    }
}

/// Bridges store insert notifications to dashboard event streams.
///
/// Every session gets its own receiver on the store's broadcast feed, its own keep-alive
/// timer and its own bounded output channel, all owned by a single task. The task ends
/// when the client goes away (output channel closed), on shutdown, or when the store
/// closes the feed, and releases everything it owns on the way out.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    db: Arc<dyn DatabaseTrait>,
    cfg: FeedCfg,
    sessions: SessionTracker,
    shutdown: watch::Receiver<bool>,
}

impl ChangeFeed {
    pub fn new(db: Arc<dyn DatabaseTrait>, cfg: FeedCfg, shutdown: watch::Receiver<bool>) -> Self {
        Self { db, cfg, sessions: SessionTracker::default(), shutdown }
    }

    /// Fails without spawning anything when the store refuses the subscription.
    pub fn open(&self) -> Result<Session, AppError> {
        let subscription = self.db.watch_readings()?;
        let (tx, rx) = mpsc::channel(self.cfg.session_buffer.max(1));
        let guard = self.sessions.register();
        let id = guard.id;
        info!(session = id, live = self.sessions.live(), "Dashboard session opened.");

        let task = tokio::spawn(run_session(guard, subscription, tx, self.cfg.keep_alive(), self.shutdown.clone()));
        Ok(Session { id, frames: rx, task })
    }

    pub fn live_sessions(&self) -> usize {
        self.sessions.live()
    }
}

/// Receiving end of one dashboard session.
#[derive(Debug)]
pub struct Session {
    pub id: u64,
    frames: mpsc::Receiver<Frame>,
    task: JoinHandle<()>,
}

impl Session {
    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }

    /// Detaches the session task. Dropping the stream closes the session.
    pub fn into_stream(self) -> ReceiverStream<Frame> {
        ReceiverStream::new(self.frames)
    }

    pub fn into_parts(self) -> (mpsc::Receiver<Frame>, JoinHandle<()>) {
        (self.frames, self.task)
    }
}

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    // a dropped sender also ends the session
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn run_session(
    guard: SessionGuard, mut subscription: broadcast::Receiver<ChangeEvent>, tx: mpsc::Sender<Frame>,
    keep_alive: Duration, mut shutdown: watch::Receiver<bool>,
) {
    let id = guard.id;
    if tx.send(Frame::Connected).await.is_err() {
        return;
    }

    let mut ticker = interval_at(Instant::now() + keep_alive, keep_alive);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let frame = tokio::select! {
            biased;
            _ = tx.closed() => {
                debug!(session = id, "Client disconnected.");
                break;
            }
            _ = stopped(&mut shutdown) => {
                debug!(session = id, "Shutdown requested.");
                break;
            }
            change = subscription.recv() => match change {
                Ok(evt) => match Frame::change(&evt) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(session = id, reading = evt.full_document.id, error = %e, "Failed to serialize change.");
                        continue;
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(session = id, skipped, "Session fell behind the feed.");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    warn!(session = id, "Change feed closed by the store.");
                    break;
                }
            },
            _ = ticker.tick() => Frame::KeepAlive,
        };

        // a client that stopped reading must not hold the session past shutdown
        let sent = tokio::select! {
            biased;
            _ = stopped(&mut shutdown) => {
                debug!(session = id, "Shutdown requested while writing.");
                break;
            }
            sent = tx.send(frame) => sent,
        };
        if sent.is_err() {
            debug!(session = id, "Write to client failed.");
            break;
        }
    }
    info!(session = id, "Dashboard session closed.");
}
