use crate::{config::Config, db::DatabaseTrait, feed::ChangeFeed, mailbox::CommandMailbox, time::TimeProvider};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Shared by every handler. Owns the command slot and the feed bridge explicitly,
/// so each test builds its own isolated instance.
#[derive(Debug)]
pub struct AppState {
    pub db: Arc<dyn DatabaseTrait>,
    pub mailbox: CommandMailbox,
    pub feed: ChangeFeed,
    pub time_provider: Arc<dyn TimeProvider>,
    shutdown_tx: watch::Sender<bool>,
}

impl AppState {
    pub fn new(db: Arc<dyn DatabaseTrait>, time_provider: Arc<dyn TimeProvider>, cfg: &Config) -> Arc<Self> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Arc::new(Self {
            feed: ChangeFeed::new(db.clone(), cfg.feed, shutdown_rx),
            mailbox: CommandMailbox::new(cfg.mailbox),
            db,
            time_provider,
            shutdown_tx,
        })
    }

    /// Ends every open dashboard session and lets the web server drain.
    pub fn shutdown(&self) {
        if !self.shutdown_tx.send_replace(true) {
            info!("Shutdown requested.");
        }
    }

    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }
}
