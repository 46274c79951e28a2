use axum_server::Handle;
use soilwatch::api::run_web_server;
use soilwatch::config::{run_options::get_args, Config};
use soilwatch::db::Database;
use soilwatch::state::AppState;
use soilwatch::time::RealTimeProvider;
use soilwatch::utils::start_log;
use std::{error::Error, net::SocketAddr, sync::Arc};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let Some(args) = get_args() else {
        return Ok(());
    };
    let cfg = Config::load(&args)?;
    start_log(&cfg.log.filter);

    info!(config = %args.cfg_file.display(), "Starting application...");

    let db = Arc::new(Database::new(&cfg.database.name, cfg.feed.channel_capacity)?);
    let app_state = AppState::new(db, Arc::new(RealTimeProvider), &cfg);

    let signal_state = app_state.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => signal_state.shutdown(),
            Err(e) => warn!(error = %e, "Unable to listen for Ctrl-C."),
        }
    });

    let addr: SocketAddr = cfg.web_server.address.parse()?;
    run_web_server(app_state, addr, Handle::new()).await?;
    info!("Bye.");
    Ok(())
}
