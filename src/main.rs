use std::sync::Arc;
use tokio::sync::Notify;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod model;
mod routing;
mod server;
mod store;

use server::{create_reusable_listener, start_server_loop, start_signal_handler};
use store::EmployeeStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::Config::load()?;
    logger::init(&cfg)?;

    // Build the Tokio runtime, sizing worker threads from config
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    // Storage must be reachable before the port is opened
    let store = match EmployeeStore::connect(&cfg.database).await {
        Ok(store) => store,
        Err(e) => {
            logger::log_error(&format!("Failed to connect to storage: {e}"));
            return Err(e.into());
        }
    };
    logger::log_store_connected(store.backend_name(), cfg.database.max_connections);

    let listener = create_reusable_listener(addr)?;
    logger::log_server_start(&addr, &cfg, store.backend_name());

    let state = Arc::new(config::AppState::new(cfg, store));
    let shutdown = Arc::new(Notify::new());
    start_signal_handler(Arc::clone(&shutdown))?;

    start_server_loop(listener, Arc::clone(&state), shutdown).await;

    state.store.close().await;
    Ok(())
}
