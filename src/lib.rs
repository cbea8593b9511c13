pub mod capability;
pub mod collaborators;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod host;
pub mod models;
pub mod persistence;
pub mod runtime;
pub mod settings;
pub mod stores;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info};

use capability::{CapabilityManager, EnginePort, NoEngine, OllamaPort};
use collaborators::{ForwardedCapture, OutboxReporter};
use config::HostConfig;
use db::Database;
use dispatch::Dispatcher;
use persistence::{PersistentStore, WriteBehind};
use runtime::{Collaborators, Coordinator};

pub use utils::init_logging;

/// Process entry point: serve the browser over stdio until it hangs up.
pub fn run() {
    let config = match HostConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            init_logging(false);
            error!("Invalid host configuration: {err:#}");
            std::process::exit(1);
        }
    };
    init_logging(config.debug);

    info!("Tabpilot host starting up...");

    let outcome = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
        .and_then(|runtime| runtime.block_on(serve_stdio(config)));

    if let Err(err) = outcome {
        error!("Tabpilot host stopped: {err:#}");
        std::process::exit(1);
    }
    info!("Tabpilot host shut down");
}

async fn serve_stdio(config: HostConfig) -> Result<()> {
    let database = Database::new(config.database_path())?;
    info!("Using database at {}", database.path().display());

    let store: Arc<dyn PersistentStore> = Arc::new(database);
    let writer = WriteBehind::spawn(store.clone());

    let port: Arc<dyn EnginePort> = match &config.engine_url {
        Some(url) => Arc::new(OllamaPort::new(url, &config.engine_model)),
        None => {
            info!("No engine URL configured; text features use rule-based processing");
            Arc::new(NoEngine)
        }
    };
    let capability = Arc::new(CapabilityManager::new(port).with_load_timeout(config.load_timeout));

    let coordinator = Arc::new(
        Coordinator::hydrate(
            store,
            writer,
            Collaborators {
                capability: capability.clone(),
                screenshot_source: Arc::new(ForwardedCapture),
                reporter: Arc::new(OutboxReporter::new(config.outbox_dir())),
            },
        )
        .await,
    );

    // Warm the engine now so the first request does not pay for the load.
    tokio::spawn(async move {
        capability.initialize().await;
    });

    let served = host::serve(
        Dispatcher::new(coordinator.clone()),
        tokio::io::stdin(),
        tokio::io::stdout(),
    )
    .await;

    coordinator.flush().await;
    served
}
