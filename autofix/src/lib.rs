use crate::config::{Config, ValidationError};
use crate::events::InterfaceEntrySerializer;
use crate::features::StaticFeatureFlags;
use crate::orchestrator::AutofixOrchestrator;
use crate::scheduler::DelayQueue;
use crate::seer::{SeerClient, SeerError};
use crate::service::AutofixService;
use crate::store::{Fixtures, InMemoryStore, StoreError};
use crate::timeout::TimeoutWatchdog;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;

pub mod config;
pub mod errors;
pub mod events;
pub mod features;
pub mod metadata;
pub mod metrics_defs;
pub mod models;
pub mod orchestrator;
pub mod repos;
pub mod scheduler;
pub mod seer;
pub mod service;
pub mod store;
pub mod timeout;

#[cfg(test)]
mod testutils;

const TIMEOUT_QUEUE_CAPACITY: usize = 1024;

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Validation(#[from] ValidationError),
    #[error("could not create seer client: {0}")]
    Seer(#[from] SeerError),
    #[error("could not load fixtures: {0}")]
    Store(#[from] StoreError),
}

pub async fn run(config: Config) -> Result<(), RunError> {
    config.validate()?;

    let fixtures = match &config.fixtures_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading fixtures");
            Fixtures::from_file(path)?
        }
        None => Fixtures::default(),
    };
    let store = Arc::new(InMemoryStore::from_fixtures(fixtures));

    let seer = SeerClient::new(&config.seer.autofix_url, config.seer.request_timeout())?;
    tracing::info!(url = %seer.autofix_url(), "Sending autofix requests to seer");

    let (queue, timeouts) = DelayQueue::new(TIMEOUT_QUEUE_CAPACITY);
    tokio::spawn(TimeoutWatchdog::new(store.clone()).run(timeouts));

    let orchestrator = AutofixOrchestrator::new(
        store.clone(),
        store.clone(),
        store,
        Arc::new(StaticFeatureFlags::new(config.features.clone())),
        Arc::new(InterfaceEntrySerializer),
        seer,
        Arc::new(queue),
        config.timeout(),
    );

    let autofix_service = AutofixService::new(Arc::new(orchestrator));
    let admin_service = AdminService::new(|| true);

    let autofix_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        autofix_service,
    );
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );
    tokio::try_join!(autofix_task, admin_task)?;

    Ok(())
}
