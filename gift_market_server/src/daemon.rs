//! Wires the engine together: the database, the out-of-band verification hooks and the scheduled verification jobs.
use std::{sync::Arc, time::Duration};

use gift_market_engine::{
    db_types::VerificationKind,
    events::{EventHandlers, EventHooks, EventProducers, OrderChangedEvent, VerificationTaskEvent},
    jobs::{JobKind, VerificationJob},
    traits::{MarketDatabase, VerificationManagement},
    verification::InventorySource,
    worker::{Scheduler, SchedulerHandle, Task},
    MarketFlowApi,
    MarketLimits,
    ProfileResolver,
    SqliteDatabase,
    VerificationApi,
};
use log::*;
use tokio::task::JoinHandle;

use crate::{config::ServerConfig, errors::ServerError, integrations::steam::SteamInventory};

/// The running daemon. Dropping it without calling [`MarketDaemon::shutdown`] leaves the jobs running until the
/// runtime stops.
pub struct MarketDaemon<R> {
    db: SqliteDatabase,
    resolver: R,
    limits: MarketLimits,
    producers: EventProducers,
    handlers: Vec<JoinHandle<()>>,
    scheduler: SchedulerHandle,
    shutdown_timeout: Duration,
}

impl<R> MarketDaemon<R>
where R: ProfileResolver + Clone
{
    /// Starts the event handlers and the job scheduler on an already migrated database.
    pub fn start<S>(config: &ServerConfig, db: SqliteDatabase, source: S, resolver: R) -> Self
    where S: InventorySource + Clone + 'static {
        let api = VerificationApi::new(db.clone()).with_policy(config.status_policy);
        let handlers = create_event_handlers(config.event_buffer_size, api.clone(), source.clone());
        let producers = handlers.producers();
        let handlers = handlers.start_handlers();
        let tasks = create_verification_jobs(config, api, source);
        let scheduler = Scheduler::new(tasks).with_shutdown_timeout(config.shutdown_timeout).start();
        info!("🚀️ Gift market daemon started with status policy {}", config.status_policy);
        Self {
            db,
            resolver,
            limits: config.limits,
            producers,
            handlers,
            scheduler,
            shutdown_timeout: config.shutdown_timeout,
        }
    }

    /// A market API whose verification requests are served by this daemon.
    pub fn market_api(&self) -> MarketFlowApi<SqliteDatabase, R> {
        MarketFlowApi::new(self.db.clone(), self.resolver.clone(), self.producers.clone()).with_limits(self.limits)
    }

    pub fn jobs_in_flight(&self) -> usize {
        self.scheduler.in_flight()
    }

    /// Stops the scheduler, then lets the event handlers drain. Market APIs handed out by [`Self::market_api`] must
    /// be dropped first, or the handlers will be abandoned once the shutdown timeout expires.
    pub async fn shutdown(self) -> Result<(), ServerError> {
        let Self { db, producers, handlers, mut scheduler, shutdown_timeout, .. } = self;
        let result = scheduler.shutdown().await;
        drop(producers);
        for handler in handlers {
            match tokio::time::timeout(shutdown_timeout, handler).await {
                Ok(Ok(())) => {},
                Ok(Err(e)) => error!("📬️ An event handler failed while shutting down. {e}"),
                Err(_) => {
                    warn!("📬️ An event handler did not drain within {}s. Abandoning it.", shutdown_timeout.as_secs())
                },
            }
        }
        db.close().await;
        result.map_err(ServerError::from)
    }
}

/// Runs the daemon until Ctrl-C is pressed.
pub async fn run_daemon(config: ServerConfig) -> Result<(), ServerError> {
    if config.database_url.is_empty() {
        return Err(ServerError::ConfigurationError("GMX_DATABASE_URL is not set".into()));
    }
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await?;
    let steam = SteamInventory::new(config.steam.clone())?;
    let daemon = MarketDaemon::start(&config, db, steam.clone(), steam);
    tokio::signal::ctrl_c().await?;
    info!("🚀️ Shutdown requested. Waiting up to {}s for running jobs.", config.shutdown_timeout.as_secs());
    daemon.shutdown().await
}

/// One scheduled job per [`JobKind`], configured from the daemon settings.
pub fn create_verification_jobs<B, S>(config: &ServerConfig, api: VerificationApi<B>, source: S) -> Vec<Arc<dyn Task>>
where
    B: VerificationManagement + Clone + 'static,
    S: InventorySource + Clone + 'static,
{
    [JobKind::InventoryCheck, JobKind::InventoryRecheck, JobKind::DeliveryCheck, JobKind::GiftWrappedCheck]
        .into_iter()
        .map(|kind| {
            let job = VerificationJob::new(kind, api.clone(), source.clone()).with_config(config.job_config(kind));
            Arc::new(job) as Arc<dyn Task>
        })
        .collect()
}

/// Hooks that log order changes and verify single orders as soon as the market asks for it.
pub fn create_event_handlers<B, S>(buffer_size: usize, api: VerificationApi<B>, source: S) -> EventHandlers
where
    B: VerificationManagement + Clone + 'static,
    S: InventorySource + Clone + 'static,
{
    let mut hooks = EventHooks::default();
    hooks.on_order_changed(|ev: OrderChangedEvent| {
        let order = ev.order;
        debug!("📬️ {} #{} {:?}. Status: {}", order.order_type, order.id, ev.change, order.status);
        Box::pin(async {})
    });
    let inventory = Arc::new(VerificationJob::new(JobKind::InventoryCheck, api.clone(), source.clone()));
    let delivery = Arc::new(VerificationJob::new(JobKind::DeliveryCheck, api, source));
    hooks.on_verification_task(move |ev: VerificationTaskEvent| {
        let inventory = Arc::clone(&inventory);
        let delivery = Arc::clone(&delivery);
        Box::pin(async move {
            let order_id = ev.details.order.id;
            debug!("📬️ {:?} verification requested for order {order_id} ({:?} priority)", ev.kind, ev.priority);
            let result = match ev.kind {
                VerificationKind::Inventory => inventory.verify_one(&ev.details).await,
                VerificationKind::Delivery => delivery.verify_one(&ev.details).await,
            };
            match result {
                Ok(Some(record)) => info!("📬️ Order {order_id} verified out of band: {}", record.status),
                Ok(None) => debug!("📬️ Order {order_id} could not be verified out of band"),
                Err(e) => error!("📬️ Could not record the verification of order {order_id}. {e}"),
            }
        })
    });
    EventHandlers::new(buffer_size, hooks)
}
