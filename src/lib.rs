//! Cellar Intelligence: a wine-cellar recommendation and inventory
//! intelligence core built from four cooperating subsystems (Pairing
//! Engine, Vintage Intelligence, Inventory Ledger, Online Learning &
//! Experimentation) over one persistence layer, one cache fabric, one
//! background scheduler, and a shared error/observability surface.
//!
//! [`AppServices::bootstrap`] wires every subsystem's concrete dependencies
//! explicitly — no global singletons — so a collaborator (an HTTP server,
//! a CLI, a test harness) gets back one struct holding everything it needs
//! to drive the core.

pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod http;
pub mod learning;
pub mod ledger;
pub mod observability;
pub mod pairing;
pub mod realtime;
pub mod scheduler;
pub mod storage;
pub mod vintage_intelligence;
pub mod weather;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::cache::CacheFabric;
use crate::config::AppConfig;
use crate::dispatcher::{register_default_tools, ToolDispatcher, ToolDispatcherBuilder};
use crate::error::Result;
use crate::ledger::LedgerEngine;
use crate::observability::RumBuffer;
use crate::pairing::PairingEngine;
use crate::realtime::RealtimeBroadcaster;
use crate::scheduler::WeatherScheduler;
use crate::storage::repository::{
    ExperimentRepository, ExplanationRepository, FeedbackRepository, IdempotencyRepository,
    LedgerRepository, PairingSessionRepository, StockRepository, SupplierRepository,
    VintageRepository, WeatherCacheRepository, WineRepository,
};
use crate::storage::{DatabaseConfig, Db};
use crate::vintage_intelligence::{VintageIntelligence, VintageMemo};
use crate::weather::{
    Coordinates, DailyWeatherClient, OpenMeteoCoordinateResolver, OpenMeteoDailyClient,
    RateLimiter, RegionCoordinateResolver, ResilientWeatherFetcher, RetryPolicy, WeatherFetcher,
};

/// Every subsystem, wired and ready. Construct once per process via
/// [`AppServices::bootstrap`]; every field is an `Arc` so the whole struct
/// (or any subset of its fields) can be cloned cheaply into request-scoped
/// handler closures, the dispatcher's tool registry, and the background
/// scheduler's task loop alike.
#[derive(Clone)]
pub struct AppServices {
    pub config: Arc<AppConfig>,
    pub db: Arc<Db>,

    pub wines: Arc<WineRepository>,
    pub vintages: Arc<VintageRepository>,
    pub stock: Arc<StockRepository>,
    pub ledger_repo: Arc<LedgerRepository>,
    pub suppliers: Arc<SupplierRepository>,
    pub explanations: Arc<ExplanationRepository>,
    pub feedback_repo: Arc<FeedbackRepository>,
    pub experiments_repo: Arc<ExperimentRepository>,
    pub idempotency: Arc<IdempotencyRepository>,
    pub pairing_sessions: Arc<PairingSessionRepository>,
    pub weather_cache: Arc<WeatherCacheRepository>,

    pub cache: Arc<CacheFabric>,
    pub weather_fetcher: Arc<dyn WeatherFetcher>,
    pub vintage_intelligence: Arc<VintageIntelligence>,
    pub ledger: Arc<LedgerEngine>,
    pub pairing: Arc<PairingEngine>,
    pub weather_scheduler: Arc<WeatherScheduler>,

    pub weights_cache: Arc<learning::WeightsCache>,
    pub assignment_service: Arc<learning::AssignmentService>,
    pub event_ingestion: Arc<learning::EventIngestionService>,
    pub feedback_ingestion: Arc<learning::FeedbackIngestion>,
    pub user_profiles: Arc<learning::UserProfileService>,
    pub experiment_manager: Arc<learning::ExperimentManager>,

    pub realtime: Arc<RealtimeBroadcaster>,
    pub rum: Arc<RumBuffer>,
    pub dispatcher: Arc<ToolDispatcher>,
}

impl AppServices {
    /// Connects the database, runs migrations, and constructs every
    /// subsystem in dependency order: repositories first, then the engines
    /// that compose them, then the cross-cutting handles (realtime,
    /// observability, dispatcher) that reference the engines.
    pub async fn bootstrap(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let db_config = DatabaseConfig {
            url: config.database.url.clone(),
            max_connections: config.database.max_connections,
            connection_timeout_secs: 30,
            run_migrations: config.database.run_migrations,
        };
        let db = Arc::new(Db::connect(&db_config).await?);

        let wines = Arc::new(WineRepository::new(db.pool().clone()));
        let vintages = Arc::new(VintageRepository::new(db.pool().clone()));
        let stock = Arc::new(StockRepository::new(db.pool().clone()));
        let ledger_repo = Arc::new(LedgerRepository::new(db.pool().clone()));
        let suppliers = Arc::new(SupplierRepository::new(db.pool().clone()));
        let explanations = Arc::new(ExplanationRepository::new(db.pool().clone()));
        let feedback_repo = Arc::new(FeedbackRepository::new(db.pool().clone()));
        let experiments_repo = Arc::new(ExperimentRepository::new(db.pool().clone()));
        let idempotency = Arc::new(IdempotencyRepository::new(db.pool().clone()));
        let pairing_sessions = Arc::new(PairingSessionRepository::new(db.pool().clone()));
        let weather_cache = Arc::new(WeatherCacheRepository::new(db.pool().clone()));

        let cache = Arc::new(CacheFabric::new(
            config.cache.strategy,
            config.cache.max_size,
            config.cache.memory_limit_bytes,
            Duration::from_secs(config.cache.default_ttl_secs),
        ));

        let http_client = reqwest::Client::new();
        let coordinate_resolver: Arc<dyn RegionCoordinateResolver> = Arc::new(
            OpenMeteoCoordinateResolver::new(http_client.clone(), config.open_meteo.geocoding_url.clone()),
        );
        let daily_client: Arc<dyn DailyWeatherClient> =
            Arc::new(OpenMeteoDailyClient::new(http_client, config.open_meteo.base_url.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(
            config.open_meteo.max_requests,
            config.open_meteo.window_ms,
        ));
        let retry_policy = RetryPolicy::default();
        let weather_fetcher: Arc<dyn WeatherFetcher> = Arc::new(ResilientWeatherFetcher::new(
            Arc::clone(&weather_cache),
            Arc::clone(&explanations),
            coordinate_resolver,
            daily_client,
            rate_limiter,
            retry_policy,
            config.disable_external_calls,
        ));

        let memo = Arc::new(VintageMemo::new());
        let vintage_intelligence = Arc::new(VintageIntelligence::new(
            Arc::clone(&vintages),
            Arc::clone(&weather_fetcher),
            memo,
        ));

        let ledger = Arc::new(LedgerEngine::new(
            Arc::clone(&db),
            Arc::clone(&stock),
            Arc::clone(&ledger_repo),
            Arc::clone(&wines),
            Arc::clone(&vintages),
            Arc::clone(&vintage_intelligence),
        ));

        let weights_cache = Arc::new(learning::WeightsCache::new(Arc::clone(&feedback_repo)));
        let pairing = Arc::new(PairingEngine::new(
            Arc::clone(&wines),
            Arc::clone(&db),
            Arc::clone(&pairing_sessions),
            Arc::clone(&explanations),
            Arc::clone(&cache),
            None::<Arc<dyn pairing::LlmProvider>>,
            Some(Arc::clone(&weights_cache) as Arc<dyn pairing::PairingWeightsSource>),
            config.disable_external_calls,
        ));

        let weather_scheduler = Arc::new(WeatherScheduler::new(
            Arc::clone(&weather_fetcher),
            4,
            retry_policy,
        ));

        let assignment_service = Arc::new(learning::AssignmentService::new(Arc::clone(&experiments_repo)));
        let event_ingestion = Arc::new(learning::EventIngestionService::new(Arc::clone(&experiments_repo)));
        let feedback_ingestion = Arc::new(learning::FeedbackIngestion::new(Arc::clone(&feedback_repo)));
        let user_profiles = Arc::new(learning::UserProfileService::new(
            Arc::clone(&feedback_repo),
            Arc::clone(&pairing_sessions),
            Arc::clone(&wines),
        ));
        let experiment_manager = Arc::new(learning::ExperimentManager::new(Arc::clone(&experiments_repo)));

        let realtime = Arc::new(RealtimeBroadcaster::new());
        let rum = Arc::new(RumBuffer::new());

        let dispatcher_builder = register_default_tools(
            ToolDispatcherBuilder::new(),
            Arc::clone(&wines),
            Arc::clone(&ledger),
            Arc::clone(&realtime),
        );
        let dispatcher = Arc::new(dispatcher_builder.build(Arc::clone(&idempotency)));

        info!(environment = ?config.environment, "cellar intelligence services bootstrapped");

        Ok(Self {
            config: Arc::new(config),
            db,
            wines,
            vintages,
            stock,
            ledger_repo,
            suppliers,
            explanations,
            feedback_repo,
            experiments_repo,
            idempotency,
            pairing_sessions,
            weather_cache,
            cache,
            weather_fetcher,
            vintage_intelligence,
            ledger,
            pairing,
            weather_scheduler,
            weights_cache,
            assignment_service,
            event_ingestion,
            feedback_ingestion,
            user_profiles,
            experiment_manager,
            realtime,
            rum,
            dispatcher,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bootstrap_wires_every_subsystem_against_an_in_memory_database() {
        let services = AppServices::bootstrap(AppConfig::default()).await.unwrap();
        assert!(services.db.health_check().await.is_ok());
        assert!(!services.dispatcher.tool_names().is_empty());
    }
}
