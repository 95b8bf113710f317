//! Persistence layer: connection/migration lifecycle, row mappings, and one
//! repository per aggregate.

pub mod database;
pub mod models;
pub mod repository;

pub use database::{DatabaseConfig, Db};
pub use repository::{
    ExperimentRepository, ExplanationRepository, FeedbackRepository, IdempotencyRepository,
    LedgerRepository, PairingSessionRepository, PriceBookRepository, StockRepository,
    SupplierRepository, VintageRepository, WeatherCacheRepository, WineRepository,
};
