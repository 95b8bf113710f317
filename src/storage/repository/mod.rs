mod wine;
mod vintage;
mod stock;
mod supplier;
mod weather;
mod explanation;
mod feedback;
mod experiment;
mod idempotency;
mod pairing;

pub use wine::WineRepository;
pub use vintage::VintageRepository;
pub use stock::{StockRepository, LedgerRepository};
pub use supplier::{SupplierRepository, PriceBookRepository};
pub use weather::WeatherCacheRepository;
pub use explanation::ExplanationRepository;
pub use feedback::FeedbackRepository;
pub use experiment::ExperimentRepository;
pub use idempotency::IdempotencyRepository;
pub use pairing::PairingSessionRepository;
