//! Domain entities shared by every subsystem.
//!
//! The persistence layer (§4.1) uniquely owns these; other components hold
//! them by value or reference by id, never by exclusive mutable ownership.

mod wine;
mod vintage;
mod stock;
mod ledger;
mod supplier;
mod weather;
mod pairing;
mod feedback;
mod experiment;
mod explanation;
mod user_profile;

pub use wine::{Wine, WineType, WineAlias};
pub use vintage::Vintage;
pub use stock::Stock;
pub use ledger::{LedgerEntry, LedgerEntryType};
pub use supplier::{Supplier, PriceBookRow, AvailabilityStatus};
pub use weather::{WeatherAnalysis, WeatherConfidence, WeatherCacheEntry};
pub use pairing::{PairingRecommendation, SubScores};
pub use feedback::Feedback;
pub use experiment::{
    Experiment, ExperimentStatus, ExperimentVariant, AllocationUnit,
    ExperimentAssignment, ExperimentEvent, ExperimentEventType,
};
pub use explanation::{Explanation, ExplanationEntityType};
pub use user_profile::UserProfile;
