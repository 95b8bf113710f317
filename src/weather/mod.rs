//! External Weather Fetcher (spec §4.3): resilient fetch, normalization and
//! scoring of daily weather series into a [`crate::domain::WeatherAnalysis`],
//! with retries, rate limiting, a kill switch, and regional cache fallback.

mod coordinates;
mod fetcher;
mod processing;
mod rate_limit;
mod retry;

pub use coordinates::{Coordinates, OpenMeteoCoordinateResolver, RegionCoordinateResolver};
pub use fetcher::{DailyWeatherClient, OpenMeteoDailyClient, ResilientWeatherFetcher, WeatherFetcher};
pub use processing::{process_daily_series, DailySeries};
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;
