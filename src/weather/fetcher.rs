//! The resilient weather fetcher itself (§4.3), composing coordinate
//! resolution, the daily-series client, retries, rate limiting, the
//! `disableExternalCalls` kill switch, and regional cache fallback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use tracing::warn;

use crate::domain::{Explanation, ExplanationEntityType, WeatherAnalysis};
use crate::error::Result;
use crate::storage::repository::{ExplanationRepository, WeatherCacheRepository};

use super::coordinates::{Coordinates, RegionCoordinateResolver};
use super::processing::{process_daily_series, DailySeries};
use super::rate_limit::RateLimiter;
use super::retry::RetryPolicy;

const WEATHER_CACHE_TTL_DAYS: i64 = 30;

#[async_trait]
pub trait DailyWeatherClient: Send + Sync {
    async fn fetch_daily(&self, coords: Coordinates, year: i32) -> Result<DailySeries>;
}

#[async_trait]
pub trait WeatherFetcher: Send + Sync {
    /// `region_token` must already be normalized (§4.4 step 1); `vineyard_alias`
    /// is the optional more-specific cache key component.
    async fn fetch(
        &self,
        region_token: &str,
        year: i32,
        vineyard_alias: Option<&str>,
    ) -> Result<Option<WeatherAnalysis>>;
}

pub struct OpenMeteoDailyClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenMeteoDailyClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[derive(serde::Deserialize)]
struct OpenMeteoDaily {
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    temperature_2m_mean: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    sunshine_duration: Vec<Option<f64>>,
}

#[derive(serde::Deserialize)]
struct OpenMeteoResponse {
    daily: OpenMeteoDaily,
}

#[async_trait]
impl DailyWeatherClient for OpenMeteoDailyClient {
    async fn fetch_daily(&self, coords: Coordinates, year: i32) -> Result<DailySeries> {
        use crate::error::CellarError;

        let start = format!("{year}-04-01");
        let end = format!("{year}-10-31");
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", coords.latitude.to_string()),
                ("longitude", coords.longitude.to_string()),
                ("start_date", start),
                ("end_date", end),
                (
                    "daily",
                    "temperature_2m_max,temperature_2m_min,temperature_2m_mean,precipitation_sum,sunshine_duration"
                        .to_string(),
                ),
            ])
            .send()
            .await
            .map_err(|e| CellarError::ServiceUnavailable(format!("weather request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CellarError::ServiceUnavailable("rate limited (429)".into()));
        }
        if !response.status().is_success() {
            return Err(CellarError::ServiceUnavailable(format!(
                "weather provider returned {}",
                response.status()
            )));
        }

        let body: OpenMeteoResponse = response
            .json()
            .await
            .map_err(|e| CellarError::ServiceUnavailable(format!("weather decode failed: {e}")))?;

        let expected_days = body.daily.temperature_2m_mean.len();
        let unwrap_series = |v: Vec<Option<f64>>| -> Vec<f64> { v.into_iter().flatten().collect() };

        Ok(DailySeries {
            temp_max_c: unwrap_series(body.daily.temperature_2m_max),
            temp_min_c: unwrap_series(body.daily.temperature_2m_min),
            temp_mean_c: unwrap_series(body.daily.temperature_2m_mean),
            precipitation_mm: unwrap_series(body.daily.precipitation_sum),
            sunshine_hours: unwrap_series(body.daily.sunshine_duration)
                .into_iter()
                .map(|secs| secs / 3600.0)
                .collect(),
            expected_days,
        })
    }
}

pub struct ResilientWeatherFetcher {
    cache_repo: Arc<WeatherCacheRepository>,
    explanations: Arc<ExplanationRepository>,
    coordinate_resolver: Arc<dyn RegionCoordinateResolver>,
    daily_client: Arc<dyn DailyWeatherClient>,
    rate_limiter: Arc<RateLimiter>,
    retry_policy: RetryPolicy,
    disable_external_calls: bool,
    /// Count of upstream daily-weather calls actually issued; exposed for
    /// the resilience property test in spec §8 ("makes exactly N+1 upstream
    /// calls").
    upstream_calls: AtomicU64,
}

impl ResilientWeatherFetcher {
    pub fn new(
        cache_repo: Arc<WeatherCacheRepository>,
        explanations: Arc<ExplanationRepository>,
        coordinate_resolver: Arc<dyn RegionCoordinateResolver>,
        daily_client: Arc<dyn DailyWeatherClient>,
        rate_limiter: Arc<RateLimiter>,
        retry_policy: RetryPolicy,
        disable_external_calls: bool,
    ) -> Self {
        Self {
            cache_repo,
            explanations,
            coordinate_resolver,
            daily_client,
            rate_limiter,
            retry_policy,
            disable_external_calls,
            upstream_calls: AtomicU64::new(0),
        }
    }

    pub fn upstream_call_count(&self) -> u64 {
        self.upstream_calls.load(Ordering::SeqCst)
    }

    async fn record_explanation(&self, region_token: &str, year: i32, factors: &[&str]) {
        let explanation = Explanation::new(
            ExplanationEntityType::Weather,
            format!("{region_token}:{year}"),
            "weather data unavailable; degraded to fallback",
            factors.iter().map(|f| f.to_string()).collect(),
            "system",
        );
        if let Err(err) = self.explanations.append(&explanation).await {
            warn!(error = %err, "failed to persist weather explanation");
        }
    }

    async fn try_regional_fallback(&self, region_token: &str, year: i32) -> Result<Option<WeatherAnalysis>> {
        self.cache_repo.get_region_fallback(region_token, year).await
    }
}

#[async_trait]
impl WeatherFetcher for ResilientWeatherFetcher {
    async fn fetch(
        &self,
        region_token: &str,
        year: i32,
        vineyard_alias: Option<&str>,
    ) -> Result<Option<WeatherAnalysis>> {
        if let Some(hit) = self.cache_repo.get(region_token, year, vineyard_alias).await? {
            return Ok(Some(hit));
        }

        if vineyard_alias.is_some() {
            if let Some(fallback) = self.try_regional_fallback(region_token, year).await? {
                self.record_explanation(region_token, year, &["regional_cache_fallback"]).await;
                return Ok(Some(fallback));
            }
        }

        if self.disable_external_calls {
            self.record_explanation(region_token, year, &["external_disabled"]).await;
            return Ok(None);
        }

        let coords = match self.coordinate_resolver.resolve(region_token).await {
            Ok(Some(c)) => c,
            _ => {
                self.record_explanation(region_token, year, &["api_error"]).await;
                return Ok(None);
            }
        };

        let mut series_result = None;
        for attempt in 0..=self.retry_policy.attempts {
            self.rate_limiter.acquire().await;
            self.upstream_calls.fetch_add(1, Ordering::SeqCst);
            match self.daily_client.fetch_daily(coords, year).await {
                Ok(series) => {
                    series_result = Some(series);
                    break;
                }
                Err(err) if attempt < self.retry_policy.attempts => {
                    warn!(attempt, error = %err, "weather fetch failed, retrying");
                    tokio::time::sleep(self.retry_policy.delay_for_attempt(attempt)).await;
                }
                Err(err) => {
                    warn!(error = %err, "weather fetch exhausted retries");
                }
            }
        }

        let series = match series_result {
            Some(s) => s,
            None => {
                if let Some(fallback) = self.try_regional_fallback(region_token, year).await? {
                    self.record_explanation(region_token, year, &["regional_cache_fallback"]).await;
                    return Ok(Some(fallback));
                }
                self.record_explanation(region_token, year, &["api_error"]).await;
                return Ok(None);
            }
        };

        let analysis = process_daily_series(region_token, vineyard_alias, year, &series);
        let expires_at = Utc::now() + ChronoDuration::days(WEATHER_CACHE_TTL_DAYS);
        self.cache_repo
            .upsert(region_token, year, vineyard_alias, &analysis, expires_at)
            .await?;

        Ok(Some(analysis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Db, DatabaseConfig};
    use std::sync::atomic::{AtomicUsize, Ordering as StdOrdering};

    struct FixedResolver;

    #[async_trait]
    impl RegionCoordinateResolver for FixedResolver {
        async fn resolve(&self, _region: &str) -> Result<Option<Coordinates>> {
            Ok(Some(Coordinates { latitude: 44.0, longitude: 0.0 }))
        }
    }

    struct FlakyClient {
        fail_times: usize,
        calls: AtomicUsize,
    }

    fn sample_series() -> DailySeries {
        DailySeries {
            temp_max_c: vec![25.0; 100],
            temp_min_c: vec![10.0; 100],
            temp_mean_c: vec![17.0; 100],
            precipitation_mm: vec![3.0; 100],
            sunshine_hours: vec![7.0; 100],
            expected_days: 100,
        }
    }

    #[async_trait]
    impl DailyWeatherClient for FlakyClient {
        async fn fetch_daily(&self, _coords: Coordinates, _year: i32) -> Result<DailySeries> {
            let n = self.calls.fetch_add(1, StdOrdering::SeqCst);
            if n < self.fail_times {
                Err(crate::error::CellarError::ServiceUnavailable("429".into()))
            } else {
                Ok(sample_series())
            }
        }
    }

    async fn test_fetcher(fail_times: usize) -> (ResilientWeatherFetcher, Arc<FlakyClient>) {
        let db = Db::connect(&DatabaseConfig::default()).await.unwrap();
        let cache_repo = Arc::new(WeatherCacheRepository::new(db.pool().clone()));
        let explanations = Arc::new(ExplanationRepository::new(db.pool().clone()));
        let client = Arc::new(FlakyClient {
            fail_times,
            calls: AtomicUsize::new(0),
        });
        let fetcher = ResilientWeatherFetcher::new(
            cache_repo,
            explanations,
            Arc::new(FixedResolver),
            client.clone(),
            Arc::new(RateLimiter::new(1000, 1000)),
            RetryPolicy {
                attempts: 2,
                initial_delay_ms: 1,
                backoff_factor: 1.0,
                jitter: false,
            },
            false,
        );
        (fetcher, client)
    }

    #[tokio::test]
    async fn retries_then_succeeds_with_exact_call_count() {
        let (fetcher, client) = test_fetcher(2).await;
        let result = fetcher.fetch("bordeaux", 2020, None).await.unwrap();
        assert!(result.is_some());
        assert_eq!(client.calls.load(StdOrdering::SeqCst), 3);
        assert_eq!(fetcher.upstream_call_count(), 3);
    }

    #[tokio::test]
    async fn exhausting_all_attempts_returns_none_and_writes_api_error() {
        let (fetcher, _client) = test_fetcher(10).await;
        let result = fetcher.fetch("bordeaux", 2021, None).await.unwrap();
        assert!(result.is_none());

        let explanations = fetcher
            .explanations
            .for_entity(ExplanationEntityType::Weather, "bordeaux:2021")
            .await
            .unwrap();
        assert_eq!(explanations.len(), 1);
        assert_eq!(explanations[0].factors, vec!["api_error".to_string()]);
    }

    #[tokio::test]
    async fn disabled_kill_switch_skips_network_and_writes_explanation() {
        let db = Db::connect(&DatabaseConfig::default()).await.unwrap();
        let cache_repo = Arc::new(WeatherCacheRepository::new(db.pool().clone()));
        let explanations = Arc::new(ExplanationRepository::new(db.pool().clone()));
        let client = Arc::new(FlakyClient { fail_times: 0, calls: AtomicUsize::new(0) });
        let fetcher = ResilientWeatherFetcher::new(
            cache_repo,
            explanations,
            Arc::new(FixedResolver),
            client.clone(),
            Arc::new(RateLimiter::new(1000, 1000)),
            RetryPolicy::default(),
            true,
        );
        let result = fetcher.fetch("bordeaux", 2022, None).await.unwrap();
        assert!(result.is_none());
        assert_eq!(client.calls.load(StdOrdering::SeqCst), 0);
    }
}
