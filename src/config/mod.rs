//! Layered configuration (TOML + environment overrides), validated at
//! startup. Mirrors the enumerated configuration surface of spec §6.

use serde::{Deserialize, Serialize};

use crate::error::{CellarError, Result};

const PLACEHOLDER_PATTERNS: &[&str] = &[
    "dev-",
    "change-me",
    "placeholder",
    "example",
    "test-",
    "your-",
    "insert-",
    "replace-",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub disable_external_calls: bool,
    pub auth_disabled: bool,
    pub open_meteo: OpenMeteoConfig,
    pub ai: AiConfig,
    pub cache: CacheConfig,
    pub database: DatabaseSettings,
    pub secrets: SecretsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenMeteoConfig {
    pub base_url: String,
    pub geocoding_url: String,
    pub max_requests: u32,
    pub window_ms: u64,
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://archive-api.open-meteo.com/v1/archive".to_string(),
            geocoding_url: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            max_requests: 10,
            window_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: None,
            api_key: None,
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategyName {
    Lru,
    Lfu,
    Hybrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_size: usize,
    pub default_ttl_secs: u64,
    pub strategy: CacheStrategyName,
    pub memory_limit_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 10_000,
            default_ttl_secs: 24 * 3600,
            strategy: CacheStrategyName::Hybrid,
            memory_limit_bytes: 64 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 10,
            run_migrations: true,
        }
    }
}

/// Two distinct secrets (e.g. JWT signing key, webhook HMAC key); both must
/// be >= 32 chars, non-placeholder, and mutually distinct (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    pub primary_secret: String,
    pub secondary_secret: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            disable_external_calls: false,
            auth_disabled: false,
            open_meteo: OpenMeteoConfig::default(),
            ai: AiConfig::default(),
            cache: CacheConfig::default(),
            database: DatabaseSettings::default(),
            secrets: SecretsConfig {
                primary_secret: "dev-primary-secret-not-for-production".to_string(),
                secondary_secret: "dev-secondary-secret-not-for-production".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration layering a `config/default.toml`-shaped file
    /// under environment variables prefixed `CELLAR_` (figment's
    /// `config`+env idiom, as used by the teacher's observability config).
    pub fn load() -> Result<Self> {
        let figment = figment::Figment::from(figment::providers::Serialized::defaults(
            AppConfig::default(),
        ))
        .merge(figment::providers::Toml::file("cellar.toml"))
        .merge(figment::providers::Env::prefixed("CELLAR_").split("__"));

        let cfg: AppConfig = figment
            .extract()
            .map_err(|e| CellarError::internal(format!("config error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// §6: in production, `authDisabled` is fatal and secrets must pass the
    /// placeholder/length/distinctness checks.
    pub fn validate(&self) -> Result<()> {
        if self.environment == Environment::Production && self.auth_disabled {
            return Err(CellarError::validation(
                "authDisabled cannot be set in production",
            ));
        }

        if self.environment == Environment::Production {
            self.secrets.validate()?;
        }

        Ok(())
    }
}

impl SecretsConfig {
    pub fn validate(&self) -> Result<()> {
        validate_secret(&self.primary_secret, "primary_secret")?;
        validate_secret(&self.secondary_secret, "secondary_secret")?;
        if self.primary_secret == self.secondary_secret {
            return Err(CellarError::validation(
                "primary_secret and secondary_secret must differ",
            ));
        }
        Ok(())
    }
}

fn validate_secret(secret: &str, field: &str) -> Result<()> {
    if secret.len() < 32 {
        return Err(CellarError::validation(format!(
            "{field} must be at least 32 characters"
        )));
    }
    let lower = secret.to_lowercase();
    if PLACEHOLDER_PATTERNS.iter().any(|p| lower.starts_with(p)) {
        return Err(CellarError::validation(format!(
            "{field} matches a known placeholder pattern"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_secrets() {
        assert!(validate_secret("short", "s").is_err());
    }

    #[test]
    fn rejects_placeholder_patterns() {
        assert!(validate_secret(&"dev-".to_string().repeat(10), "s").is_err());
        assert!(validate_secret(&format!("change-me-{}", "x".repeat(30)), "s").is_err());
    }

    #[test]
    fn rejects_matching_secrets_in_production() {
        let secret = "a".repeat(40);
        let cfg = SecretsConfig {
            primary_secret: secret.clone(),
            secondary_secret: secret,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_distinct_strong_secrets() {
        let cfg = SecretsConfig {
            primary_secret: "a".repeat(40),
            secondary_secret: "b".repeat(40),
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn default_config_is_valid_outside_production() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn auth_disabled_is_fatal_in_production() {
        let mut cfg = AppConfig::default();
        cfg.environment = Environment::Production;
        cfg.auth_disabled = true;
        cfg.secrets = SecretsConfig {
            primary_secret: "a".repeat(40),
            secondary_secret: "b".repeat(40),
        };
        assert!(cfg.validate().is_err());
    }
}
