use std::{net::SocketAddr, time::Duration};

use anyhow::{Context, Result};
use nport_holdings::{PipelineConfig, SecEndpoints};

const DEFAULT_USER_AGENT: &str = "NPORT Holdings Viewer (admin@example.com)";

/// Per-client request quotas for the `/api` routes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimits {
    /// Any `/api` route without its own quota
    pub default_per_minute: u32,
    pub health_per_minute: u32,
    pub holdings_per_minute: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            default_per_minute: 60,
            health_per_minute: 30,
            holdings_per_minute: 10,
        }
    }
}

pub struct Config {
    pub listen_addr: SocketAddr,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    pub static_dir: String,
    pub rate_limits: RateLimits,
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unset numeric settings take
    /// their defaults; set-but-invalid ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let listen_addr: SocketAddr = var("NPORT_LISTEN_ADDR", "0.0.0.0:3000")
            .parse()
            .context("Invalid NPORT_LISTEN_ADDR")?;
        let cors_allow = var("NPORT_CORS_ALLOW_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = var("NPORT_REQUEST_TIMEOUT_MS", "60000")
            .parse()
            .context("Invalid NPORT_REQUEST_TIMEOUT_MS")?;
        let static_dir = var("NPORT_STATIC_DIR", "static");

        let per_minute = |key: &str, default: u32| -> Result<u32> {
            let value: u32 = var(key, &default.to_string())
                .parse()
                .with_context(|| format!("Invalid {}", key))?;
            if value == 0 {
                anyhow::bail!("{} must be positive", key);
            }
            Ok(value)
        };
        let limits = RateLimits::default();
        let rate_limits = RateLimits {
            default_per_minute: per_minute("NPORT_RATE_LIMIT_PER_MIN", limits.default_per_minute)?,
            health_per_minute: per_minute("NPORT_HEALTH_RATE_LIMIT_PER_MIN", limits.health_per_minute)?,
            holdings_per_minute: per_minute(
                "NPORT_HOLDINGS_RATE_LIMIT_PER_MIN",
                limits.holdings_per_minute,
            )?,
        };

        let defaults = PipelineConfig::default();
        let requests_per_second: f64 = var("SEC_RATE_LIMIT_PER_SEC", "10")
            .parse()
            .context("Invalid SEC_RATE_LIMIT_PER_SEC")?;
        if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
            anyhow::bail!("SEC_RATE_LIMIT_PER_SEC must be positive");
        }
        let max_attempts: u32 = var("SEC_MAX_ATTEMPTS", "3")
            .parse()
            .context("Invalid SEC_MAX_ATTEMPTS")?;
        let backoff_ms: u64 = var("SEC_BACKOFF_BASE_MS", "500")
            .parse()
            .context("Invalid SEC_BACKOFF_BASE_MS")?;
        let http_timeout_secs: u64 = var("SEC_HTTP_TIMEOUT_SECS", "30")
            .parse()
            .context("Invalid SEC_HTTP_TIMEOUT_SECS")?;
        let lookup_timeout_ms: u64 = var("NPORT_LOOKUP_TIMEOUT_MS", "45000")
            .parse()
            .context("Invalid NPORT_LOOKUP_TIMEOUT_MS")?;
        let request_timeout = Duration::from_millis(timeout_ms);
        let lookup_timeout = Duration::from_millis(lookup_timeout_ms);
        if lookup_timeout >= request_timeout {
            anyhow::bail!(
                "NPORT_LOOKUP_TIMEOUT_MS ({}) must be shorter than NPORT_REQUEST_TIMEOUT_MS ({})",
                lookup_timeout_ms,
                timeout_ms
            );
        }
        let cache_ttl_secs: u64 = var("NPORT_CACHE_TTL_SECS", "1800")
            .parse()
            .context("Invalid NPORT_CACHE_TTL_SECS")?;
        let cache_capacity: usize = var("NPORT_CACHE_CAPACITY", "128")
            .parse()
            .context("Invalid NPORT_CACHE_CAPACITY")?;

        let pipeline = PipelineConfig {
            user_agent: var("SEC_USER_AGENT", DEFAULT_USER_AGENT),
            requests_per_second,
            burst_capacity: defaults.burst_capacity,
            max_attempts: max_attempts.max(1),
            backoff_base: Duration::from_millis(backoff_ms),
            http_timeout: Duration::from_secs(http_timeout_secs),
            lookup_timeout,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            cache_capacity,
            endpoints: SecEndpoints::default(),
        };

        Ok(Self {
            listen_addr,
            cors_allow,
            request_timeout,
            static_dir,
            rate_limits,
            pipeline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.listen_addr.port(), 3000);
        assert_eq!(config.cors_allow, vec!["*".to_string()]);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.pipeline.lookup_timeout, Duration::from_secs(45));
        assert_eq!(config.rate_limits, RateLimits::default());
        assert_eq!(config.static_dir, "static");
        assert_eq!(config.pipeline.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.pipeline.requests_per_second, 10.0);
        assert_eq!(config.pipeline.max_attempts, 3);
        assert_eq!(config.pipeline.cache_ttl, Duration::from_secs(1800));
        assert_eq!(config.pipeline.cache_capacity, 128);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("NPORT_LISTEN_ADDR", "127.0.0.1:9000"),
            ("NPORT_CORS_ALLOW_ORIGINS", "http://a.test, http://b.test,"),
            ("SEC_USER_AGENT", "Fund Desk (desk@fund.test)"),
            ("SEC_RATE_LIMIT_PER_SEC", "2.5"),
            ("NPORT_CACHE_TTL_SECS", "5"),
            ("NPORT_HOLDINGS_RATE_LIMIT_PER_MIN", "3"),
            ("NPORT_REQUEST_TIMEOUT_MS", "2000"),
            ("NPORT_LOOKUP_TIMEOUT_MS", "1500"),
        ])
        .unwrap();
        assert_eq!(config.rate_limits.holdings_per_minute, 3);
        assert_eq!(config.rate_limits.health_per_minute, 30);
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        assert_eq!(config.pipeline.lookup_timeout, Duration::from_millis(1500));
        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.cors_allow, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.pipeline.user_agent, "Fund Desk (desk@fund.test)");
        assert_eq!(config.pipeline.requests_per_second, 2.5);
        assert_eq!(config.pipeline.cache_ttl, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(config_from(&[("NPORT_LISTEN_ADDR", "nowhere")]).is_err());
        assert!(config_from(&[("SEC_MAX_ATTEMPTS", "three")]).is_err());
        assert!(config_from(&[("SEC_RATE_LIMIT_PER_SEC", "0")]).is_err());
        assert!(config_from(&[("NPORT_RATE_LIMIT_PER_MIN", "0")]).is_err());
    }

    #[test]
    fn test_lookup_timeout_must_fit_inside_request_timeout() {
        let err = config_from(&[("NPORT_REQUEST_TIMEOUT_MS", "30000")])
            .err()
            .unwrap();
        assert!(err.to_string().contains("NPORT_LOOKUP_TIMEOUT_MS"));

        assert!(config_from(&[
            ("NPORT_REQUEST_TIMEOUT_MS", "1000"),
            ("NPORT_LOOKUP_TIMEOUT_MS", "1000"),
        ])
        .is_err());
    }
}
