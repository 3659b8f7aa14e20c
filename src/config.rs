// Configuration du service, lue une seule fois au démarrage depuis les variables d'environnement.
use crate::cache::{DEFAULT_SWEEP_THRESHOLD, DEFAULT_TTL};
use crate::rate_limiter::{Limit, RateLimits};
use crate::upstream::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub upstream_base_url: String,
    pub upstream_user_agent: String,
    pub upstream_timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_sweep_threshold: usize,
    pub rate_limits: RateLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            upstream_base_url: DEFAULT_BASE_URL.to_string(),
            upstream_user_agent: DEFAULT_USER_AGENT.to_string(),
            upstream_timeout: DEFAULT_TIMEOUT,
            cache_ttl: DEFAULT_TTL,
            cache_sweep_threshold: DEFAULT_SWEEP_THRESHOLD,
            rate_limits: RateLimits::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    // Même lecture que `from_env`, mais à travers une fonction quelconque (utile en test).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        warn_ignored(&lookup);

        let window = Duration::from_millis(parse_or(
            &lookup,
            "UPSTREAM_RATE_WINDOW_MS",
            defaults.rate_limits.product.window.as_millis() as u64,
        ));
        let limit = |key: &str, default: Limit| Limit {
            max_requests: parse_or(&lookup, key, default.max_requests),
            window,
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            upstream_base_url: lookup("OPEN_FOOD_FACTS_BASE_URL")
                .unwrap_or(defaults.upstream_base_url),
            upstream_user_agent: lookup("OPEN_FOOD_FACTS_USER_AGENT")
                .unwrap_or(defaults.upstream_user_agent),
            upstream_timeout: Duration::from_millis(parse_or(
                &lookup,
                "UPSTREAM_TIMEOUT_MS",
                defaults.upstream_timeout.as_millis() as u64,
            )),
            cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                "CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )),
            cache_sweep_threshold: parse_or(
                &lookup,
                "CACHE_SWEEP_THRESHOLD",
                defaults.cache_sweep_threshold,
            ),
            rate_limits: RateLimits {
                product: limit("RATE_LIMIT_PRODUCT_MAX", defaults.rate_limits.product),
                search: limit("RATE_LIMIT_SEARCH_MAX", defaults.rate_limits.search),
                facet: limit("RATE_LIMIT_FACET_MAX", defaults.rate_limits.facet),
            },
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Clés du limiteur entrant par IP, que ce service ne fournit pas.
// Elles ne doivent surtout pas modifier les fenêtres des quotas amont.
const IGNORED_KEYS: &[&str] = &["RATE_LIMIT_WINDOW_MS", "RATE_LIMIT_MAX_REQUESTS"];

fn warn_ignored<F>(lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    for &key in IGNORED_KEYS {
        if lookup(key).is_some() {
            warn!(
                "{} is set but per-client rate limiting is not supported; upstream quotas use UPSTREAM_RATE_WINDOW_MS",
                key
            );
        }
    }
}

// Valeur invalide : on garde la valeur par défaut plutôt que d'interrompre le démarrage.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value {:?} for {}, using default {}", raw, key, default);
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.upstream_base_url, "https://world.openfoodfacts.org");
        assert_eq!(config.upstream_timeout, Duration::from_secs(10));
        assert_eq!(config.cache_ttl, Duration::from_secs(86_400));
        assert_eq!(config.cache_sweep_threshold, 1000);
        assert_eq!(config.rate_limits, RateLimits::default());
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("OPEN_FOOD_FACTS_BASE_URL", "http://localhost:9000"),
            ("UPSTREAM_TIMEOUT_MS", "2500"),
            ("CACHE_TTL_SECS", "60"),
            ("RATE_LIMIT_SEARCH_MAX", "5"),
            ("UPSTREAM_RATE_WINDOW_MS", "1000"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.upstream_base_url, "http://localhost:9000");
        assert_eq!(config.upstream_timeout, Duration::from_millis(2500));
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.rate_limits.search.max_requests, 5);
        assert_eq!(config.rate_limits.search.window, Duration::from_secs(1));
        assert_eq!(config.rate_limits.product.max_requests, 100);
        assert_eq!(config.rate_limits.product.window, Duration::from_secs(1));
    }

    #[test]
    fn test_inbound_limiter_keys_leave_upstream_windows_alone() {
        let config = config_from(&[
            ("RATE_LIMIT_WINDOW_MS", "900000"),
            ("RATE_LIMIT_MAX_REQUESTS", "5"),
        ]);
        assert_eq!(config.rate_limits, RateLimits::default());
        assert_eq!(config.rate_limits.product.window, Duration::from_secs(60));
        assert_eq!(config.rate_limits.product.max_requests, 100);
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = config_from(&[("PORT", "not-a-port"), ("CACHE_SWEEP_THRESHOLD", "-1")]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.cache_sweep_threshold, 1000);
    }
}
