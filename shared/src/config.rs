use crate::{Error, Result};
use std::time::Duration;
use tracing::warn;

/// Settings for the distributed (Redis protocol) store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: u32,
    pub connect_timeout: Duration,
}

impl RedisSettings {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            password: None,
            db: 0,
            connect_timeout: Duration::from_millis(CacheSettings::DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }

    /// Build the connection URL, rejecting hosts that can not form one
    pub fn url(&self) -> Result<String> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(Error::Config("redis host is empty".to_string()));
        }
        if host
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '@' | '?' | '#'))
        {
            return Err(Error::Config(format!("redis host '{}' is malformed", host)));
        }

        let auth = match &self.password {
            Some(password) if !password.is_empty() => {
                format!(":{}@", urlencoding::encode(password))
            }
            _ => String::new(),
        };

        Ok(format!("redis://{}{}:{}/{}", auth, host, self.port, self.db))
    }
}

/// Reconnect backoff: retry `n` waits `min(n * step, max_delay)`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub step: Duration,
    pub max_delay: Duration,
}

impl ReconnectPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt).min(self.max_delay)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            step: Duration::from_millis(CacheSettings::DEFAULT_RETRY_STEP_MS),
            max_delay: Duration::from_millis(CacheSettings::DEFAULT_RETRY_MAX_DELAY_MS),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheSettings {
    pub production: bool,
    pub redis: Option<RedisSettings>,
    pub reconnect: ReconnectPolicy,
}

impl CacheSettings {
    const DEFAULT_REDIS_PORT: u16 = 6379;
    const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;
    const DEFAULT_RETRY_STEP_MS: u64 = 50;
    const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 2000;

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any variable source (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let production = lookup("APP_ENV")
            .map(|env| env.trim().eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let redis = lookup("REDIS_HOST")
            .filter(|host| !host.trim().is_empty())
            .map(|host| RedisSettings {
                host,
                port: parse_or("REDIS_PORT", lookup("REDIS_PORT"), Self::DEFAULT_REDIS_PORT),
                password: lookup("REDIS_PASSWORD").filter(|p| !p.is_empty()),
                db: parse_or("REDIS_DB", lookup("REDIS_DB"), 0),
                connect_timeout: Duration::from_millis(parse_or(
                    "REDIS_CONNECT_TIMEOUT_MS",
                    lookup("REDIS_CONNECT_TIMEOUT_MS"),
                    Self::DEFAULT_CONNECT_TIMEOUT_MS,
                )),
            });

        let reconnect = ReconnectPolicy {
            step: Duration::from_millis(parse_or(
                "CACHE_RETRY_STEP_MS",
                lookup("CACHE_RETRY_STEP_MS"),
                Self::DEFAULT_RETRY_STEP_MS,
            )),
            max_delay: Duration::from_millis(parse_or(
                "CACHE_RETRY_MAX_DELAY_MS",
                lookup("CACHE_RETRY_MAX_DELAY_MS"),
                Self::DEFAULT_RETRY_MAX_DELAY_MS,
            )),
        };

        Self {
            production,
            redis,
            reconnect,
        }
    }

    /// The distributed store to use, if any.
    ///
    /// Only a production deployment with a configured host gets one.
    pub fn distributed_target(&self) -> Option<&RedisSettings> {
        if self.production {
            self.redis.as_ref()
        } else {
            None
        }
    }
}

fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match raw {
        Some(value) => value.trim().parse::<T>().unwrap_or_else(|_| {
            warn!(variable = name, value = %value, default = %default, "Unparsable setting, using default");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let settings = CacheSettings::from_lookup(lookup_from(&[]));
        assert!(!settings.production);
        assert!(settings.redis.is_none());
        assert!(settings.distributed_target().is_none());
        assert_eq!(settings.reconnect, ReconnectPolicy::default());
    }

    #[test]
    fn test_production_with_host_selects_distributed() {
        let settings = CacheSettings::from_lookup(lookup_from(&[
            ("APP_ENV", "Production"),
            ("REDIS_HOST", "cache.internal"),
            ("REDIS_PORT", "6380"),
            ("REDIS_PASSWORD", "s3cret"),
        ]));

        let target = settings.distributed_target().unwrap();
        assert_eq!(target.host, "cache.internal");
        assert_eq!(target.port, 6380);
        assert_eq!(target.password.as_deref(), Some("s3cret"));
        assert_eq!(target.db, 0);
    }

    #[test]
    fn test_host_without_production_stays_local() {
        let settings = CacheSettings::from_lookup(lookup_from(&[
            ("APP_ENV", "development"),
            ("REDIS_HOST", "cache.internal"),
        ]));
        assert!(settings.redis.is_some());
        assert!(settings.distributed_target().is_none());
    }

    #[test]
    fn test_production_without_host_stays_local() {
        let settings = CacheSettings::from_lookup(lookup_from(&[
            ("APP_ENV", "production"),
            ("REDIS_HOST", "   "),
        ]));
        assert!(settings.distributed_target().is_none());
    }

    #[test]
    fn test_unparsable_port_falls_back_to_default() {
        let settings = CacheSettings::from_lookup(lookup_from(&[
            ("APP_ENV", "production"),
            ("REDIS_HOST", "localhost"),
            ("REDIS_PORT", "not-a-port"),
        ]));
        assert_eq!(settings.redis.unwrap().port, 6379);
    }

    #[test]
    fn test_url_with_and_without_password() {
        let mut redis = RedisSettings::new("localhost", 6379);
        assert_eq!(redis.url().unwrap(), "redis://localhost:6379/0");

        redis.password = Some("p@ss:word".to_string());
        redis.db = 2;
        assert_eq!(redis.url().unwrap(), "redis://:p%40ss%3Aword@localhost:6379/2");
    }

    #[test]
    fn test_malformed_host_is_config_error() {
        let redis = RedisSettings::new("bad host", 6379);
        assert!(matches!(redis.url(), Err(Error::Config(_))));

        let redis = RedisSettings::new("", 6379);
        assert!(matches!(redis.url(), Err(Error::Config(_))));
    }

    #[test]
    fn test_backoff_grows_linearly_up_to_ceiling() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(50));
        assert_eq!(policy.delay_for(4), Duration::from_millis(200));
        assert_eq!(policy.delay_for(40), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(10_000), Duration::from_millis(2000));
    }
}
