use crate::error::AppError;
use crate::rate_limit::DrainPolicy;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://leetlens.wigz.workers.dev";
pub const DEFAULT_MATCH_API_BASE: &str = "https://www.faceit.com/api/match/v2/match";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub match_api_base: String,
    pub cache_ttl: Duration,
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub request_delay: Duration,
    pub requests_per_second: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base: DEFAULT_API_BASE.to_string(),
            match_api_base: DEFAULT_MATCH_API_BASE.to_string(),
            cache_ttl: Duration::from_secs(30 * 60),
            batch_size: 10,
            batch_delay: Duration::from_millis(1000),
            request_delay: Duration::from_millis(1500),
            requests_per_second: 20,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let api_base = env::var("LEETLENS_API_BASE").unwrap_or(defaults.api_base);
        let match_api_base =
            env::var("LEETLENS_MATCH_API_BASE").unwrap_or(defaults.match_api_base);

        let cache_ttl = match parse_var::<u64>("LEETLENS_CACHE_TTL_MINS")? {
            Some(mins) => ttl_from_minutes(mins)?,
            None => defaults.cache_ttl,
        };
        let batch_size = parse_var::<usize>("LEETLENS_BATCH_SIZE")?.unwrap_or(defaults.batch_size);
        if batch_size == 0 {
            return Err(AppError::ConfigError(
                "LEETLENS_BATCH_SIZE must be at least 1".to_string(),
            ));
        }
        let batch_delay = parse_var::<u64>("LEETLENS_BATCH_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.batch_delay);
        let request_delay = parse_var::<u64>("LEETLENS_REQUEST_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.request_delay);
        let requests_per_second = parse_var::<u32>("LEETLENS_REQUESTS_PER_SECOND")?
            .unwrap_or(defaults.requests_per_second);

        Ok(Config {
            api_base: api_base.trim_end_matches('/').to_string(),
            match_api_base: match_api_base.trim_end_matches('/').to_string(),
            cache_ttl,
            batch_size,
            batch_delay,
            request_delay,
            requests_per_second,
        })
    }

    /// Concurrent batches, used against the FACEIT-backed endpoints.
    pub fn batch_policy(&self) -> DrainPolicy {
        DrainPolicy::Batch {
            size: self.batch_size,
            delay: self.batch_delay,
        }
    }

    /// One request at a time, used against the Leetify-backed endpoint.
    pub fn serial_policy(&self) -> DrainPolicy {
        DrainPolicy::Serial {
            delay: self.request_delay,
        }
    }
}

// Bounded by what a cache timestamp can represent, not only by u64 seconds.
fn ttl_from_minutes(mins: u64) -> Result<Duration, AppError> {
    mins.checked_mul(60)
        .map(Duration::from_secs)
        .filter(|ttl| chrono::Duration::from_std(*ttl).is_ok())
        .ok_or_else(|| {
            AppError::ConfigError(format!("LEETLENS_CACHE_TTL_MINS is too large: {}", mins))
        })
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::ConfigError(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(None),
    }
}
