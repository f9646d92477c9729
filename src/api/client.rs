use crate::config::Config;
use crate::error::AppError;
use async_trait::async_trait;
use governor::{clock::DefaultClock, state::{InMemoryState, NotKeyed}, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("leetlens/", env!("CARGO_PKG_VERSION"));

/// Status and body of a completed HTTP exchange. Non-2xx statuses are
/// responses too; only transport failures become errors.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_str(&self.body).map_err(AppError::from)
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, AppError>;
}

/// Blocking `ureq` agent driven from the blocking thread pool, paced by a
/// process-wide request quota.
pub struct UreqTransport {
    agent: ureq::Agent,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl UreqTransport {
    pub fn new(config: &Config) -> Self {
        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let agent = ureq::AgentBuilder::new()
            .user_agent(USER_AGENT)
            .timeout_connect(Duration::from_secs(10))
            .build();

        UreqTransport {
            agent,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        }
    }
}

#[async_trait]
impl HttpTransport for UreqTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, AppError> {
        self.rate_limiter.until_ready().await;

        let agent = self.agent.clone();
        let url = url.to_string();
        let joined = tokio::task::spawn_blocking(move || {
            let response = agent.get(&url).set("Accept", "application/json").call();

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp
                        .into_string()
                        .map_err(|e| AppError::HttpError(e.to_string()))?;
                    debug!(%url, status, "upstream response");
                    Ok(HttpResponse { status, body })
                }
                Err(ureq::Error::Status(status, resp)) => {
                    // keep the body, some upstreams explain the failure there
                    let body = resp.into_string().unwrap_or_default();
                    debug!(%url, status, "upstream non-success");
                    Ok(HttpResponse { status, body })
                }
                Err(e) => Err(AppError::HttpError(e.to_string())),
            }
        })
        .await;

        joined.map_err(|e| AppError::HttpError(format!("request task failed: {}", e)))?
    }
}
