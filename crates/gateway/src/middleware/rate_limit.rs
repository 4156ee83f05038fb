//! Per-client rate limiting for lead submissions (token bucket keyed by IP)

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use trades_common::{config::RateLimitConfig, errors::AppError, metrics::record_lead};

use crate::AppState;

/// Rate limiter keyed by client address
pub type KeyedRateLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

/// Build the lead limiter; `None` when disabled or configured with a zero rate
pub fn create_lead_limiter(config: &RateLimitConfig) -> Option<Arc<KeyedRateLimiter>> {
    if !config.enabled {
        return None;
    }

    let per_minute = NonZeroU32::new(config.leads_per_minute)?;
    let burst = NonZeroU32::new(config.burst).unwrap_or(per_minute);
    let quota = Quota::per_minute(per_minute).allow_burst(burst);

    Some(Arc::new(RateLimiter::keyed(quota)))
}

/// Client address from the connection; unknown peers share one bucket
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Rate limiting middleware
pub async fn lead_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(limiter) = state.lead_limiter.as_ref() else {
        return next.run(request).await;
    };

    let ip = client_ip(&request);
    match limiter.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!(client_ip = %ip, "Lead rate limit exceeded");
            record_lead(false);
            AppError::RateLimited {
                limit: state.config.rate_limit.leads_per_minute,
            }
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_limiter_is_keyed_per_client() {
        let config = RateLimitConfig {
            leads_per_minute: 1,
            burst: 1,
            enabled: true,
        };
        let limiter = create_lead_limiter(&config).unwrap();
        let a = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let b = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        assert_ok!(limiter.check_key(&a));
        assert_err!(limiter.check_key(&a));
        assert_ok!(limiter.check_key(&b));
    }

    #[test]
    fn test_disabled_limiter() {
        let config = RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        };
        assert!(create_lead_limiter(&config).is_none());

        let zero = RateLimitConfig {
            leads_per_minute: 0,
            ..RateLimitConfig::default()
        };
        assert!(create_lead_limiter(&zero).is_none());
    }
}
