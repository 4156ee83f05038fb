//! API handlers module

pub mod areas;
pub mod coverage;
pub mod geoareas;
pub mod health;
pub mod leads;
pub mod projects;
pub mod services;
pub mod site;
pub mod testimonials;

use axum::http::{header, HeaderMap};
use std::collections::HashMap;
use trades_common::{
    db::Repository,
    errors::{AppError, Result},
    media::ImageRef,
};

use crate::AppState;

/// `scheme://host[:port]` of the incoming request, from `Host` and
/// `X-Forwarded-Proto`
pub fn request_origin(headers: &HeaderMap) -> Option<String> {
    let host = headers.get(header::HOST)?.to_str().ok()?.trim();
    if host.is_empty() {
        return None;
    }

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| *v == "https" || *v == "http")
        .unwrap_or("http");

    Some(format!("{}://{}", scheme, host))
}

/// Numeric ID from a path segment; anything else is reported as not found
pub fn parse_id(resource_type: &str, raw: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::not_found(resource_type, raw))
}

/// Public URL and alt text for each image ID that exists
pub async fn resolve_images(
    state: &AppState,
    repo: &Repository,
    mut ids: Vec<i64>,
    origin: Option<&str>,
) -> Result<HashMap<i64, ImageRef>> {
    ids.sort_unstable();
    ids.dedup();

    let images = repo.images_by_ids(&ids).await?;
    let renditions = repo.renditions_for(&ids, &state.media.filter_spec()).await?;

    Ok(state.media.resolve_all(&images, &renditions, origin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_origin() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_origin(&headers), None);

        headers.insert(header::HOST, HeaderValue::from_static("example.com:8000"));
        assert_eq!(request_origin(&headers).as_deref(), Some("http://example.com:8000"));

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https, http"));
        assert_eq!(request_origin(&headers).as_deref(), Some("https://example.com:8000"));
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("service", "42").unwrap(), 42);

        let err = parse_id("service", "roofing").unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Resource not found: service roofing");
    }
}
