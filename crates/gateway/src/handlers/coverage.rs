//! Service coverage handlers
//!
//! A coverage record is public only when its status is `ready` and it passes
//! the quality gate. Records that exist but fail either check are reported
//! exactly like missing ones.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::{parse_id, request_origin, resolve_images};
use crate::AppState;
use trades_common::{
    db::{
        models::{GeoArea, Page, ServiceCoverage},
        CoverageFilter, Repository, ReviewsSummary,
    },
    errors::{AppError, Result},
    media::ImageRef,
    quality::Readiness,
};

#[derive(Debug, Default, Deserialize)]
pub struct CoverageQuery {
    /// Geo area slug
    pub geo: Option<String>,
    /// Service page slug
    pub service: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ServiceRef {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct GeoRef {
    pub slug: String,
    pub name: String,
    #[serde(rename = "type")]
    pub area_type: String,
}

#[derive(Debug, Serialize)]
pub struct CoverageResponse {
    pub id: i64,
    pub service: ServiceRef,
    pub geo: GeoRef,
    pub status: String,
    pub ready: bool,
    pub unique_intro: String,
    pub pain_points: Value,
    pub process_steps: Value,
    pub permits: Value,
    pub starting_price: String,
    pub cta: String,
    pub hero_image: Option<ImageRef>,
    pub reviews_summary: ReviewsSummary,
    pub schema_overrides: Value,
}

/// Visible record, or the not-found error a missing record would produce
fn visible_or_not_found(
    found: Option<(ServiceCoverage, Readiness)>,
    key: &str,
) -> Result<ServiceCoverage> {
    match found {
        Some((coverage, readiness)) if readiness.is_visible() => Ok(coverage),
        Some((coverage, readiness)) => {
            tracing::debug!(
                coverage_id = coverage.id,
                outcome = readiness.label(),
                "Coverage hidden by quality gate"
            );
            Err(AppError::not_found("coverage", key))
        }
        None => Err(AppError::not_found("coverage", key)),
    }
}

async fn with_readiness(
    state: &AppState,
    repo: &Repository,
    coverage: Option<ServiceCoverage>,
) -> Result<Option<(ServiceCoverage, Readiness)>> {
    match coverage {
        Some(coverage) => {
            let readiness = repo.coverage_readiness(&state.policy, &coverage).await?;
            Ok(Some((coverage, readiness)))
        }
        None => Ok(None),
    }
}

/// Attach service, area, hero image and review summary to visible records
async fn build_responses(
    state: &AppState,
    repo: &Repository,
    coverages: Vec<ServiceCoverage>,
    origin: Option<&str>,
) -> Result<Vec<CoverageResponse>> {
    let service_ids: Vec<i64> = coverages.iter().map(|c| c.service_id).collect();
    let geo_ids: Vec<i64> = coverages.iter().map(|c| c.geoarea_id).collect();
    let hero_ids: Vec<i64> = coverages.iter().filter_map(|c| c.hero_image_id).collect();

    let services: HashMap<i64, Page> = repo
        .service_pages_by_ids(&service_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let areas: HashMap<i64, GeoArea> = repo
        .geo_areas_by_ids(&geo_ids)
        .await?
        .into_iter()
        .map(|g| (g.id, g))
        .collect();
    let images = resolve_images(state, repo, hero_ids, origin).await?;

    let mut summaries: HashMap<i64, ReviewsSummary> = HashMap::new();
    let mut responses = Vec::with_capacity(coverages.len());

    for coverage in coverages {
        let (Some(service), Some(area)) = (
            services.get(&coverage.service_id),
            areas.get(&coverage.geoarea_id),
        ) else {
            continue;
        };

        let summary = match summaries.get(&area.id) {
            Some(summary) => *summary,
            None => {
                let summary = repo.reviews_summary(area.id).await?;
                summaries.insert(area.id, summary);
                summary
            }
        };

        responses.push(CoverageResponse {
            id: coverage.id,
            service: ServiceRef {
                id: service.id,
                slug: service.slug.clone(),
                name: service.title.clone(),
            },
            geo: GeoRef {
                slug: area.slug.clone(),
                name: area.name.clone(),
                area_type: area.kind().as_str().to_string(),
            },
            ready: true,
            hero_image: coverage.hero_image_id.and_then(|id| images.get(&id).cloned()),
            reviews_summary: summary,
            status: coverage.status,
            unique_intro: coverage.unique_intro,
            pain_points: coverage.pain_points_local,
            process_steps: coverage.process_steps_local,
            permits: coverage.permits_local,
            starting_price: coverage.starting_price_local,
            cta: coverage.cta_local,
            schema_overrides: coverage.schema_overrides,
        });
    }

    Ok(responses)
}

/// List visible coverage records; `?geo=` and `?service=` take slugs
pub async fn list_coverage(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CoverageQuery>,
) -> Result<Json<Vec<CoverageResponse>>> {
    let repo = Repository::new(state.db.clone());
    let origin = request_origin(&headers);
    let mut filter = CoverageFilter::default();

    if let Some(slug) = query.geo.as_deref().filter(|s| !s.is_empty()) {
        match repo.find_geo_area_by_slug(slug).await? {
            Some(area) => filter.geo_id = Some(area.id),
            None => return Ok(Json(Vec::new())),
        }
    }
    if let Some(slug) = query.service.as_deref().filter(|s| !s.is_empty()) {
        match repo.find_service_page_by_slug(slug).await? {
            Some(page) => filter.service_id = Some(page.id),
            None => return Ok(Json(Vec::new())),
        }
    }

    let coverages = repo.list_ready_coverages(filter).await?;
    let readiness = repo.coverage_readiness_batch(&state.policy, &coverages).await?;
    let visible: Vec<ServiceCoverage> = coverages
        .into_iter()
        .zip(readiness)
        .filter(|(_, readiness)| readiness.is_visible())
        .map(|(coverage, _)| coverage)
        .collect();

    let responses = build_responses(&state, &repo, visible, origin.as_deref()).await?;
    Ok(Json(responses))
}

/// Get a visible coverage record by ID
pub async fn get_coverage(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<Json<CoverageResponse>> {
    let id = parse_id("coverage", &key)?;
    let repo = Repository::new(state.db.clone());
    let origin = request_origin(&headers);

    let found = with_readiness(&state, &repo, repo.find_coverage(id).await?).await?;
    let coverage = visible_or_not_found(found, &key)?;

    single(&state, &repo, coverage, origin.as_deref(), &key).await
}

/// Get the visible coverage of a service in a city, both given by slug
pub async fn get_coverage_for(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((service, city)): Path<(String, String)>,
) -> Result<Json<CoverageResponse>> {
    let repo = Repository::new(state.db.clone());
    let origin = request_origin(&headers);
    let key = format!("{}/{}", service, city);

    let coverage = match (
        repo.find_service_page_by_slug(&service).await?,
        repo.find_geo_area_by_slug(&city).await?,
    ) {
        (Some(page), Some(area)) => repo.find_coverage_for(page.id, area.id).await?,
        _ => None,
    };

    let found = with_readiness(&state, &repo, coverage).await?;
    let coverage = visible_or_not_found(found, &key)?;

    single(&state, &repo, coverage, origin.as_deref(), &key).await
}

async fn single(
    state: &AppState,
    repo: &Repository,
    coverage: ServiceCoverage,
    origin: Option<&str>,
    key: &str,
) -> Result<Json<CoverageResponse>> {
    build_responses(state, repo, vec![coverage], origin)
        .await?
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| AppError::not_found("coverage", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, response::IntoResponse};
    use trades_common::{db::models::CoverageStatus, quality::QualityReport};

    fn coverage(status: CoverageStatus) -> ServiceCoverage {
        ServiceCoverage {
            id: 7,
            service_id: 1,
            geoarea_id: 2,
            status: status.as_str().to_string(),
            unique_intro: "<p>Roof repair in Springfield</p>".into(),
            pain_points_local: serde_json::json!([]),
            process_steps_local: serde_json::json!([]),
            permits_local: serde_json::json!([]),
            starting_price_local: String::new(),
            cta_local: String::new(),
            hero_image_id: None,
            schema_overrides: serde_json::json!({}),
        }
    }

    async fn body_of(err: AppError) -> (u16, Vec<u8>) {
        let response = err.into_response();
        let status = response.status().as_u16();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_hidden_coverage_is_indistinguishable_from_missing() {
        let key = "roofing/springfield";
        let report = QualityReport {
            word_count: 5,
            module_count: 0,
            image_count: 0,
            base_ok: false,
        };

        let missing = visible_or_not_found(None, key).unwrap_err();
        let incomplete =
            visible_or_not_found(Some((coverage(CoverageStatus::Ready), Readiness::Incomplete(report))), key)
                .unwrap_err();
        let draft =
            visible_or_not_found(Some((coverage(CoverageStatus::Draft), Readiness::Draft)), key).unwrap_err();

        let missing = body_of(missing).await;
        assert_eq!(missing.0, 404);
        assert_eq!(body_of(incomplete).await, missing);
        assert_eq!(body_of(draft).await, missing);
    }

    #[test]
    fn test_visible_coverage_passes() {
        let report = QualityReport {
            word_count: 700,
            module_count: 6,
            image_count: 6,
            base_ok: true,
        };
        let found = Some((coverage(CoverageStatus::Ready), Readiness::Visible(report)));
        let coverage = visible_or_not_found(found, "roofing/springfield").unwrap();
        assert_eq!(coverage.id, 7);
    }
}
