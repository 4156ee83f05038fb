//! Service area handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;

use crate::AppState;
use trades_common::{
    db::{models::ServiceArea, Repository},
    errors::{AppError, Result},
};

#[derive(Debug, Serialize)]
pub struct ServiceAreaResponse {
    pub name: String,
    pub slug: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub geo_slug: Option<String>,
}

impl ServiceAreaResponse {
    fn build(area: ServiceArea, geo_slugs: &HashMap<i64, String>) -> Self {
        Self {
            geo_slug: area.geo_id.and_then(|id| geo_slugs.get(&id).cloned()),
            name: area.name,
            slug: area.slug,
            city: area.city,
            state: area.state,
            zip_code: area.zip_code,
        }
    }
}

async fn geo_slugs(repo: &Repository, areas: &[ServiceArea]) -> Result<HashMap<i64, String>> {
    let ids: Vec<i64> = areas.iter().filter_map(|a| a.geo_id).collect();
    let geo = repo.geo_areas_by_ids(&ids).await?;
    Ok(geo.into_iter().map(|g| (g.id, g.slug)).collect())
}

/// List service areas ordered by name
pub async fn list_areas(State(state): State<AppState>) -> Result<Json<Vec<ServiceAreaResponse>>> {
    let repo = Repository::new(state.db.clone());

    let areas = repo.list_service_areas().await?;
    let slugs = geo_slugs(&repo, &areas).await?;

    Ok(Json(
        areas
            .into_iter()
            .map(|area| ServiceAreaResponse::build(area, &slugs))
            .collect(),
    ))
}

pub async fn get_area(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ServiceAreaResponse>> {
    let repo = Repository::new(state.db.clone());

    let area = repo
        .find_service_area_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::not_found("area", &slug))?;
    let slugs = geo_slugs(&repo, std::slice::from_ref(&area)).await?;

    Ok(Json(ServiceAreaResponse::build(area, &slugs)))
}
