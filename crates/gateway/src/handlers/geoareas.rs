//! Geo area handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;

use crate::AppState;
use trades_common::{
    db::{models::GeoArea, Repository},
    errors::{AppError, Result},
};

#[derive(Debug, Serialize)]
pub struct GeoAreaResponse {
    pub id: i64,
    #[serde(rename = "type")]
    pub area_type: String,
    pub name: String,
    pub slug: String,
    pub parent_city: Option<String>,
    pub neighbors: Vec<String>,
    pub center_lat: Option<f64>,
    pub center_lng: Option<f64>,
    pub population_note: String,
    pub permits_links: serde_json::Value,
    pub geojson: Option<String>,
}

/// Slugs of areas referenced by parent or neighbor links
struct AreaIndex {
    slugs: HashMap<i64, String>,
    neighbors: HashMap<i64, Vec<i64>>,
}

impl AreaIndex {
    fn response(&self, area: GeoArea) -> GeoAreaResponse {
        let slug_of = |id: &i64| self.slugs.get(id).cloned();

        let mut neighbors: Vec<String> = self
            .neighbors
            .get(&area.id)
            .map(|ids| ids.iter().filter_map(slug_of).collect())
            .unwrap_or_default();
        neighbors.sort();

        GeoAreaResponse {
            id: area.id,
            area_type: area.kind().as_str().to_string(),
            parent_city: area.parent_city_id.as_ref().and_then(slug_of),
            neighbors,
            name: area.name,
            slug: area.slug,
            center_lat: area.center_lat,
            center_lng: area.center_lng,
            population_note: area.population_note,
            permits_links: area.permits_links,
            geojson: area.geojson,
        }
    }
}

async fn build_index(repo: &Repository, areas: &[GeoArea], known: &[GeoArea]) -> Result<AreaIndex> {
    let ids: Vec<i64> = areas.iter().map(|a| a.id).collect();
    let links = repo.neighbor_links(&ids).await?;

    let mut neighbors: HashMap<i64, Vec<i64>> = HashMap::new();
    for (from, to) in &links {
        neighbors.entry(*from).or_default().push(*to);
    }

    let mut slugs: HashMap<i64, String> = known.iter().map(|a| (a.id, a.slug.clone())).collect();

    // Referenced areas not already loaded
    let missing: Vec<i64> = links
        .iter()
        .map(|(_, to)| *to)
        .chain(areas.iter().filter_map(|a| a.parent_city_id))
        .filter(|id| !slugs.contains_key(id))
        .collect();
    for area in repo.geo_areas_by_ids(&missing).await? {
        slugs.insert(area.id, area.slug);
    }

    Ok(AreaIndex { slugs, neighbors })
}

/// List areas ordered by (type, name)
pub async fn list_geoareas(State(state): State<AppState>) -> Result<Json<Vec<GeoAreaResponse>>> {
    let repo = Repository::new(state.db.clone());

    let areas = repo.list_geo_areas().await?;
    let index = build_index(&repo, &areas, &areas).await?;

    Ok(Json(areas.into_iter().map(|a| index.response(a)).collect()))
}

pub async fn get_geoarea(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<GeoAreaResponse>> {
    let repo = Repository::new(state.db.clone());

    let area = repo
        .find_geo_area_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::not_found("geoarea", &slug))?;
    let index = build_index(&repo, std::slice::from_ref(&area), &[]).await?;

    Ok(Json(index.response(area)))
}
