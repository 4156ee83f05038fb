//! Service page handlers

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use std::collections::HashMap;

use super::{parse_id, request_origin, resolve_images};
use crate::AppState;
use trades_common::{
    db::{
        models::{Page, ServicePage},
        Repository,
    },
    errors::{AppError, Result},
    media::ImageRef,
};

/// Public shape of a service page
#[derive(Debug, Serialize)]
pub struct ServiceResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub hero: Option<String>,
    /// Pages carry no icon; kept for front-end compatibility
    pub icon: Option<String>,
}

impl ServiceResponse {
    fn build(page: Page, data: Option<ServicePage>, images: &HashMap<i64, ImageRef>) -> Self {
        let hero = data
            .as_ref()
            .and_then(|d| d.hero_image_id)
            .and_then(|id| images.get(&id))
            .map(|image| image.url.clone());

        Self {
            id: page.id,
            name: page.title,
            slug: page.slug,
            description: data.map(|d| d.intro).unwrap_or_default(),
            hero,
            icon: None,
        }
    }
}

fn hero_ids(rows: &[(Page, Option<ServicePage>)]) -> Vec<i64> {
    rows.iter()
        .filter_map(|(_, data)| data.as_ref().and_then(|d| d.hero_image_id))
        .collect()
}

/// List live services ordered by title
pub async fn list_services(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ServiceResponse>>> {
    let repo = Repository::new(state.db.clone());
    let origin = request_origin(&headers);

    let rows = repo.list_service_pages().await?;
    let images = resolve_images(&state, &repo, hero_ids(&rows), origin.as_deref()).await?;

    let services = rows
        .into_iter()
        .map(|(page, data)| ServiceResponse::build(page, data, &images))
        .collect();

    Ok(Json(services))
}

/// Get a live service by page ID
pub async fn get_service(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ServiceResponse>> {
    let id = parse_id("service", &id)?;
    let repo = Repository::new(state.db.clone());
    let origin = request_origin(&headers);

    let (page, data) = repo
        .find_service_page(id)
        .await?
        .ok_or_else(|| AppError::not_found("service", id))?;

    let hero = data.as_ref().and_then(|d| d.hero_image_id);
    let images = resolve_images(&state, &repo, hero.into_iter().collect(), origin.as_deref()).await?;

    Ok(Json(ServiceResponse::build(page, data, &images)))
}
