//! Project (portfolio) page handlers

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use std::collections::HashMap;

use super::{request_origin, resolve_images};
use crate::AppState;
use trades_common::{
    db::{
        models::{Page, ProjectPage},
        Repository,
    },
    errors::{AppError, Result},
    media::ImageRef,
};

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub city: String,
    pub tags: Vec<String>,
    pub before: Option<String>,
    pub after: Option<String>,
    pub images: Vec<ImageRef>,
    pub url: String,
}

impl ProjectResponse {
    fn build(
        state: &AppState,
        page: Page,
        data: Option<ProjectPage>,
        images: &HashMap<i64, ImageRef>,
        origin: Option<&str>,
    ) -> Self {
        let url_of = |id: Option<i64>| id.and_then(|id| images.get(&id)).map(|i| i.url.clone());

        // Gallery images use the page title as alt text
        let gallery = data
            .as_ref()
            .map(|d| d.gallery_image_ids())
            .unwrap_or_default()
            .into_iter()
            .filter_map(|id| images.get(&id))
            .map(|image| ImageRef {
                url: image.url.clone(),
                alt: page.title.clone(),
            })
            .collect();

        Self {
            id: page.id,
            url: state.media.absolute(&format!("/projects/{}/", page.slug), origin),
            before: url_of(data.as_ref().and_then(|d| d.before_image_id)),
            after: url_of(data.as_ref().and_then(|d| d.after_image_id)),
            city: data.as_ref().map(|d| d.city.clone()).unwrap_or_default(),
            tags: data.as_ref().map(|d| d.tag_names()).unwrap_or_default(),
            images: gallery,
            title: page.title,
            slug: page.slug,
        }
    }
}

fn image_ids(data: Option<&ProjectPage>) -> Vec<i64> {
    let Some(data) = data else {
        return Vec::new();
    };
    let mut ids = data.gallery_image_ids();
    ids.extend(data.before_image_id);
    ids.extend(data.after_image_id);
    ids
}

/// List live projects, newest first
pub async fn list_projects(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ProjectResponse>>> {
    let repo = Repository::new(state.db.clone());
    let origin = request_origin(&headers);

    let rows = repo.list_project_pages().await?;
    let ids = rows.iter().flat_map(|(_, data)| image_ids(data.as_ref())).collect();
    let images = resolve_images(&state, &repo, ids, origin.as_deref()).await?;

    let projects = rows
        .into_iter()
        .map(|(page, data)| ProjectResponse::build(&state, page, data, &images, origin.as_deref()))
        .collect();

    Ok(Json(projects))
}

/// Get a live project by slug
pub async fn get_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<ProjectResponse>> {
    let repo = Repository::new(state.db.clone());
    let origin = request_origin(&headers);

    let (page, data) = repo
        .find_project_page_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::not_found("project", &slug))?;

    let images = resolve_images(&state, &repo, image_ids(data.as_ref()), origin.as_deref()).await?;

    Ok(Json(ProjectResponse::build(&state, page, data, &images, origin.as_deref())))
}
