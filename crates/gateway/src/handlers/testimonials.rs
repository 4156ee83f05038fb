//! Testimonial handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::AppState;
use trades_common::{
    db::{models::Testimonial, Repository},
    errors::{AppError, Result},
};

#[derive(Debug, Default, Deserialize)]
pub struct TestimonialQuery {
    /// Geo area slug
    pub geo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TestimonialResponse {
    pub id: i64,
    pub name: String,
    pub rating: i16,
    pub source: String,
    pub quote: String,
    pub date: Option<NaiveDate>,
}

impl From<Testimonial> for TestimonialResponse {
    fn from(t: Testimonial) -> Self {
        Self {
            id: t.id,
            name: t.name,
            rating: t.rating,
            source: t.source,
            quote: t.quote,
            date: t.date,
        }
    }
}

/// List testimonials, newest first; `?geo=` narrows to one area
pub async fn list_testimonials(
    State(state): State<AppState>,
    Query(query): Query<TestimonialQuery>,
) -> Result<Json<Vec<TestimonialResponse>>> {
    let repo = Repository::new(state.db.clone());

    let geo_id = match query.geo.as_deref().filter(|s| !s.is_empty()) {
        Some(slug) => match repo.find_geo_area_by_slug(slug).await? {
            Some(area) => Some(area.id),
            // Unknown area: nothing can match
            None => return Ok(Json(Vec::new())),
        },
        None => None,
    };

    let testimonials = repo.list_testimonials(geo_id).await?;
    Ok(Json(testimonials.into_iter().map(Into::into).collect()))
}

pub async fn get_testimonial(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TestimonialResponse>> {
    let id = parse_id("testimonial", &id)?;
    let repo = Repository::new(state.db.clone());

    let testimonial = repo
        .find_testimonial(id)
        .await?
        .ok_or_else(|| AppError::not_found("testimonial", id))?;

    Ok(Json(testimonial.into()))
}
