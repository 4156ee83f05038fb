//! Repository pattern for database operations
//!
//! Read-side queries used by the API and the operator CLI, plus lead
//! capture. Page-tree mutation lives with the maintenance tooling.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::Result;
use crate::metrics::record_coverage_gate;
use crate::quality::{QualityPolicy, QualityReport, Readiness};
use sea_orm::sea_query::NullOrdering;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use std::collections::HashSet;

/// Content-type key of service pages
pub const SERVICE_PAGE_TYPE: &str = "servicepage";

/// Content-type key of project pages
pub const PROJECT_PAGE_TYPE: &str = "projectpage";

/// Optional narrowing of the coverage list
#[derive(Debug, Clone, Copy, Default)]
pub struct CoverageFilter {
    pub geo_id: Option<i64>,
    pub service_id: Option<i64>,
}

/// Count and average rating of the testimonials attached to an area
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ReviewsSummary {
    pub count: u64,
    pub avg: Option<f64>,
}

impl ReviewsSummary {
    /// Average rounded to one decimal, `None` for an empty set
    pub fn from_ratings(ratings: &[i16]) -> Self {
        if ratings.is_empty() {
            return Self::default();
        }
        let sum: f64 = ratings.iter().map(|r| f64::from(*r)).sum();
        let avg = sum / ratings.len() as f64;
        Self {
            count: ratings.len() as u64,
            avg: Some((avg * 10.0).round() / 10.0),
        }
    }
}

/// Validated lead ready to be stored
#[derive(Debug, Clone, Default)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub source_path: String,
    pub utm: serde_json::Value,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Service Pages
    // ========================================================================

    /// Live service pages ordered by title
    pub async fn list_service_pages(&self) -> Result<Vec<(Page, Option<ServicePage>)>> {
        PageEntity::find()
            .filter(PageColumn::ContentType.eq(SERVICE_PAGE_TYPE))
            .filter(PageColumn::Live.eq(true))
            .order_by_asc(PageColumn::Title)
            .find_also_related(ServicePageEntity)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Live service page by page ID
    pub async fn find_service_page(&self, id: i64) -> Result<Option<(Page, Option<ServicePage>)>> {
        PageEntity::find_by_id(id)
            .filter(PageColumn::ContentType.eq(SERVICE_PAGE_TYPE))
            .filter(PageColumn::Live.eq(true))
            .find_also_related(ServicePageEntity)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Service page by slug, live or not
    pub async fn find_service_page_by_slug(&self, slug: &str) -> Result<Option<Page>> {
        PageEntity::find()
            .filter(PageColumn::ContentType.eq(SERVICE_PAGE_TYPE))
            .filter(PageColumn::Slug.eq(slug))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Service pages by ID, used to label coverage records
    pub async fn service_pages_by_ids(&self, ids: &[i64]) -> Result<Vec<Page>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        PageEntity::find()
            .filter(PageColumn::Id.is_in(ids.iter().copied()))
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Project Pages
    // ========================================================================

    /// Live project pages, newest first
    pub async fn list_project_pages(&self) -> Result<Vec<(Page, Option<ProjectPage>)>> {
        PageEntity::find()
            .filter(PageColumn::ContentType.eq(PROJECT_PAGE_TYPE))
            .filter(PageColumn::Live.eq(true))
            .order_by_with_nulls(PageColumn::FirstPublishedAt, Order::Desc, NullOrdering::Last)
            .order_by_desc(PageColumn::Id)
            .find_also_related(ProjectPageEntity)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Live project page by slug
    pub async fn find_project_page_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<(Page, Option<ProjectPage>)>> {
        PageEntity::find()
            .filter(PageColumn::ContentType.eq(PROJECT_PAGE_TYPE))
            .filter(PageColumn::Live.eq(true))
            .filter(PageColumn::Slug.eq(slug))
            .find_also_related(ProjectPageEntity)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Images
    // ========================================================================

    /// Images by ID, in no particular order
    pub async fn images_by_ids(&self, ids: &[i64]) -> Result<Vec<Image>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        ImageEntity::find()
            .filter(ImageColumn::Id.is_in(ids.iter().copied()))
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Stored renditions of the given images for one filter spec
    pub async fn renditions_for(&self, image_ids: &[i64], filter_spec: &str) -> Result<Vec<Rendition>> {
        if image_ids.is_empty() {
            return Ok(Vec::new());
        }
        RenditionEntity::find()
            .filter(RenditionColumn::ImageId.is_in(image_ids.iter().copied()))
            .filter(RenditionColumn::FilterSpec.eq(filter_spec))
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Testimonials
    // ========================================================================

    /// Testimonials newest first, undated last
    pub async fn list_testimonials(&self, geo_id: Option<i64>) -> Result<Vec<Testimonial>> {
        let mut query = TestimonialEntity::find();
        if let Some(geo_id) = geo_id {
            query = query.filter(TestimonialColumn::GeoareaId.eq(geo_id));
        }
        query
            .order_by_with_nulls(TestimonialColumn::Date, Order::Desc, NullOrdering::Last)
            .order_by_desc(TestimonialColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find testimonial by ID
    pub async fn find_testimonial(&self, id: i64) -> Result<Option<Testimonial>> {
        TestimonialEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// At least one testimonial references the area
    pub async fn has_testimonial_for_geoarea(&self, geo_id: i64) -> Result<bool> {
        let count = TestimonialEntity::find()
            .filter(TestimonialColumn::GeoareaId.eq(geo_id))
            .count(self.read_conn())
            .await?;
        Ok(count > 0)
    }

    /// Rating summary of an area's testimonials
    pub async fn reviews_summary(&self, geo_id: i64) -> Result<ReviewsSummary> {
        let ratings: Vec<i16> = TestimonialEntity::find()
            .select_only()
            .column(TestimonialColumn::Rating)
            .filter(TestimonialColumn::GeoareaId.eq(geo_id))
            .into_tuple()
            .all(self.read_conn())
            .await?;
        Ok(ReviewsSummary::from_ratings(&ratings))
    }

    // ========================================================================
    // Service Areas
    // ========================================================================

    pub async fn list_service_areas(&self) -> Result<Vec<ServiceArea>> {
        ServiceAreaEntity::find()
            .order_by_asc(ServiceAreaColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_service_area_by_slug(&self, slug: &str) -> Result<Option<ServiceArea>> {
        ServiceAreaEntity::find()
            .filter(ServiceAreaColumn::Slug.eq(slug))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Geo Areas
    // ========================================================================

    /// All areas ordered by (type, name)
    pub async fn list_geo_areas(&self) -> Result<Vec<GeoArea>> {
        GeoAreaEntity::find()
            .order_by_asc(GeoAreaColumn::AreaType)
            .order_by_asc(GeoAreaColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_geo_area_by_slug(&self, slug: &str) -> Result<Option<GeoArea>> {
        GeoAreaEntity::find()
            .filter(GeoAreaColumn::Slug.eq(slug))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn geo_areas_by_ids(&self, ids: &[i64]) -> Result<Vec<GeoArea>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        GeoAreaEntity::find()
            .filter(GeoAreaColumn::Id.is_in(ids.iter().copied()))
            .order_by_asc(GeoAreaColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Neighbor links `(from, to)` starting at the given areas.
    ///
    /// Links are stored in both directions, so `from` alone is enough.
    pub async fn neighbor_links(&self, ids: &[i64]) -> Result<Vec<(i64, i64)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        GeoAreaNeighborEntity::find()
            .select_only()
            .column(GeoAreaNeighborColumn::FromId)
            .column(GeoAreaNeighborColumn::ToId)
            .filter(GeoAreaNeighborColumn::FromId.is_in(ids.iter().copied()))
            .into_tuple()
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Service Coverage
    // ========================================================================

    /// Coverage records with `status = ready`; quality is checked by the caller
    pub async fn list_ready_coverages(&self, filter: CoverageFilter) -> Result<Vec<ServiceCoverage>> {
        let mut query = ServiceCoverageEntity::find()
            .filter(ServiceCoverageColumn::Status.eq(CoverageStatus::Ready.as_str()));

        if let Some(geo_id) = filter.geo_id {
            query = query.filter(ServiceCoverageColumn::GeoareaId.eq(geo_id));
        }
        if let Some(service_id) = filter.service_id {
            query = query.filter(ServiceCoverageColumn::ServiceId.eq(service_id));
        }

        query
            .order_by_asc(ServiceCoverageColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_coverage(&self, id: i64) -> Result<Option<ServiceCoverage>> {
        ServiceCoverageEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// The (unique) coverage of a service in an area
    pub async fn find_coverage_for(&self, service_id: i64, geo_id: i64) -> Result<Option<ServiceCoverage>> {
        ServiceCoverageEntity::find()
            .filter(ServiceCoverageColumn::ServiceId.eq(service_id))
            .filter(ServiceCoverageColumn::GeoareaId.eq(geo_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Areas among `geo_ids` referenced by at least one testimonial
    pub async fn geoareas_with_testimonials(&self, geo_ids: &[i64]) -> Result<HashSet<i64>> {
        if geo_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let ids: Vec<Option<i64>> = TestimonialEntity::find()
            .select_only()
            .column(TestimonialColumn::GeoareaId)
            .filter(TestimonialColumn::GeoareaId.is_in(geo_ids.iter().copied()))
            .distinct()
            .into_tuple()
            .all(self.read_conn())
            .await?;
        Ok(ids.into_iter().flatten().collect())
    }

    /// Visibility decision for a coverage record.
    ///
    /// The testimonial lookup only runs once the content thresholds pass.
    pub async fn coverage_readiness(
        &self,
        policy: &QualityPolicy,
        coverage: &ServiceCoverage,
    ) -> Result<Readiness> {
        let report = policy.evaluate(coverage);
        let lookups = policy.testimonial_lookups(std::slice::from_ref(coverage), &[report]);
        let has_local_testimonial = !self.geoareas_with_testimonials(&lookups).await?.is_empty();

        Ok(gate(policy, coverage, report, has_local_testimonial))
    }

    /// Visibility decisions for many records, in input order.
    ///
    /// Testimonials are looked up in one query for every area whose records
    /// pass the content thresholds.
    pub async fn coverage_readiness_batch(
        &self,
        policy: &QualityPolicy,
        coverages: &[ServiceCoverage],
    ) -> Result<Vec<Readiness>> {
        let reports: Vec<QualityReport> = coverages.iter().map(|c| policy.evaluate(c)).collect();
        let with_testimonials = self
            .geoareas_with_testimonials(&policy.testimonial_lookups(coverages, &reports))
            .await?;

        Ok(coverages
            .iter()
            .zip(reports)
            .map(|(coverage, report)| {
                gate(policy, coverage, report, with_testimonials.contains(&coverage.geoarea_id))
            })
            .collect())
    }

    // ========================================================================
    // Leads
    // ========================================================================

    /// Store a lead
    pub async fn create_lead(&self, lead: NewLead) -> Result<Lead> {
        let model = LeadActiveModel {
            name: Set(lead.name),
            email: Set(lead.email),
            phone: Set(lead.phone),
            message: Set(lead.message),
            source_path: Set(lead.source_path),
            utm: Set(lead.utm),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        model.insert(self.write_conn()).await.map_err(Into::into)
    }

    // ========================================================================
    // Sites & Settings
    // ========================================================================

    pub async fn list_sites(&self) -> Result<Vec<Site>> {
        SiteEntity::find()
            .order_by_asc(SiteColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Theme and contact settings, defaults when the row is missing
    pub async fn site_settings(&self, site_id: i64) -> Result<SiteSettings> {
        let settings = SiteSettingsEntity::find_by_id(site_id)
            .one(self.read_conn())
            .await?;
        Ok(settings.unwrap_or_else(|| SiteSettings::defaults_for(site_id)))
    }

    /// Local SEO toggles, defaults when the row is missing
    pub async fn local_seo_settings(&self, site_id: i64) -> Result<LocalSeoSettings> {
        let settings = LocalSeoSettingsEntity::find_by_id(site_id)
            .one(self.read_conn())
            .await?;
        Ok(settings.unwrap_or_else(|| LocalSeoSettings::defaults_for(site_id)))
    }
}

fn gate(
    policy: &QualityPolicy,
    coverage: &ServiceCoverage,
    report: QualityReport,
    has_local_testimonial: bool,
) -> Readiness {
    let readiness = policy.readiness(coverage, report, has_local_testimonial);
    record_coverage_gate(readiness.label());

    tracing::debug!(
        coverage_id = coverage.id,
        outcome = readiness.label(),
        words = report.word_count,
        modules = report.module_count,
        images = report.image_count,
        "Coverage readiness evaluated"
    );
    readiness
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reviews_summary_rounds_average() {
        let summary = ReviewsSummary::from_ratings(&[5, 4, 4]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.avg, Some(4.3));
    }

    #[test]
    fn test_reviews_summary_empty() {
        let summary = ReviewsSummary::from_ratings(&[]);
        assert_eq!(summary, ReviewsSummary { count: 0, avg: None });
    }
}
