//! SeaORM entity models
//!
//! Database entities for the Trades CMS

mod geo_area;
mod geo_area_neighbor;
mod image;
mod lead;
mod local_seo_settings;
mod page;
mod page_refs;
mod page_revision;
mod project_page;
mod rendition;
mod service_area;
mod service_coverage;
mod service_page;
mod site;
mod site_settings;
mod testimonial;

pub use page::{
    Entity as PageEntity,
    Model as Page,
    ActiveModel as PageActiveModel,
    Column as PageColumn,
};

pub use page_revision::{
    Entity as PageRevisionEntity,
    Model as PageRevision,
    ActiveModel as PageRevisionActiveModel,
    Column as PageRevisionColumn,
};

pub use page_refs::view_restriction::{
    Entity as ViewRestrictionEntity,
    Model as ViewRestriction,
    Column as ViewRestrictionColumn,
};

pub use page_refs::group_permission::{
    Entity as GroupPermissionEntity,
    Model as GroupPermission,
    Column as GroupPermissionColumn,
};

pub use page_refs::redirect::{
    Entity as RedirectEntity,
    Model as Redirect,
    Column as RedirectColumn,
};

pub use service_page::{
    Entity as ServicePageEntity,
    Model as ServicePage,
    Column as ServicePageColumn,
};

pub use project_page::{
    Entity as ProjectPageEntity,
    Model as ProjectPage,
    Column as ProjectPageColumn,
};

pub use image::{
    Entity as ImageEntity,
    Model as Image,
    Column as ImageColumn,
};

pub use rendition::{
    Entity as RenditionEntity,
    Model as Rendition,
    Column as RenditionColumn,
};

pub use geo_area::{
    Entity as GeoAreaEntity,
    Model as GeoArea,
    Column as GeoAreaColumn,
    GeoAreaType,
};

pub use geo_area_neighbor::{
    Entity as GeoAreaNeighborEntity,
    Model as GeoAreaNeighbor,
    Column as GeoAreaNeighborColumn,
};

pub use service_coverage::{
    Entity as ServiceCoverageEntity,
    Model as ServiceCoverage,
    Column as ServiceCoverageColumn,
    CoverageStatus,
};

pub use testimonial::{
    Entity as TestimonialEntity,
    Model as Testimonial,
    Column as TestimonialColumn,
};

pub use service_area::{
    Entity as ServiceAreaEntity,
    Model as ServiceArea,
    Column as ServiceAreaColumn,
};

pub use lead::{
    Entity as LeadEntity,
    Model as Lead,
    ActiveModel as LeadActiveModel,
    Column as LeadColumn,
};

pub use site::{
    Entity as SiteEntity,
    Model as Site,
    Column as SiteColumn,
};

pub use site_settings::{
    Entity as SiteSettingsEntity,
    Model as SiteSettings,
};

pub use local_seo_settings::{
    Entity as LocalSeoSettingsEntity,
    Model as LocalSeoSettings,
};
