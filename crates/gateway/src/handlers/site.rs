//! Site configuration handlers (theme tokens, contact details, local SEO toggles)

use axum::{
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use serde::Serialize;

use crate::AppState;
use trades_common::{
    db::{
        models::{LocalSeoSettings, Site, SiteSettings},
        Repository,
    },
    errors::Result,
};

/// Theme tokens
#[derive(Debug, Serialize)]
pub struct ThemeTokens {
    pub primary: String,
    pub accent: String,
    pub neutral: String,
    pub radius: String,
    pub font_body: String,
    pub font_heading: String,
    pub layout_variant: String,
}

#[derive(Debug, Serialize)]
pub struct ContactDetails {
    pub phone: String,
    pub whatsapp: String,
    pub email: String,
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct LocalSeoToggles {
    pub local_seo_enabled: bool,
    pub primary_city_slug: String,
    pub gbp_url: String,
    pub service_radius_km: i32,
    pub default_utm_source: String,
    pub default_utm_campaign: String,
}

/// Flat site configuration document
#[derive(Debug, Serialize)]
pub struct SiteConfigResponse {
    pub site_name: String,
    #[serde(flatten)]
    pub theme: ThemeTokens,
    #[serde(flatten)]
    pub contact: ContactDetails,
    #[serde(flatten)]
    pub local_seo: LocalSeoToggles,
}

/// One entry of the `/themes` list
#[derive(Debug, Serialize)]
pub struct ThemeResponse {
    pub name: String,
    #[serde(flatten)]
    pub theme: ThemeTokens,
    pub phone: String,
}

impl From<SiteSettings> for ThemeTokens {
    fn from(s: SiteSettings) -> Self {
        Self {
            primary: s.primary,
            accent: s.accent,
            neutral: s.neutral,
            radius: s.radius,
            font_body: s.font_body,
            font_heading: s.font_heading,
            layout_variant: s.layout_variant,
        }
    }
}

impl From<LocalSeoSettings> for LocalSeoToggles {
    fn from(s: LocalSeoSettings) -> Self {
        Self {
            local_seo_enabled: s.local_seo_enabled,
            primary_city_slug: s.primary_city_slug,
            gbp_url: s.gbp_url,
            service_radius_km: s.service_radius_km,
            default_utm_source: s.default_utm_source,
            default_utm_campaign: s.default_utm_campaign,
        }
    }
}

/// Split a `Host` header into hostname and port (80 when absent)
fn parse_host(host: &str) -> (String, i32) {
    let host = host.trim().to_ascii_lowercase();
    if let Some((name, port)) = host.rsplit_once(':') {
        if !name.is_empty() && !port.contains(']') {
            if let Ok(port) = port.parse::<i32>() {
                return (name.to_string(), port);
            }
        }
    }
    (host, 80)
}

/// Pick the site serving a request.
///
/// Exact hostname and port first, then a hostname shared by no other site,
/// then the default site, then the first site.
pub fn resolve_site<'a>(sites: &'a [Site], host: Option<&str>) -> Option<&'a Site> {
    if let Some((hostname, port)) = host.map(parse_host) {
        if let Some(site) = sites
            .iter()
            .find(|s| s.hostname.eq_ignore_ascii_case(&hostname) && s.port == port)
        {
            return Some(site);
        }

        let mut same_host = sites.iter().filter(|s| s.hostname.eq_ignore_ascii_case(&hostname));
        if let (Some(site), None) = (same_host.next(), same_host.next()) {
            return Some(site);
        }
    }

    sites.iter().find(|s| s.is_default_site).or_else(|| sites.first())
}

/// Settings of the resolved site; defaults when there is no site at all
async fn load_settings(
    repo: &Repository,
    headers: &HeaderMap,
) -> Result<(String, SiteSettings, LocalSeoSettings)> {
    let sites = repo.list_sites().await?;
    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok());

    match resolve_site(&sites, host) {
        Some(site) => Ok((
            site.site_name.clone(),
            repo.site_settings(site.id).await?,
            repo.local_seo_settings(site.id).await?,
        )),
        None => Ok((
            String::new(),
            SiteSettings::defaults_for(0),
            LocalSeoSettings::defaults_for(0),
        )),
    }
}

/// Site configuration for the requesting host
pub async fn get_config(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SiteConfigResponse>> {
    let repo = Repository::new(state.db.clone());
    let (site_name, settings, local_seo) = load_settings(&repo, &headers).await?;

    let contact = ContactDetails {
        phone: settings.phone.clone(),
        whatsapp: settings.whatsapp.clone(),
        email: settings.email.clone(),
        address: settings.address.clone(),
    };

    Ok(Json(SiteConfigResponse {
        site_name,
        theme: settings.into(),
        contact,
        local_seo: local_seo.into(),
    }))
}

/// Theme tokens in list shape
pub async fn list_themes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ThemeResponse>>> {
    let repo = Repository::new(state.db.clone());
    let (site_name, settings, _) = load_settings(&repo, &headers).await?;
    let phone = settings.phone.clone();

    Ok(Json(vec![ThemeResponse {
        name: site_name,
        theme: settings.into(),
        phone,
    }]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(id: i64, hostname: &str, port: i32, default: bool) -> Site {
        Site {
            id,
            hostname: hostname.to_string(),
            port,
            site_name: format!("site {}", id),
            root_page_id: 1,
            is_default_site: default,
        }
    }

    #[test]
    fn test_parse_host() {
        assert_eq!(parse_host("Example.com"), ("example.com".to_string(), 80));
        assert_eq!(parse_host("example.com:8000"), ("example.com".to_string(), 8000));
        assert_eq!(parse_host("[::1]:8000"), ("[::1]".to_string(), 8000));
    }

    #[test]
    fn test_resolve_site_order() {
        let sites = vec![
            site(1, "localhost", 80, false),
            site(2, "www.example.com", 80, true),
            site(3, "www.example.com", 8080, false),
            site(4, "roofs.test", 80, false),
        ];

        // exact host and port
        assert_eq!(resolve_site(&sites, Some("www.example.com:8080")).map(|s| s.id), Some(3));
        // unique hostname, port ignored
        assert_eq!(resolve_site(&sites, Some("roofs.test:3000")).map(|s| s.id), Some(4));
        // ambiguous hostname falls back to default
        assert_eq!(resolve_site(&sites, Some("www.example.com:9000")).map(|s| s.id), Some(2));
        // unknown host
        assert_eq!(resolve_site(&sites, Some("other.test")).map(|s| s.id), Some(2));
        assert_eq!(resolve_site(&sites, None).map(|s| s.id), Some(2));
    }

    #[test]
    fn test_resolve_site_without_default() {
        let sites = vec![site(5, "a.test", 80, false), site(6, "b.test", 80, false)];
        assert_eq!(resolve_site(&sites, Some("c.test")).map(|s| s.id), Some(5));
        assert!(resolve_site(&[], Some("c.test")).is_none());
    }
}
