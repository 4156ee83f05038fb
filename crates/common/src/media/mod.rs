//! Public image URLs
//!
//! Renditions are only read, never generated: an image is served through
//! its stored rendition for the configured filter spec when one exists,
//! and through the original file otherwise.

use crate::config::MediaConfig;
use crate::db::models::{Image, Rendition};
use crate::errors::{AppError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// One `name-arg` step of a filter spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOp {
    pub name: String,
    pub arg: Option<String>,
}

/// Parsed filter spec such as `width-1200|format-webp`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionSpec {
    ops: Vec<FilterOp>,
}

impl RenditionSpec {
    #[cfg(test)]
    pub fn ops(&self) -> &[FilterOp] {
        &self.ops
    }
}

impl FromStr for RenditionSpec {
    type Err = AppError;

    fn from_str(spec: &str) -> Result<Self> {
        let mut ops = Vec::new();

        for step in spec.split('|') {
            let step = step.trim();
            let (name, arg) = match step.split_once('-') {
                Some((name, arg)) => (name, Some(arg)),
                None => (step, None),
            };

            if name.is_empty() || arg.is_some_and(str::is_empty) {
                return Err(AppError::InvalidFormat {
                    message: format!("invalid rendition filter step '{}' in '{}'", step, spec),
                });
            }

            ops.push(FilterOp {
                name: name.to_string(),
                arg: arg.map(str::to_string),
            });
        }

        Ok(Self { ops })
    }
}

impl fmt::Display for RenditionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            match &op.arg {
                Some(arg) => write!(f, "{}-{}", op.name, arg)?,
                None => f.write_str(&op.name)?,
            }
        }
        Ok(())
    }
}

/// Public reference to an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub url: String,
    pub alt: String,
}

/// Builds public URLs for stored images
#[derive(Debug, Clone)]
pub struct MediaResolver {
    media_url: String,
    spec: RenditionSpec,
    public_base_url: Option<String>,
}

impl MediaResolver {
    pub fn new(config: &MediaConfig) -> Result<Self> {
        Ok(Self {
            media_url: config.media_url.clone(),
            spec: config.rendition_spec.parse()?,
            public_base_url: config
                .public_base_url
                .as_deref()
                .map(|base| base.trim_end_matches('/').to_string()),
        })
    }

    /// Canonical filter spec string used to look up renditions
    pub fn filter_spec(&self) -> String {
        self.spec.to_string()
    }

    /// URL of a stored file under the media prefix
    pub fn file_url(&self, file: &str) -> String {
        if is_absolute(file) {
            return file.to_string();
        }
        format!(
            "{}/{}",
            self.media_url.trim_end_matches('/'),
            file.trim_start_matches('/')
        )
    }

    /// Rendition URL when one is stored, else the original file
    pub fn image_url(&self, image: &Image, rendition: Option<&Rendition>) -> String {
        match rendition {
            Some(rendition) => self.file_url(&rendition.file),
            None => self.file_url(&image.file),
        }
    }

    /// Make a URL absolute against the public base URL or the request origin.
    ///
    /// `origin` is `scheme://host[:port]` of the current request.
    pub fn absolute(&self, url: &str, origin: Option<&str>) -> String {
        if is_absolute(url) {
            return url.to_string();
        }
        match self.public_base_url.as_deref().or(origin) {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url.trim_start_matches('/')
            ),
            None => url.to_string(),
        }
    }

    /// Absolute URL and alt text for every image, keyed by image ID
    pub fn resolve_all(
        &self,
        images: &[Image],
        renditions: &[Rendition],
        origin: Option<&str>,
    ) -> HashMap<i64, ImageRef> {
        let by_image: HashMap<i64, &Rendition> =
            renditions.iter().map(|r| (r.image_id, r)).collect();

        images
            .iter()
            .map(|image| {
                let url = self.image_url(image, by_image.get(&image.id).copied());
                let image_ref = ImageRef {
                    url: self.absolute(&url, origin),
                    alt: image.title.clone(),
                };
                (image.id, image_ref)
            })
            .collect()
    }
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: i64, file: &str) -> Image {
        Image {
            id,
            title: format!("Image {}", id),
            file: file.to_string(),
            width: 2400,
            height: 1600,
            created_at: chrono::Utc::now().into(),
        }
    }

    fn rendition(image_id: i64, file: &str) -> Rendition {
        Rendition {
            id: image_id * 10,
            image_id,
            filter_spec: "width-1200|format-webp".into(),
            file: file.to_string(),
            width: 1200,
            height: 800,
        }
    }

    #[test]
    fn test_parse_rendition_spec() {
        let spec: RenditionSpec = "width-1200|format-webp".parse().unwrap();
        assert_eq!(spec.ops().len(), 2);
        assert_eq!(spec.ops()[0].name, "width");
        assert_eq!(spec.ops()[0].arg.as_deref(), Some("1200"));
        assert_eq!(spec.to_string(), "width-1200|format-webp");

        let original: RenditionSpec = "original".parse().unwrap();
        assert_eq!(original.ops()[0].arg, None);

        assert!("width-|format-webp".parse::<RenditionSpec>().is_err());
        assert!("".parse::<RenditionSpec>().is_err());
    }

    #[test]
    fn test_rendition_preferred_over_original() {
        let resolver = MediaResolver::new(&MediaConfig::default()).unwrap();
        let img = image(1, "original_images/roof.jpg");
        let rend = rendition(1, "images/roof.width-1200.webp");

        assert_eq!(resolver.image_url(&img, Some(&rend)), "/media/images/roof.width-1200.webp");
        assert_eq!(resolver.image_url(&img, None), "/media/original_images/roof.jpg");
    }

    #[test]
    fn test_absolute_prefers_public_base() {
        let mut config = MediaConfig::default();
        let resolver = MediaResolver::new(&config).unwrap();
        assert_eq!(
            resolver.absolute("/media/a.jpg", Some("http://localhost:8000")),
            "http://localhost:8000/media/a.jpg"
        );
        assert_eq!(resolver.absolute("/media/a.jpg", None), "/media/a.jpg");
        assert_eq!(
            resolver.absolute("https://cdn.example.com/a.jpg", Some("http://localhost")),
            "https://cdn.example.com/a.jpg"
        );

        config.public_base_url = Some("https://www.example.com/".into());
        let resolver = MediaResolver::new(&config).unwrap();
        assert_eq!(
            resolver.absolute("/media/a.jpg", Some("http://localhost:8000")),
            "https://www.example.com/media/a.jpg"
        );
    }

    #[test]
    fn test_absolute_joins_relative_media_prefix() {
        let config = MediaConfig {
            media_url: "media".into(),
            public_base_url: Some("https://www.example.com".into()),
            ..MediaConfig::default()
        };
        let resolver = MediaResolver::new(&config).unwrap();

        let url = resolver.file_url("original_images/a.jpg");
        assert_eq!(url, "media/original_images/a.jpg");
        assert_eq!(
            resolver.absolute(&url, None),
            "https://www.example.com/media/original_images/a.jpg"
        );
    }

    #[test]
    fn test_resolve_all_falls_back_per_image() {
        let resolver = MediaResolver::new(&MediaConfig::default()).unwrap();
        let images = vec![image(1, "original_images/a.jpg"), image(2, "original_images/b.jpg")];
        let renditions = vec![rendition(2, "images/b.width-1200.webp")];

        let refs = resolver.resolve_all(&images, &renditions, Some("https://site.test"));
        assert_eq!(refs[&1].url, "https://site.test/media/original_images/a.jpg");
        assert_eq!(refs[&2].url, "https://site.test/media/images/b.width-1200.webp");
        assert_eq!(refs[&2].alt, "Image 2");
    }
}
