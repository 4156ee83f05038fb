//! Coverage quality gate
//!
//! Decides whether a per-service/per-area landing page carries enough
//! unique content to be published. Counting rules:
//! - words: markup-stripped intro plus the `text` of every local module
//! - modules: every element of the three local module streams
//! - images: hero image plus `<img` tags embedded in module text
//!
//! Thresholds come from [`QualityConfig`](crate::config::QualityConfig).
//! Evaluation is pure; malformed stream data contributes nothing instead
//! of failing the whole computation.

use crate::config::QualityConfig;
use crate::db::models::{CoverageStatus, ServiceCoverage};
use regex_lite::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"))
}

fn img_pattern() -> &'static Regex {
    static IMG: OnceLock<Regex> = OnceLock::new();
    IMG.get_or_init(|| Regex::new(r"<img\s").expect("valid img pattern"))
}

/// Thresholds a coverage page must meet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityPolicy {
    pub min_words: usize,
    pub min_modules: usize,
    pub min_images: usize,
    pub require_local_testimonial: bool,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self::from(&QualityConfig::default())
    }
}

impl From<&QualityConfig> for QualityPolicy {
    fn from(config: &QualityConfig) -> Self {
        Self {
            min_words: config.min_words,
            min_modules: config.min_modules,
            min_images: config.min_images,
            require_local_testimonial: config.require_local_testimonial,
        }
    }
}

/// Content counts for one coverage record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QualityReport {
    pub word_count: usize,
    pub module_count: usize,
    pub image_count: usize,
    /// All three thresholds met (testimonial check not included)
    pub base_ok: bool,
}

impl QualityPolicy {
    /// Count words, modules and images of a coverage record
    pub fn evaluate(&self, coverage: &ServiceCoverage) -> QualityReport {
        let mut report = QualityReport {
            word_count: count_words(&coverage.unique_intro),
            image_count: usize::from(coverage.hero_image_id.is_some()),
            ..QualityReport::default()
        };

        for stream in coverage.module_streams() {
            // A stream that is not a list is treated as empty
            let Some(blocks) = stream.as_array() else {
                continue;
            };

            for block in blocks {
                report.module_count += 1;
                if let Some(text) = module_text(block) {
                    report.word_count += count_words(text);
                    report.image_count += count_images(text);
                }
            }
        }

        report.base_ok = report.word_count >= self.min_words
            && report.module_count >= self.min_modules
            && report.image_count >= self.min_images;
        report
    }

    /// Final readiness given the counts and the local-testimonial lookup
    pub fn is_ready(&self, report: &QualityReport, has_local_testimonial: bool) -> bool {
        report.base_ok && (has_local_testimonial || !self.require_local_testimonial)
    }
}

/// Public visibility decision for a coverage record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Editorial status is not `ready`
    Draft,
    /// Content thresholds not met
    Incomplete(QualityReport),
    /// Thresholds met but no testimonial on the same area
    MissingLocalTestimonial(QualityReport),
    Visible(QualityReport),
}

impl Readiness {
    pub fn is_visible(&self) -> bool {
        matches!(self, Readiness::Visible(_))
    }

    /// Metric/log label
    pub fn label(&self) -> &'static str {
        match self {
            Readiness::Draft => "draft",
            Readiness::Incomplete(_) => "incomplete",
            Readiness::MissingLocalTestimonial(_) => "no_testimonial",
            Readiness::Visible(_) => "visible",
        }
    }
}

impl QualityPolicy {
    /// Whether the testimonial lookup can change the outcome
    pub fn needs_testimonial_lookup(&self, report: &QualityReport) -> bool {
        report.base_ok && self.require_local_testimonial
    }

    /// Areas whose testimonials can change the outcome of at least one
    /// record, sorted and deduplicated
    pub fn testimonial_lookups(
        &self,
        coverages: &[ServiceCoverage],
        reports: &[QualityReport],
    ) -> Vec<i64> {
        let mut ids: Vec<i64> = coverages
            .iter()
            .zip(reports)
            .filter(|(coverage, report)| {
                coverage.coverage_status() == CoverageStatus::Ready
                    && self.needs_testimonial_lookup(report)
            })
            .map(|(coverage, _)| coverage.geoarea_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Combine editorial status, counts and the testimonial lookup
    pub fn readiness(
        &self,
        coverage: &ServiceCoverage,
        report: QualityReport,
        has_local_testimonial: bool,
    ) -> Readiness {
        if coverage.coverage_status() != CoverageStatus::Ready {
            Readiness::Draft
        } else if !report.base_ok {
            Readiness::Incomplete(report)
        } else if !self.is_ready(&report, has_local_testimonial) {
            Readiness::MissingLocalTestimonial(report)
        } else {
            Readiness::Visible(report)
        }
    }
}

/// Number of whitespace-separated words once tags are removed
pub fn count_words(markup: &str) -> usize {
    strip_markup(markup).split_whitespace().count()
}

/// Replace every tag with a space
pub fn strip_markup(markup: &str) -> String {
    tag_pattern().replace_all(markup, " ").into_owned()
}

/// Number of `<img` tags, found by scanning rather than parsing
pub fn count_images(markup: &str) -> usize {
    img_pattern().find_iter(markup).count()
}

/// Rich-text source of a stream block's `text` field.
///
/// Accepts both a raw markup string and the `{"source": "..."}` wrapper
/// editors store for rich-text blocks.
fn module_text(block: &Value) -> Option<&str> {
    let text = block.get("value")?.as_object()?.get("text")?;
    match text {
        Value::String(source) => Some(source),
        Value::Object(wrapper) => wrapper.get("source")?.as_str(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    fn block(kind: &str, text: Value) -> Value {
        json!({"type": kind, "value": {"title": "Local note", "text": text}, "id": "b"})
    }

    fn coverage(intro: String, pain: Value, steps: Value, permits: Value, hero: bool) -> ServiceCoverage {
        ServiceCoverage {
            id: 1,
            service_id: 10,
            geoarea_id: 20,
            status: CoverageStatus::Ready.as_str().to_string(),
            unique_intro: intro,
            pain_points_local: pain,
            process_steps_local: steps,
            permits_local: permits,
            starting_price_local: String::new(),
            cta_local: String::new(),
            hero_image_id: hero.then_some(5),
            schema_overrides: json!({}),
        }
    }

    /// 6 modules with one image each, hero excluded
    fn six_modules(words_per_module: usize) -> (Value, Value, Value) {
        let text = format!("<p>{}</p><img src=\"/a.jpg\">", words(words_per_module));
        let two = || json!([block("point", json!(text)), block("point", json!(text))]);
        (two(), two(), two())
    }

    #[test]
    fn test_strip_markup_counts_words_between_tags() {
        assert_eq!(count_words("<p><b>Hello</b>world</p>"), 2);
        assert_eq!(count_words("  <br/>  "), 0);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn test_count_images_scans_markup() {
        let html = r#"<p>a</p><img src="1"><figure><img alt="x" src="2"></figure><image>"#;
        assert_eq!(count_images(html), 2);
    }

    #[test]
    fn test_exact_thresholds_pass() {
        // 100 intro words + 6 * 100 module words = 700
        let (pain, steps, permits) = six_modules(100);
        let cov = coverage(words(100), pain, steps, permits, false);
        let policy = QualityPolicy::default();

        let report = policy.evaluate(&cov);
        assert_eq!(report.word_count, 700);
        assert_eq!(report.module_count, 6);
        assert_eq!(report.image_count, 6);
        assert!(report.base_ok);
        assert!(policy.is_ready(&report, true));
    }

    #[test]
    fn test_one_word_short_fails() {
        let (pain, steps, permits) = six_modules(100);
        let cov = coverage(words(99), pain, steps, permits, false);
        let policy = QualityPolicy::default();

        let report = policy.evaluate(&cov);
        assert_eq!(report.word_count, 699);
        assert!(!report.base_ok);
        assert!(!policy.is_ready(&report, true));
    }

    #[test]
    fn test_missing_local_testimonial_fails() {
        let (pain, steps, permits) = six_modules(200);
        let cov = coverage(words(10), pain, steps, permits, true);
        let policy = QualityPolicy::default();

        let report = policy.evaluate(&cov);
        assert!(report.base_ok);
        assert!(!policy.is_ready(&report, false));
    }

    #[test]
    fn test_hero_counts_as_image() {
        let text = format!("<p>{}</p>", words(150));
        let pain = json!([
            block("point", json!(text)),
            block("point", json!(format!("{}<img src=\"x\">", text))),
        ]);
        let steps = json!([
            block("step", json!(format!("<img src=\"a\"><img src=\"b\">{}", text))),
            block("step", json!(text)),
        ]);
        let permits = json!([
            block("permit", json!({"source": format!("<img src=\"c\"><img src=\"d\">{}", text)})),
            block("permit", json!(text)),
        ]);

        let policy = QualityPolicy::default();
        let without_hero = policy.evaluate(&coverage(String::new(), pain.clone(), steps.clone(), permits.clone(), false));
        assert_eq!(without_hero.image_count, 5);
        assert!(!without_hero.base_ok);

        let with_hero = policy.evaluate(&coverage(String::new(), pain, steps, permits, true));
        assert_eq!(with_hero.image_count, 6);
        assert_eq!(with_hero.word_count, 900);
        assert!(with_hero.base_ok);
    }

    #[test]
    fn test_too_few_modules_fails() {
        let text = format!("<p>{}</p><img src=\"a\"><img src=\"b\">", words(300));
        let pain = json!([block("point", json!(text)), block("point", json!(text))]);
        let steps = json!([block("step", json!(text)), block("step", json!(text))]);
        let permits = json!([block("permit", json!(text))]);

        let report = QualityPolicy::default().evaluate(&coverage(String::new(), pain, steps, permits, true));
        assert_eq!(report.module_count, 5);
        assert!(report.word_count >= 700);
        assert!(report.image_count >= 6);
        assert!(!report.base_ok);
    }

    #[test]
    fn test_malformed_modules_contribute_nothing() {
        let good = format!("<p>{}</p><img src=\"a\">", words(50));
        let pain = json!([
            block("point", json!(good)),
            "not a block",
            {"type": "point", "value": 42},
            block("point", json!(null)),
            block("point", json!({"html": "<img src=\"z\"> ignored"})),
        ]);
        let steps = json!({"unexpected": "shape"});
        let permits = Value::Null;

        let report = QualityPolicy::default().evaluate(&coverage(words(5), pain, steps, permits, false));
        assert_eq!(report.module_count, 5);
        assert_eq!(report.word_count, 55);
        assert_eq!(report.image_count, 1);
        assert!(!report.base_ok);
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let config = QualityConfig {
            min_words: 10,
            min_modules: 1,
            min_images: 0,
            require_local_testimonial: false,
        };
        let policy = QualityPolicy::from(&config);
        let pain = json!([block("point", json!(format!("<p>{}</p>", words(10))))]);

        let report = policy.evaluate(&coverage(String::new(), pain, json!([]), json!([]), false));
        assert!(report.base_ok);
        assert!(policy.is_ready(&report, false));
    }

    #[test]
    fn test_readiness_requires_ready_status() {
        let (pain, steps, permits) = six_modules(150);
        let mut cov = coverage(String::new(), pain, steps, permits, true);
        let policy = QualityPolicy::default();
        let report = policy.evaluate(&cov);

        assert!(policy.readiness(&cov, report, true).is_visible());

        cov.status = CoverageStatus::Draft.as_str().to_string();
        assert_eq!(policy.readiness(&cov, report, true), Readiness::Draft);
    }

    #[test]
    fn test_readiness_labels_each_failure() {
        let policy = QualityPolicy::default();
        let thin = coverage(words(10), json!([]), json!([]), json!([]), false);
        let thin_report = policy.evaluate(&thin);
        assert!(!policy.needs_testimonial_lookup(&thin_report));
        assert_eq!(policy.readiness(&thin, thin_report, true).label(), "incomplete");

        let (pain, steps, permits) = six_modules(150);
        let full = coverage(String::new(), pain, steps, permits, false);
        let full_report = policy.evaluate(&full);
        assert!(policy.needs_testimonial_lookup(&full_report));
        assert_eq!(
            policy.readiness(&full, full_report, false),
            Readiness::MissingLocalTestimonial(full_report)
        );
    }

    #[test]
    fn test_testimonial_lookups_cover_each_area_once() {
        let policy = QualityPolicy::default();
        let (pain, steps, permits) = six_modules(150);
        let full = coverage(String::new(), pain, steps, permits, false);

        let mut same_area = full.clone();
        same_area.id = 2;
        let mut other_area = full.clone();
        other_area.id = 3;
        other_area.geoarea_id = 7;
        let mut draft = full.clone();
        draft.id = 4;
        draft.geoarea_id = 8;
        draft.status = CoverageStatus::Draft.as_str().to_string();
        let mut thin = coverage(words(10), json!([]), json!([]), json!([]), false);
        thin.id = 5;
        thin.geoarea_id = 9;

        let coverages = vec![full, same_area, other_area, draft, thin];
        let reports: Vec<QualityReport> = coverages.iter().map(|c| policy.evaluate(c)).collect();
        assert_eq!(policy.testimonial_lookups(&coverages, &reports), vec![7, 20]);

        let lenient = QualityPolicy {
            require_local_testimonial: false,
            ..policy
        };
        assert!(lenient.testimonial_lookups(&coverages, &reports).is_empty());
    }
}
