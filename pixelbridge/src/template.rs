use crate::AutomationError;
use image::GrayImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// How far confidence is relaxed when a full pass over all variants at the
/// requested threshold found nothing. Exactly one fallback step; prolonged
/// not-found never relaxes further.
pub const CONFIDENCE_FALLBACK_STEP: f32 = 0.1;

/// One backing image for a template, for one display profile.
#[derive(Debug)]
pub struct TemplateVariant {
    pub path: PathBuf,
    pub image: GrayImage,
}

/// A named visual pattern with one or more resolution variants.
///
/// Immutable once resolved; owned by the registry for process lifetime.
#[derive(Debug)]
pub struct Template {
    name: String,
    variants: Vec<TemplateVariant>,
    offset: (i32, i32),
    confidence: f32,
}

impl Template {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variants(&self) -> &[TemplateVariant] {
        &self.variants
    }

    /// Default click offset relative to the match center.
    pub fn default_offset(&self) -> (i32, i32) {
        self.offset
    }

    pub fn default_confidence(&self) -> f32 {
        self.confidence
    }

    /// The exact probe order for one cycle: every variant at `confidence`,
    /// then every variant at the relaxed threshold. A confidence level is
    /// fully exhausted across all variants before the next one is touched.
    pub fn attempt_plan(&self, confidence: f32) -> Vec<(usize, f32)> {
        let mut levels = vec![confidence];
        let relaxed = (confidence - CONFIDENCE_FALLBACK_STEP).max(0.0);
        if relaxed < confidence {
            levels.push(relaxed);
        }
        let mut plan = Vec::with_capacity(levels.len() * self.variants.len());
        for level in levels {
            for index in 0..self.variants.len() {
                plan.push((index, level));
            }
        }
        plan
    }
}

/// Per-template overrides registered ahead of resolution.
#[derive(Debug, Clone, Copy, Default)]
struct TemplateDefaults {
    offset: (i32, i32),
    confidence: Option<f32>,
}

/// Resolves template names to their backing assets and caches the decoded
/// result for the life of the process.
///
/// For a name `n` the candidate paths are `<base>/n.png` followed by
/// `<alt>/n.png` for each registered alternate-resolution directory, in
/// order. Paths that do not exist are skipped; a name with zero resolvable
/// variants is a deployment defect and fails loudly.
pub struct TemplateRegistry {
    base_dir: PathBuf,
    alt_dirs: Vec<PathBuf>,
    default_confidence: f32,
    defaults: RwLock<HashMap<String, TemplateDefaults>>,
    cache: RwLock<HashMap<String, Arc<Template>>>,
}

impl TemplateRegistry {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        alt_dirs: Vec<PathBuf>,
        default_confidence: f32,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            alt_dirs,
            default_confidence,
            defaults: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Register a click offset and/or confidence override for a template
    /// name, ahead of its first resolution.
    pub fn set_defaults(&self, name: &str, offset: (i32, i32), confidence: Option<f32>) {
        if let Ok(mut defaults) = self.defaults.write() {
            defaults.insert(name.to_string(), TemplateDefaults { offset, confidence });
        }
    }

    /// Resolve a template by name, loading and caching its variants on
    /// first use.
    pub fn resolve(&self, name: &str) -> Result<Arc<Template>, AutomationError> {
        if let Ok(cache) = self.cache.read() {
            if let Some(template) = cache.get(name) {
                return Ok(template.clone());
            }
        }

        let template = Arc::new(self.load(name)?);
        if let Ok(mut cache) = self.cache.write() {
            // A racing resolve may have inserted already; first one wins so
            // every caller sees the same immutable instance.
            return Ok(cache
                .entry(name.to_string())
                .or_insert_with(|| template.clone())
                .clone());
        }
        Ok(template)
    }

    fn load(&self, name: &str) -> Result<Template, AutomationError> {
        let mut variants = Vec::new();
        for dir in std::iter::once(&self.base_dir).chain(self.alt_dirs.iter()) {
            let path = dir.join(format!("{name}.png"));
            if !path.exists() {
                continue;
            }
            let image = image::open(&path)
                .map_err(|e| {
                    AutomationError::ImageError(format!(
                        "Failed to decode template asset {}: {e}",
                        path.display()
                    ))
                })?
                .to_luma8();
            debug!(template = name, path = %path.display(), "loaded template variant");
            variants.push(TemplateVariant { path, image });
        }

        if variants.is_empty() {
            let searched: Vec<String> = std::iter::once(&self.base_dir)
                .chain(self.alt_dirs.iter())
                .map(|d| d.display().to_string())
                .collect();
            warn!(template = name, ?searched, "template has no backing asset");
            return Err(AutomationError::TemplateMissing(format!(
                "'{name}' (searched {})",
                searched.join(", ")
            )));
        }

        let defaults = self
            .defaults
            .read()
            .ok()
            .and_then(|d| d.get(name).copied())
            .unwrap_or_default();

        Ok(Template {
            name: name.to_string(),
            variants,
            offset: defaults.offset,
            confidence: defaults.confidence.unwrap_or(self.default_confidence),
        })
    }
}
