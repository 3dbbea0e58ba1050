use crate::platforms::DesktopEngine;
use crate::template::{Template, TemplateRegistry};
use crate::{AutomationError, Region, ScreenFrame};
use image::GrayImage;
use imageproc::template_matching::{find_extremes, match_template, MatchTemplateMethod};
use serde::Serialize;
use std::sync::Arc;
use tokio::task;
use tracing::{debug, instrument};

/// Where a template was found on screen.
///
/// `x`/`y` are the center of the matched pattern in full-screen
/// coordinates, regardless of any search region.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScreenMatch {
    pub x: i32,
    pub y: i32,
    /// Normalized cross-correlation score of the winning probe.
    pub score: f32,
    /// The confidence threshold the probe was evaluated against.
    pub confidence: f32,
    /// Index of the resolution variant that matched.
    pub variant: usize,
}

/// Finds registered visual patterns on the live screen.
#[derive(Clone)]
pub struct TemplateLocator {
    engine: Arc<dyn DesktopEngine>,
    registry: Arc<TemplateRegistry>,
}

impl TemplateLocator {
    pub fn new(engine: Arc<dyn DesktopEngine>, registry: Arc<TemplateRegistry>) -> Self {
        Self { engine, registry }
    }

    pub fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }

    /// One probe for `name`: capture the screen, walk the template's
    /// attempt plan (all variants at the requested confidence, then one
    /// relaxed pass) and return the first hit.
    ///
    /// A name with no backing asset fails with
    /// [`AutomationError::TemplateMissing`]; a capture failure surfaces as
    /// `PlatformError` and is the caller's to retry on its next cycle.
    #[instrument(level = "debug", skip(self))]
    pub async fn find(
        &self,
        name: &str,
        region: Option<Region>,
        confidence: Option<f32>,
    ) -> Result<Option<ScreenMatch>, AutomationError> {
        let template = self.registry.resolve(name)?;
        let requested = confidence.unwrap_or_else(|| template.default_confidence());
        let frame = self.engine.capture_screen().await?;

        // Matching is CPU-bound; keep it off the async workers.
        let outcome = task::spawn_blocking(move || scan(&frame, &template, region, requested))
            .await
            .map_err(|e| AutomationError::PlatformError(format!("Task join error: {e}")))??;

        if let Some(found) = &outcome {
            debug!(
                template = name,
                x = found.x,
                y = found.y,
                score = found.score,
                confidence = found.confidence,
                "template matched"
            );
        }
        Ok(outcome)
    }
}

fn scan(
    frame: &ScreenFrame,
    template: &Template,
    region: Option<Region>,
    confidence: f32,
) -> Result<Option<ScreenMatch>, AutomationError> {
    let gray = frame.to_luma()?;
    let (view, origin_x, origin_y) = match region {
        Some(r) => match crop(&gray, r) {
            Some(cropped) => cropped,
            None => return Ok(None),
        },
        None => (gray, 0u32, 0u32),
    };

    // Correlation maps are memoized per variant so the relaxed-confidence
    // pass never recomputes them.
    let mut peaks: Vec<Option<(f32, (u32, u32))>> = vec![None; template.variants().len()];

    for (index, threshold) in template.attempt_plan(confidence) {
        let variant = &template.variants()[index];
        if variant.image.width() > view.width() || variant.image.height() > view.height() {
            continue;
        }
        let (score, location) = match peaks[index] {
            Some(peak) => peak,
            None => {
                let map = match_template(
                    &view,
                    &variant.image,
                    MatchTemplateMethod::CrossCorrelationNormalized,
                );
                let extremes = find_extremes(&map);
                let peak = (extremes.max_value, extremes.max_value_location);
                peaks[index] = Some(peak);
                peak
            }
        };
        if score >= threshold {
            let center_x = origin_x + location.0 + variant.image.width() / 2;
            let center_y = origin_y + location.1 + variant.image.height() / 2;
            return Ok(Some(ScreenMatch {
                x: center_x as i32,
                y: center_y as i32,
                score,
                confidence: threshold,
                variant: index,
            }));
        }
    }

    Ok(None)
}

/// Intersect a requested region with the frame; an empty intersection
/// means nothing to search.
fn crop(gray: &GrayImage, region: Region) -> Option<(GrayImage, u32, u32)> {
    if region.x >= gray.width() || region.y >= gray.height() {
        return None;
    }
    let width = region.width.min(gray.width() - region.x);
    let height = region.height.min(gray.height() - region.y);
    if width == 0 || height == 0 {
        return None;
    }
    let view = image::imageops::crop_imm(gray, region.x, region.y, width, height).to_image();
    Some((view, region.x, region.y))
}
