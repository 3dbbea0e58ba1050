use crate::locator::TemplateLocator;
use crate::platforms::DesktopEngine;
use crate::template::TemplateRegistry;
use crate::{AutomationError, Region};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Spacing between poll cycles in blocking-wait mode.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Settle pause between a match and the first click on it.
const PRE_CLICK_SETTLE: Duration = Duration::from_secs(1);
/// Pause between discrete clicks of one action.
const CLICK_INTERVAL: Duration = Duration::from_millis(100);

/// One entry of a candidate set: a template to probe plus the action bound
/// to it if it wins the cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub template: String,
    /// Number of clicks on a match; 0 means locate only.
    pub clicks: u32,
    /// Click offset from the match center; falls back to the template's
    /// registered default when absent.
    pub offset: Option<(i32, i32)>,
    /// Confidence override for this probe.
    pub confidence: Option<f32>,
}

impl Candidate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            clicks: 1,
            offset: None,
            confidence: None,
        }
    }

    /// A presence check: probe without acting.
    pub fn watch(template: impl Into<String>) -> Self {
        Self::new(template).clicks(0)
    }

    pub fn clicks(mut self, clicks: u32) -> Self {
        self.clicks = clicks;
        self
    }

    pub fn offset(mut self, dx: i32, dy: i32) -> Self {
        self.offset = Some((dx, dy));
        self
    }

    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Outcome of a poll cycle that found something.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    /// Name of the matched template.
    pub template: String,
    /// Index of the winning candidate in the caller's set.
    pub index: usize,
    pub x: i32,
    pub y: i32,
    pub score: f32,
    pub confidence: f32,
}

/// Turns locator probes into blocking waits and click actions.
#[derive(Clone)]
pub struct Executor {
    engine: Arc<dyn DesktopEngine>,
    locator: TemplateLocator,
}

impl Executor {
    pub fn new(engine: Arc<dyn DesktopEngine>, registry: Arc<TemplateRegistry>) -> Self {
        let locator = TemplateLocator::new(engine.clone(), registry);
        Self { engine, locator }
    }

    pub fn locator(&self) -> &TemplateLocator {
        &self.locator
    }

    /// Blocking-wait: poll every [`POLL_INTERVAL`] until one of the
    /// candidates matches, then perform its bound clicks. There is no
    /// internal timeout ceiling; bounding the wait is the caller's job.
    pub async fn wait(&self, candidates: &[Candidate]) -> Result<MatchResult, AutomationError> {
        self.wait_in(candidates, None).await
    }

    /// [`Executor::wait`] restricted to a screen region.
    #[instrument(level = "debug", skip(self, candidates))]
    pub async fn wait_in(
        &self,
        candidates: &[Candidate],
        region: Option<Region>,
    ) -> Result<MatchResult, AutomationError> {
        if candidates.is_empty() {
            return Err(AutomationError::InvalidArgument(
                "candidate set is empty".to_string(),
            ));
        }
        loop {
            if let Some(found) = self.cycle(candidates, region).await? {
                self.act_on(&candidates[found.index], &found).await?;
                return Ok(found);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Probe-once: a single poll cycle with no waiting and no side
    /// effects, for non-committal status checks.
    #[instrument(level = "debug", skip(self, candidates))]
    pub async fn probe(
        &self,
        candidates: &[Candidate],
    ) -> Result<Option<MatchResult>, AutomationError> {
        if candidates.is_empty() {
            return Err(AutomationError::InvalidArgument(
                "candidate set is empty".to_string(),
            ));
        }
        self.cycle(candidates, None).await
    }

    /// One poll cycle. Candidates are evaluated strictly in caller order;
    /// the first that matches wins even if a later one would also match.
    async fn cycle(
        &self,
        candidates: &[Candidate],
        region: Option<Region>,
    ) -> Result<Option<MatchResult>, AutomationError> {
        for (index, candidate) in candidates.iter().enumerate() {
            match self
                .locator
                .find(&candidate.template, region, candidate.confidence)
                .await
            {
                Ok(Some(found)) => {
                    return Ok(Some(MatchResult {
                        template: candidate.template.clone(),
                        index,
                        x: found.x,
                        y: found.y,
                        score: found.score,
                        confidence: found.confidence,
                    }));
                }
                Ok(None) => {}
                // A name with no backing asset is a deployment defect.
                Err(e @ AutomationError::TemplateMissing(_)) => return Err(e),
                // Anything else (a failed capture, typically) is retried on
                // the next cycle, not escalated.
                Err(e) => {
                    warn!(template = %candidate.template, error = %e, "poll cycle failed, will retry");
                    return Ok(None);
                }
            }
        }
        Ok(None)
    }

    async fn act_on(
        &self,
        candidate: &Candidate,
        found: &MatchResult,
    ) -> Result<(), AutomationError> {
        if candidate.clicks == 0 {
            return Ok(());
        }
        let (dx, dy) = match candidate.offset {
            Some(offset) => offset,
            None => self
                .locator
                .registry()
                .resolve(&candidate.template)?
                .default_offset(),
        };
        let x = found.x + dx;
        let y = found.y + dy;
        tokio::time::sleep(PRE_CLICK_SETTLE).await;
        self.engine.move_pointer(x, y)?;
        for n in 0..candidate.clicks {
            if n > 0 {
                tokio::time::sleep(CLICK_INTERVAL).await;
            }
            self.engine.click()?;
        }
        debug!(template = %candidate.template, x, y, clicks = candidate.clicks, "clicked match");
        Ok(())
    }
}
