use crate::clipboard::{ClipboardBackend, ClipboardTransport};
use crate::config::BridgeConfig;
use crate::executor::{Candidate, Executor};
use crate::payload::RequestPayload;
use crate::platforms::{self, DesktopEngine};
use crate::sanitizer::ResponseSanitizer;
use crate::template::TemplateRegistry;
use crate::AutomationError;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Settle time after pasting an image before the next injection step.
const IMAGE_SETTLE: Duration = Duration::from_secs(5);

/// The control-flow shape of one end-to-end request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkflowState {
    Opening,
    AwaitingReady,
    Injecting,
    Submitting,
    AwaitingOutcome,
    Extracting,
    Done,
}

/// What a completed request hands back, alongside enough bookkeeping for a
/// host to impose its own SLA bounds on the unbounded retry loop.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutcome {
    /// The sanitized response text.
    pub text: String,
    /// Full workflow restarts caused by the recognized error checkpoint.
    pub retries: u32,
    pub elapsed: Duration,
}

struct SessionGate {
    last_start: Option<Instant>,
}

/// Drives one complete request through the remote surface.
///
/// Exactly one workflow is in flight at a time per process: the clipboard
/// is a single shared OS resource and the remote surface has one visible
/// instance, so concurrent callers queue on the session gate rather than
/// run in parallel.
pub struct Orchestrator {
    engine: Arc<dyn DesktopEngine>,
    executor: Executor,
    transport: ClipboardTransport,
    sanitizer: ResponseSanitizer,
    config: BridgeConfig,
    gate: Mutex<SessionGate>,
}

impl Orchestrator {
    /// Orchestrator over the real desktop and OS clipboard.
    pub fn new(config: BridgeConfig) -> Result<Self, AutomationError> {
        let engine = platforms::create_engine()?;
        let transport = ClipboardTransport::system()?;
        Ok(Self::assemble(engine, transport, config))
    }

    /// Orchestrator over caller-supplied engine and clipboard backend.
    pub fn with_parts(
        engine: Arc<dyn DesktopEngine>,
        backend: Box<dyn ClipboardBackend>,
        config: BridgeConfig,
    ) -> Self {
        Self::assemble(engine, ClipboardTransport::new(backend), config)
    }

    fn assemble(
        engine: Arc<dyn DesktopEngine>,
        transport: ClipboardTransport,
        config: BridgeConfig,
    ) -> Self {
        let registry = Arc::new(TemplateRegistry::new(
            config.asset_dir.clone(),
            config.alt_asset_dirs.clone(),
            config.default_confidence,
        ));
        let executor = Executor::new(engine.clone(), registry);
        Self {
            engine,
            executor,
            transport,
            sanitizer: ResponseSanitizer::new(),
            config,
            gate: Mutex::new(SessionGate { last_start: None }),
        }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Run one request end to end and return the sanitized response.
    ///
    /// Blocks until the session gate is free, enforces the minimum spacing
    /// between request starts, then drives the workflow state machine. The
    /// recognized error checkpoint restarts the workflow from the top,
    /// without bound; any other failure aborts the request.
    #[instrument(skip(self, payload))]
    pub async fn run(&self, payload: RequestPayload) -> Result<WorkflowOutcome, AutomationError> {
        let mut gate = self.gate.lock().await;

        if let Some(last) = gate.last_start {
            let since = last.elapsed();
            let min = self.config.min_request_interval();
            if since < min {
                debug!(wait = ?(min - since), "rate gate: delaying request");
                tokio::time::sleep(min - since).await;
            }
        }

        let started = Instant::now();
        match self.drive(&payload, &mut gate).await {
            Ok((raw, retries)) => {
                let text = self.sanitizer.sanitize(&raw);
                let elapsed = started.elapsed();
                info!(retries, ?elapsed, "workflow complete");
                Ok(WorkflowOutcome {
                    text,
                    retries,
                    elapsed,
                })
            }
            Err(e) => {
                error!(error = %e, "workflow failed");
                Err(e)
            }
        }
    }

    /// The state machine proper. Returns the raw extracted text plus the
    /// number of error-checkpoint restarts it took to get there.
    async fn drive(
        &self,
        payload: &RequestPayload,
        gate: &mut SessionGate,
    ) -> Result<(String, u32), AutomationError> {
        let checkpoints = &self.config.checkpoints;
        let mut state = WorkflowState::Opening;
        let mut retries: u32 = 0;
        let mut extracted: Option<String> = None;

        while state != WorkflowState::Done {
            debug!(?state, retries, "workflow step");
            state = match state {
                WorkflowState::Opening => {
                    self.engine
                        .open_url(&self.config.target_url, self.config.browser.as_deref())?;
                    gate.last_start = Some(Instant::now());
                    WorkflowState::AwaitingReady
                }
                WorkflowState::AwaitingReady => {
                    let candidates = [
                        Candidate::new(checkpoints.ready.as_str()),
                        Candidate::new(checkpoints.ready_stale.as_str()),
                    ];
                    let found = self.executor.wait(&candidates).await?;
                    if found.index == 1 {
                        debug!("stale input detected, clearing");
                        self.engine.press_key("ctrl+a")?;
                        self.engine.press_key("delete")?;
                    }
                    WorkflowState::Injecting
                }
                WorkflowState::Injecting => {
                    self.inject(payload).await?;
                    WorkflowState::Submitting
                }
                WorkflowState::Submitting => {
                    self.executor
                        .wait(&[Candidate::new(checkpoints.submit.as_str())])
                        .await?;
                    WorkflowState::AwaitingOutcome
                }
                WorkflowState::AwaitingOutcome => {
                    let candidates = [
                        Candidate::watch(checkpoints.success.as_str()),
                        Candidate::watch(checkpoints.error.as_str()),
                    ];
                    let found = self.executor.wait(&candidates).await?;
                    if found.index == 1 {
                        retries += 1;
                        warn!(retries, "error checkpoint matched, restarting workflow");
                        self.engine.press_key("ctrl+w")?;
                        WorkflowState::Opening
                    } else {
                        WorkflowState::Extracting
                    }
                }
                WorkflowState::Extracting => {
                    self.executor
                        .wait(&[Candidate::new(checkpoints.copy.as_str())])
                        .await?;
                    self.engine.press_key("ctrl+w")?;
                    self.engine.press_key("alt+tab")?;
                    extracted = Some(self.transport.read_text()?);
                    WorkflowState::Done
                }
                WorkflowState::Done => WorkflowState::Done,
            };
        }

        let raw = extracted.ok_or_else(|| {
            AutomationError::PlatformError("workflow finished without extracted text".to_string())
        })?;
        Ok((raw, retries))
    }

    /// Push every piece of the request into the surface's input: images
    /// first, then the context header, the rule texts, and finally the
    /// caller's payload, pasting after each.
    async fn inject(&self, payload: &RequestPayload) -> Result<(), AutomationError> {
        for data_uri in payload.images() {
            if self.transport.set_image(data_uri) {
                self.engine.press_key("ctrl+v")?;
                tokio::time::sleep(IMAGE_SETTLE).await;
            }
        }

        self.paste_text(&self.context_header(payload))?;
        if self.config.autorun {
            self.paste_text(&self.config.autorun_text)?;
        }
        self.paste_text(&self.config.instruction_text)?;
        self.paste_text(&payload.prompt_text())?;
        Ok(())
    }

    fn paste_text(&self, text: &str) -> Result<(), AutomationError> {
        self.transport.set_text(text)?;
        self.engine.press_key("ctrl+v")
    }

    /// Diagnostic preamble identifying the request to the remote surface.
    fn context_header(&self, payload: &RequestPayload) -> String {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        format!(
            "{now} - INFO - request received ({} segments)",
            payload.segments.len()
        )
    }

    /// Click through the post-completion dialogs configured for unattended
    /// runs. Blocks until one of the follow-up candidates appears; the
    /// configured sentinel candidate carries zero clicks so the sweep can
    /// end without acting.
    #[instrument(skip(self))]
    pub async fn acknowledge_followups(&self) -> Result<(), AutomationError> {
        let candidates: Vec<Candidate> = self
            .config
            .checkpoints
            .followups
            .iter()
            .map(|f| Candidate::new(f.template.as_str()).clicks(f.clicks))
            .collect();
        if candidates.is_empty() {
            return Ok(());
        }
        self.executor.wait(&candidates).await.map(|_| ())
    }
}
