use crate::AutomationError;
use base64::Engine as _;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Attempts allowed for a text write before contention becomes an error.
pub const SET_TEXT_ATTEMPTS: usize = 3;
/// Backoff between attempts while another process holds the clipboard.
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Raw clipboard access. Implementations must distinguish transient
/// contention (`ClipboardBusy`) from everything else; the transport's
/// retry policy keys on that.
pub trait ClipboardBackend: Send {
    fn set_text(&mut self, text: &str) -> Result<(), AutomationError>;
    fn get_text(&mut self) -> Result<String, AutomationError>;
    fn set_image(&mut self, width: usize, height: usize, rgba: &[u8])
        -> Result<(), AutomationError>;
    fn clear(&mut self) -> Result<(), AutomationError>;
}

/// The real OS clipboard, via `arboard`.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self, AutomationError> {
        let inner = arboard::Clipboard::new().map_err(|e| {
            AutomationError::ClipboardError(format!("Failed to open clipboard: {e}"))
        })?;
        Ok(Self { inner })
    }
}

fn map_arboard(e: arboard::Error) -> AutomationError {
    match e {
        arboard::Error::ClipboardOccupied => {
            AutomationError::ClipboardBusy("clipboard held by another process".to_string())
        }
        other => AutomationError::ClipboardError(other.to_string()),
    }
}

impl ClipboardBackend for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), AutomationError> {
        self.inner.set_text(text).map_err(map_arboard)
    }

    fn get_text(&mut self) -> Result<String, AutomationError> {
        self.inner.get_text().map_err(map_arboard)
    }

    fn set_image(
        &mut self,
        width: usize,
        height: usize,
        rgba: &[u8],
    ) -> Result<(), AutomationError> {
        let data = arboard::ImageData {
            width,
            height,
            bytes: std::borrow::Cow::Borrowed(rgba),
        };
        self.inner.set_image(data).map_err(map_arboard)
    }

    fn clear(&mut self) -> Result<(), AutomationError> {
        self.inner.clear().map_err(map_arboard)
    }
}

/// Exclusive, retryable access to the one process-wide clipboard.
///
/// Every operation is a single lock-scoped critical section: no two
/// transport calls interleave their open/use/close within this process,
/// which is the only safe way to share the clipboard with the remote
/// surface's own use of it.
pub struct ClipboardTransport {
    backend: Mutex<Box<dyn ClipboardBackend>>,
}

impl ClipboardTransport {
    pub fn new(backend: Box<dyn ClipboardBackend>) -> Self {
        Self {
            backend: Mutex::new(backend),
        }
    }

    /// Transport over the real OS clipboard.
    pub fn system() -> Result<Self, AutomationError> {
        Ok(Self::new(Box::new(SystemClipboard::new()?)))
    }

    fn with_backend<T>(
        &self,
        f: impl FnOnce(&mut dyn ClipboardBackend) -> Result<T, AutomationError>,
    ) -> Result<T, AutomationError> {
        let mut guard = self
            .backend
            .lock()
            .map_err(|_| AutomationError::ClipboardError("clipboard lock poisoned".to_string()))?;
        f(guard.as_mut())
    }

    /// Clear the clipboard and write `text`, retrying a bounded number of
    /// times when another process briefly holds the clipboard. Any
    /// non-contention failure propagates immediately.
    #[instrument(level = "debug", skip(self, text), fields(len = text.len()))]
    pub fn set_text(&self, text: &str) -> Result<(), AutomationError> {
        for attempt in 1..=SET_TEXT_ATTEMPTS {
            let result = self.with_backend(|backend| {
                backend.clear()?;
                backend.set_text(text)
            });
            match result {
                Ok(()) => {
                    debug!(attempt, "clipboard text set");
                    return Ok(());
                }
                Err(AutomationError::ClipboardBusy(msg)) => {
                    if attempt == SET_TEXT_ATTEMPTS {
                        return Err(AutomationError::ClipboardBusy(format!(
                            "{msg} (after {SET_TEXT_ATTEMPTS} attempts)"
                        )));
                    }
                    warn!(attempt, "clipboard access denied, retrying");
                    std::thread::sleep(RETRY_BACKOFF);
                }
                Err(other) => return Err(other),
            }
        }
        // The loop always returns on its last attempt.
        Err(AutomationError::ClipboardBusy(format!(
            "exhausted {SET_TEXT_ATTEMPTS} attempts"
        )))
    }

    /// Read the current clipboard text. Read races are rare enough that
    /// there is no retry; failures surface to the caller.
    #[instrument(level = "debug", skip(self))]
    pub fn read_text(&self) -> Result<String, AutomationError> {
        self.with_backend(|backend| backend.get_text())
    }

    /// Decode a `data:image/...;base64,` URI and place the raw bitmap on
    /// the clipboard. Best-effort: image payloads are optional in the
    /// workflow, so failures are logged and reported as `false` rather
    /// than propagated.
    pub fn set_image(&self, data_uri: &str) -> bool {
        match self.try_set_image(data_uri) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to place image on clipboard");
                false
            }
        }
    }

    fn try_set_image(&self, data_uri: &str) -> Result<(), AutomationError> {
        if !data_uri.starts_with("data:image") {
            return Err(AutomationError::InvalidArgument(
                "payload is not an image data URI".to_string(),
            ));
        }
        let (_, encoded) = data_uri.split_once(',').ok_or_else(|| {
            AutomationError::InvalidArgument("data URI has no payload separator".to_string())
        })?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| AutomationError::ImageError(format!("Invalid base64 payload: {e}")))?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| AutomationError::ImageError(format!("Failed to decode image: {e}")))?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        self.with_backend(|backend| {
            backend.clear()?;
            backend.set_image(width as usize, height as usize, rgba.as_raw())
        })
    }
}
