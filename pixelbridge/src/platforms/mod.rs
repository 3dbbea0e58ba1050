use crate::{AutomationError, ScreenFrame};
use std::sync::Arc;

mod desktop;

pub use desktop::NativeEngine;

/// The seam between the engine and the OS: screen capture, pointer and
/// keyboard synthesis, and opening the target surface. Everything above
/// this trait is deterministic and testable against a scripted fake.
#[async_trait::async_trait]
pub trait DesktopEngine: Send + Sync {
    /// Capture the primary display as raw RGBA.
    async fn capture_screen(&self) -> Result<ScreenFrame, AutomationError>;

    /// Move the pointer to absolute screen coordinates.
    fn move_pointer(&self, x: i32, y: i32) -> Result<(), AutomationError>;

    /// Single left click at the current pointer position.
    fn click(&self) -> Result<(), AutomationError>;

    /// Press a key combination given as a `+`-separated combo string,
    /// e.g. `"ctrl+v"`, `"alt+tab"`, `"delete"`.
    fn press_key(&self, combo: &str) -> Result<(), AutomationError>;

    /// Open a URL, optionally through a specific browser program.
    /// Fire-and-forget: the engine never waits for the page itself.
    fn open_url(&self, url: &str, browser: Option<&str>) -> Result<(), AutomationError>;
}

/// Create the engine backed by the real desktop.
pub fn create_engine() -> Result<Arc<dyn DesktopEngine>, AutomationError> {
    Ok(Arc::new(NativeEngine::new()?))
}
