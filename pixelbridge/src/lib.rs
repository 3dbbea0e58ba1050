//! Visual automation for a browser-hosted chat surface
//!
//! This crate drives an external, visually rendered application as if it
//! were a remote peer, using only screen pixels, synthesized pointer and
//! keyboard input, and the OS clipboard as the transport. No programmatic
//! API to the peer is assumed.
//!
//! The pieces compose bottom-up: a [`TemplateRegistry`] resolves named
//! visual patterns to on-disk image variants, a [`TemplateLocator`] finds
//! them on screen, an [`Executor`] turns probes into blocking waits and
//! clicks, a [`ClipboardTransport`] moves payloads in and out of the OS
//! clipboard, and the [`Orchestrator`] sequences a complete request through
//! the remote surface and hands the extracted text to the
//! [`ResponseSanitizer`].

use image::{DynamicImage, GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};

pub mod clipboard;
pub mod config;
pub mod errors;
pub mod executor;
pub mod locator;
pub mod orchestrator;
pub mod payload;
pub mod platforms;
pub mod sanitizer;
pub mod template;
#[cfg(test)]
mod tests;

pub use clipboard::{ClipboardBackend, ClipboardTransport, SystemClipboard};
pub use config::{BridgeConfig, CheckpointNames, FollowupCandidate};
pub use errors::AutomationError;
pub use executor::{Candidate, Executor, MatchResult};
pub use locator::{ScreenMatch, TemplateLocator};
pub use orchestrator::{Orchestrator, WorkflowOutcome, WorkflowState};
pub use payload::{PayloadSegment, RequestPayload};
pub use sanitizer::ResponseSanitizer;
pub use template::{Template, TemplateRegistry};

/// Holds one raw RGBA capture of a display
#[derive(Debug, Clone)]
pub struct ScreenFrame {
    /// Raw image data (RGBA, row-major)
    pub image_data: Vec<u8>,
    /// Width of the capture
    pub width: u32,
    /// Height of the capture
    pub height: u32,
}

impl ScreenFrame {
    pub fn from_rgba(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            image_data: image.into_raw(),
            width,
            height,
        }
    }

    /// Grayscale view of the frame, the form template matching runs on.
    pub fn to_luma(&self) -> Result<GrayImage, AutomationError> {
        let rgba = RgbaImage::from_raw(self.width, self.height, self.image_data.clone())
            .ok_or_else(|| {
                AutomationError::ImageError(format!(
                    "frame buffer length {} does not match {}x{}",
                    self.image_data.len(),
                    self.width,
                    self.height
                ))
            })?;
        Ok(DynamicImage::ImageRgba8(rgba).to_luma8())
    }
}

/// A sub-rectangle of the screen to restrict a template search to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}
