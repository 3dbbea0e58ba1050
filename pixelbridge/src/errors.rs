use thiserror::Error;

/// Errors surfaced by the visual automation engine.
///
/// The taxonomy matters more than the variants themselves: transient
/// clipboard contention is retried locally before it ever becomes
/// `ClipboardBusy`, a missing template asset is a deployment defect and
/// fails at the point of use, and everything else propagates to the
/// caller as the request's failure.
#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Platform error: {0}")]
    PlatformError(String),

    /// A template name resolved to zero backing assets on disk. This is a
    /// configuration error, never retried.
    #[error("Template has no resolvable asset: {0}")]
    TemplateMissing(String),

    /// The OS clipboard stayed held by another process through every
    /// allowed retry attempt.
    #[error("Clipboard busy: {0}")]
    ClipboardBusy(String),

    #[error("Clipboard error: {0}")]
    ClipboardError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
