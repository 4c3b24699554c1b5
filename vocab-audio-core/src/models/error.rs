use thiserror::Error;

/// Errors produced by the recording pipeline and the package exporter.
///
/// Most variants are absorbed by the orchestrator's fallback ladder and only
/// end up in diagnostics. See [`AudioError::is_user_facing`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AudioError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("decode failed: {0}")]
    DecodeFailed(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("degenerate trim window: {0}")]
    TrimDegenerate(String),

    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    #[error("no valid audio to package")]
    ArchiveEmpty,

    #[error("archive too large: {0}")]
    ArchiveTooLarge(String),

    #[error("duplicate archive entry: {0}")]
    DuplicateEntry(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl AudioError {
    /// Whether this error should reach the user instead of being recovered.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied | Self::DeviceNotAvailable | Self::DecodeFailed(_) | Self::ArchiveEmpty
        )
    }
}
