use super::error::AudioError;
use super::recording_result::{ProcessedResult, Stage};

/// Processing state of a single capture.
///
/// State transitions:
/// ```text
/// idle → decoding → trimming → compressing? → encoding → validating → done
///                       ↓            ↓            ↓           ↓
///                       └────────── fallback ─────┴───────────┘
/// decoding → failed (unreadable capture)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Idle,
    Decoding,
    Trimming,
    Compressing,
    Encoding,
    Validating,
    Fallback { from: Stage, reason: String },
    Done(Box<ProcessedResult>),
    Failed(AudioError),
}

impl PipelineState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_))
    }

    /// Whether a processing run currently owns this capture.
    pub fn is_busy(&self) -> bool {
        !self.is_idle() && !self.is_terminal()
    }

    pub fn result(&self) -> Option<&ProcessedResult> {
        match self {
            Self::Done(result) => Some(result),
            _ => None,
        }
    }

    /// Short lowercase label for logs and observers.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Decoding => "decoding",
            Self::Trimming => "trimming",
            Self::Compressing => "compressing",
            Self::Encoding => "encoding",
            Self::Validating => "validating",
            Self::Fallback { .. } => "fallback",
            Self::Done(_) => "done",
            Self::Failed(_) => "failed",
        }
    }
}
