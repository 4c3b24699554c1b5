use std::fmt;

use serde::{Deserialize, Serialize};

use super::audio_models::{TrimWindow, WaveformSummary};

/// Identity of one recording attempt for a word.
///
/// Re-recording a word issues a new `take`; results carrying an older take
/// are stale and must not replace newer state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureId {
    pub word_id: String,
    pub take: u64,
}

impl CaptureId {
    pub fn new(word_id: impl Into<String>, take: u64) -> Self {
        Self {
            word_id: word_id.into(),
            take,
        }
    }
}

impl fmt::Display for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.word_id, self.take)
    }
}

/// A pipeline stage, used in fallback records and metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Decode,
    Trim,
    Compress,
    Encode,
    Validate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Decode => "decode",
            Self::Trim => "trim",
            Self::Compress => "compress",
            Self::Encode => "encode",
            Self::Validate => "validate",
        };
        f.write_str(name)
    }
}

/// One rung of the fallback ladder that was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackRecord {
    pub from: Stage,
    pub reason: String,
}

/// Waveforms before and after a kept trim, for the trim editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrimReport {
    pub original: WaveformSummary,
    pub trimmed: WaveformSummary,
    pub window: TrimWindow,
}

/// Outcome of processing one capture.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedResult {
    pub capture_id: CaptureId,
    /// Final WAV bytes.
    pub bytes: Vec<u8>,
    /// Window actually applied, `None` when the trim was skipped or discarded.
    pub trim_window: Option<TrimWindow>,
    pub trim_report: Option<TrimReport>,
    pub is_valid: bool,
    pub diagnostics: String,
    /// Effect stages whose output made it into `bytes`.
    pub applied_stages: Vec<Stage>,
    pub fallbacks: Vec<FallbackRecord>,
    pub metadata: ProcessedMetadata,
}

impl ProcessedResult {
    pub fn used_fallback(&self) -> bool {
        !self.fallbacks.is_empty()
    }
}

/// Serializable summary of a processed recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedMetadata {
    pub id: String,
    pub word_id: String,
    pub take: u64,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub byte_len: usize,
    /// SHA-256 hex digest of the final bytes.
    pub checksum: String,
    pub created_at: String,
    pub trim_window: Option<TrimWindow>,
    pub applied_stages: Vec<Stage>,
    pub is_valid: bool,
}

impl ProcessedMetadata {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        capture_id: &CaptureId,
        duration_secs: f64,
        sample_rate: u32,
        channels: u16,
        byte_len: usize,
        checksum: &str,
        trim_window: Option<TrimWindow>,
        applied_stages: Vec<Stage>,
        is_valid: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            word_id: capture_id.word_id.clone(),
            take: capture_id.take,
            duration_secs,
            sample_rate,
            channels,
            byte_len,
            checksum: checksum.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            trim_window,
            applied_stages,
            is_valid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_id_display() {
        assert_eq!(CaptureId::new("w42", 3).to_string(), "w42#3");
    }

    #[test]
    fn metadata_serializes_stages_lowercase() {
        let metadata = ProcessedMetadata::new(
            &CaptureId::new("w1", 1),
            1.25,
            44100,
            1,
            110_294,
            "abc",
            Some(TrimWindow::full(1.25)),
            vec![Stage::Trim, Stage::Compress],
            true,
        );
        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains("\"appliedStages\":[\"trim\",\"compress\"]"));
        assert!(json.contains("\"wordId\":\"w1\""));

        let parsed: ProcessedMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, metadata);
    }
}
