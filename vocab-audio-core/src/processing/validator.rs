//! Usable-audio checks applied at every pipeline stage boundary.

use crate::models::audio_models::{AudioStats, PcmBuffer};
use crate::models::config::{MIN_CONTENT_PERCENT, MIN_ENCODED_BYTES, NOISE_FLOOR};
use crate::models::error::AudioError;
use crate::processing::waveform;
use crate::traits::decoder::AudioDecoder;

/// Verdict of a validation check, with a human-readable reason.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub reason: String,
    /// Content statistics, when the audio could be inspected.
    pub stats: Option<AudioStats>,
}

impl ValidationOutcome {
    fn invalid(reason: impl Into<String>, stats: Option<AudioStats>) -> Self {
        Self {
            valid: false,
            reason: reason.into(),
            stats,
        }
    }

    /// `Err(ValidationFailed)` carrying the reason when invalid.
    pub fn into_result(self) -> Result<AudioStats, AudioError> {
        match (self.valid, self.stats) {
            (true, Some(stats)) => Ok(stats),
            _ => Err(AudioError::ValidationFailed(self.reason)),
        }
    }
}

/// Check a decoded buffer.
///
/// Rules, in order: no channels, no frames, silent (peak at or below the
/// 0.001 noise floor), too little content (under 1% of samples above the
/// floor). Exactly 1% passes.
pub fn validate_buffer(buffer: &PcmBuffer) -> ValidationOutcome {
    if buffer.channel_count() == 0 {
        return ValidationOutcome::invalid("audio has no channels", None);
    }
    if buffer.frame_count() == 0 {
        return ValidationOutcome::invalid("audio has zero length", None);
    }

    let stats = waveform::stats(buffer);
    if stats.peak_amplitude <= NOISE_FLOOR {
        return ValidationOutcome::invalid(
            format!("audio appears to be silent (max amplitude: {:.6})", stats.peak_amplitude),
            Some(stats),
        );
    }
    if stats.non_silent_samples * 100 < stats.total_samples * MIN_CONTENT_PERCENT {
        return ValidationOutcome::invalid(
            format!(
                "very little audio content detected ({:.2}% non-silent)",
                stats.non_silent_fraction * 100.0
            ),
            Some(stats),
        );
    }

    ValidationOutcome {
        valid: true,
        reason: format!(
            "valid audio: {:.2}s, {} channels, max amplitude: {:.3}, {:.1}% audio content",
            stats.duration_secs,
            buffer.channel_count(),
            stats.peak_amplitude,
            stats.non_silent_fraction * 100.0
        ),
        stats: Some(stats),
    }
}

/// Check encoded bytes: reject tiny payloads outright, otherwise decode with
/// `decoder` and apply [`validate_buffer`].
pub fn validate_encoded(bytes: &[u8], decoder: &dyn AudioDecoder) -> ValidationOutcome {
    if bytes.is_empty() {
        return ValidationOutcome::invalid("payload has zero size", None);
    }
    if bytes.len() < MIN_ENCODED_BYTES {
        return ValidationOutcome::invalid(
            format!("payload is very small ({} bytes) - likely contains no audio", bytes.len()),
            None,
        );
    }

    match decoder.decode(bytes) {
        Ok(buffer) => {
            let outcome = validate_buffer(&buffer);
            ValidationOutcome {
                reason: format!("{} bytes | {}", bytes.len(), outcome.reason),
                ..outcome
            }
        }
        Err(e) => ValidationOutcome::invalid(format!("failed to decode audio: {}", e), None),
    }
}
