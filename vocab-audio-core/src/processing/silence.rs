//! Leading/trailing silence detection.
//!
//! The threshold is relative to the recording's own peak, so quiet and loud
//! takes trim the same way. Trimming is best effort: whenever no usable
//! window is found, the full-buffer window is returned.

use crate::models::audio_models::{PcmBuffer, TrimWindow};
use crate::models::config::{MIN_TRIM_DURATION_SECS, TRIM_PADDING_SECS};
use crate::processing::waveform;

/// Silence trimming parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceTrimmer {
    /// Audio kept before the first and after the last loud sample (default: 0.05 s).
    pub padding_secs: f64,

    /// Shortest window accepted (default: 0.1 s).
    pub min_duration_secs: f64,
}

impl Default for SilenceTrimmer {
    fn default() -> Self {
        Self {
            padding_secs: TRIM_PADDING_SECS,
            min_duration_secs: MIN_TRIM_DURATION_SECS,
        }
    }
}

impl SilenceTrimmer {
    pub fn new(padding_secs: f64, min_duration_secs: f64) -> Self {
        Self {
            padding_secs,
            min_duration_secs,
        }
    }

    /// Padding expressed in frames at `sample_rate`.
    pub fn padding_frames(&self, sample_rate: u32) -> usize {
        (sample_rate as f64 * self.padding_secs).floor() as usize
    }

    /// Find the window between the first and last sample louder than
    /// `relative_silence_fraction × peak`, padded on both sides.
    pub fn find_trim_window(&self, buffer: &PcmBuffer, relative_silence_fraction: f32) -> TrimWindow {
        let duration = buffer.duration_secs();
        let Some((start, end)) = self.find_trim_frames(buffer, relative_silence_fraction) else {
            log::debug!("No sample above threshold, keeping full {:.3}s", duration);
            return TrimWindow::full(duration);
        };

        let rate = buffer.sample_rate() as f64;
        match TrimWindow::new(start as f64 / rate, end as f64 / rate, duration, self.min_duration_secs) {
            Ok(window) => window,
            Err(e) => {
                log::debug!("Skipping trim: {}", e);
                TrimWindow::full(duration)
            }
        }
    }

    /// Frame bounds `[start, end)` of the padded loud region, if any sample
    /// exceeds the threshold.
    fn find_trim_frames(&self, buffer: &PcmBuffer, relative_silence_fraction: f32) -> Option<(usize, usize)> {
        let reference = buffer.channel(0)?;
        let threshold = relative_silence_fraction * waveform::peak_level(reference);
        let padding = self.padding_frames(buffer.sample_rate());

        let first = reference.iter().position(|s| s.abs() > threshold)?;
        let last = reference.iter().rposition(|s| s.abs() > threshold)?;

        let start = first.saturating_sub(padding);
        let end = (last + 1).saturating_add(padding).min(reference.len());
        Some((start, end))
    }
}

/// [`SilenceTrimmer::find_trim_window`] with the default padding and floor.
pub fn find_trim_window(buffer: &PcmBuffer, relative_silence_fraction: f32) -> TrimWindow {
    SilenceTrimmer::default().find_trim_window(buffer, relative_silence_fraction)
}

/// Cut `buffer` down to `window`, returning a new buffer.
///
/// Window bounds are converted back to frames by rounding, so windows
/// computed from frame indices map back onto the same frames.
pub fn apply_trim(buffer: &PcmBuffer, window: &TrimWindow) -> PcmBuffer {
    let rate = buffer.sample_rate() as f64;
    let start = (window.start_secs * rate).round().max(0.0) as usize;
    let end = (window.end_secs * rate).round().max(0.0) as usize;
    buffer.slice_frames(start, end)
}
