//! Waveform envelopes and content statistics.
//!
//! Everything here reads the reference channel (channel 0) only.

use crate::models::audio_models::{AudioStats, PcmBuffer, WaveformSummary};
use crate::models::config::NOISE_FLOOR;

/// Downsample the reference channel into `bucket_count` RMS values.
///
/// Blocks are `frame_count / bucket_count` samples long; the last block also
/// takes the remainder. Empty blocks yield 0.0.
pub fn summarize(buffer: &PcmBuffer, bucket_count: usize) -> WaveformSummary {
    let reference = buffer.channel(0).unwrap_or(&[]);
    let frames = reference.len();
    let block_size = if bucket_count == 0 { 0 } else { frames / bucket_count };

    let samples = (0..bucket_count)
        .map(|bucket| {
            let start = bucket * block_size;
            let end = if bucket + 1 == bucket_count { frames } else { start + block_size };
            rms_level(&reference[start..end])
        })
        .collect();

    WaveformSummary {
        samples,
        duration_secs: buffer.duration_secs(),
        sample_rate: buffer.sample_rate(),
    }
}

/// Peak, RMS, and non-silent share of the reference channel.
pub fn stats(buffer: &PcmBuffer) -> AudioStats {
    let reference = buffer.channel(0).unwrap_or(&[]);
    let non_silent_samples = reference.iter().filter(|s| s.abs() > NOISE_FLOOR).count();
    let non_silent_fraction = if reference.is_empty() {
        0.0
    } else {
        non_silent_samples as f64 / reference.len() as f64
    };

    AudioStats {
        peak_amplitude: peak_level(reference),
        rms_level: rms_level(reference),
        non_silent_fraction,
        non_silent_samples,
        total_samples: reference.len(),
        duration_secs: buffer.duration_secs(),
    }
}

/// RMS level of samples (0.0–1.0 for normalized audio).
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| s as f64 * s as f64).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Peak absolute level of samples.
pub fn peak_level(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}
