use serde::{Deserialize, Serialize};

use super::error::AudioError;

/// Decoded audio: one `f32` sample sequence per channel plus a sample rate.
///
/// Immutable once built. Every derived buffer (trimmed, compressed) is a new
/// value so earlier stages stay available for fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl PcmBuffer {
    /// Build a buffer, checking that the sample rate is positive and that all
    /// channels have the same frame count.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidConfiguration("sample rate must be positive".into()));
        }
        if let Some(first) = channels.first() {
            let frames = first.len();
            if let Some((index, ch)) = channels.iter().enumerate().find(|(_, ch)| ch.len() != frames) {
                return Err(AudioError::InvalidConfiguration(format!(
                    "channel {} has {} frames, expected {}",
                    index,
                    ch.len(),
                    frames
                )));
            }
        }
        Ok(Self { channels, sample_rate })
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AudioError> {
        Self::new(vec![samples], sample_rate)
    }

    /// Split interleaved samples `[f0c0, f0c1, f1c0, ...]` into channels.
    ///
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(samples: &[f32], channels: u16, sample_rate: u32) -> Result<Self, AudioError> {
        if channels == 0 {
            return Err(AudioError::InvalidConfiguration("channel count must be positive".into()));
        }
        let channel_count = channels as usize;
        let frame_count = samples.len() / channel_count;
        let mut split = vec![Vec::with_capacity(frame_count); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (ch, &sample) in frame.iter().enumerate() {
                split[ch].push(sample);
            }
        }
        Self::new(split, sample_rate)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Copy frames `[start, end)` of every channel into a new buffer.
    ///
    /// Bounds are clamped to the frame count.
    pub fn slice_frames(&self, start: usize, end: usize) -> PcmBuffer {
        let frames = self.frame_count();
        let end = end.min(frames);
        let start = start.min(end);
        Self {
            channels: self.channels.iter().map(|ch| ch[start..end].to_vec()).collect(),
            sample_rate: self.sample_rate,
        }
    }
}

/// Fixed-length RMS envelope of a buffer's reference channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveformSummary {
    pub samples: Vec<f32>,
    pub duration_secs: f64,
    pub sample_rate: u32,
}

impl WaveformSummary {
    pub fn bucket_count(&self) -> usize {
        self.samples.len()
    }
}

/// Content statistics of a buffer's reference channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioStats {
    pub peak_amplitude: f32,
    pub rms_level: f32,
    /// Fraction of samples whose magnitude exceeds the noise floor (0.0–1.0).
    pub non_silent_fraction: f64,
    pub non_silent_samples: usize,
    pub total_samples: usize,
    pub duration_secs: f64,
}

/// Portion of a recording kept after silence trimming, in seconds.
///
/// Invariant: `0 <= start < end <= duration` and `end - start >= 0.1`,
/// except for the full-buffer window returned by [`TrimWindow::full`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrimWindow {
    pub start_secs: f64,
    pub end_secs: f64,
}

impl TrimWindow {
    /// Checked constructor enforcing the window invariant.
    pub fn new(start_secs: f64, end_secs: f64, duration_secs: f64, min_duration_secs: f64) -> Result<Self, AudioError> {
        if start_secs < 0.0 || end_secs > duration_secs + f64::EPSILON {
            return Err(AudioError::TrimDegenerate(format!(
                "window {:.3}s..{:.3}s outside 0..{:.3}s",
                start_secs, end_secs, duration_secs
            )));
        }
        if end_secs <= start_secs {
            return Err(AudioError::TrimDegenerate(format!(
                "end {:.3}s is not after start {:.3}s",
                end_secs, start_secs
            )));
        }
        if end_secs - start_secs < min_duration_secs {
            return Err(AudioError::TrimDegenerate(format!(
                "window of {:.3}s is shorter than {:.3}s",
                end_secs - start_secs,
                min_duration_secs
            )));
        }
        Ok(Self { start_secs, end_secs })
    }

    /// The untrimmed window covering the whole recording.
    pub fn full(duration_secs: f64) -> Self {
        Self {
            start_secs: 0.0,
            end_secs: duration_secs,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    pub fn is_full(&self, duration_secs: f64) -> bool {
        self.start_secs <= 0.0 && self.end_secs >= duration_secs
    }
}
