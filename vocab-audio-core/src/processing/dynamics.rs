//! Reference feed-forward dynamics compressor.
//!
//! Hard-knee, stereo-linked: the detector follows the loudest channel and the
//! same gain is applied to every channel. Gain reduction is smoothed with
//! one-pole attack/release filters. Hosts with a platform compressor can
//! plug that in through [`DynamicsProcessor`] instead; output is never
//! assumed bit-exact across implementations.

use crate::models::audio_models::PcmBuffer;
use crate::models::config::CompressionParams;
use crate::models::error::AudioError;
use crate::traits::dynamics::DynamicsProcessor;

/// Floor for the level detector, avoids `log10(0)`.
const MIN_LEVEL_DB: f32 = -120.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compressor {
    /// Gain applied after compression, in dB (default: 0).
    pub makeup_gain_db: f32,
}

impl Default for Compressor {
    fn default() -> Self {
        Self { makeup_gain_db: 0.0 }
    }
}

impl Compressor {
    pub fn new(makeup_gain_db: f32) -> Self {
        Self { makeup_gain_db }
    }

    /// Gain reduction in dB the static curve asks for at `level_db`.
    pub fn static_reduction_db(level_db: f32, params: &CompressionParams) -> f32 {
        if level_db <= params.threshold_db {
            0.0
        } else {
            (level_db - params.threshold_db) * (1.0 - 1.0 / params.ratio)
        }
    }
}

/// One-pole smoothing coefficient for a time constant in seconds.
fn smoothing_coefficient(time_secs: f32, sample_rate: u32) -> f32 {
    (-1.0 / (time_secs * sample_rate as f32)).exp()
}

fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

impl DynamicsProcessor for Compressor {
    fn process(&self, buffer: &PcmBuffer, params: &CompressionParams) -> Result<PcmBuffer, AudioError> {
        params
            .validate()
            .map_err(|e| AudioError::ProcessingFailed(e.to_string()))?;

        let rate = buffer.sample_rate();
        let attack = smoothing_coefficient(params.attack_secs, rate);
        let release = smoothing_coefficient(params.release_secs, rate);
        let makeup = db_to_gain(self.makeup_gain_db);

        let planes = buffer.channels();
        let mut output: Vec<Vec<f32>> = planes.iter().map(|ch| Vec::with_capacity(ch.len())).collect();
        let mut reduction_db = 0.0f32;

        for frame in 0..buffer.frame_count() {
            let detector = planes.iter().map(|ch| ch[frame].abs()).fold(0.0f32, f32::max);
            let level_db = if detector > 0.0 {
                (20.0 * detector.log10()).max(MIN_LEVEL_DB)
            } else {
                MIN_LEVEL_DB
            };

            let target = Self::static_reduction_db(level_db, params);
            let coeff = if target > reduction_db { attack } else { release };
            reduction_db = coeff * reduction_db + (1.0 - coeff) * target;

            let gain = db_to_gain(-reduction_db) * makeup;
            for (out, plane) in output.iter_mut().zip(planes) {
                out.push(plane[frame] * gain);
            }
        }

        PcmBuffer::new(output, rate)
    }

    fn name(&self) -> &str {
        "feed-forward-compressor"
    }
}
