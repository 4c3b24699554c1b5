use crate::models::audio_models::PcmBuffer;
use crate::models::config::CompressionParams;
use crate::models::error::AudioError;

/// Optional dynamics-compression stage.
///
/// Output must keep the input's channel count, sample rate, and frame count.
/// Implementations may be non-deterministic (for example a platform render
/// engine), so the pipeline validates the output before using it.
pub trait DynamicsProcessor: Send + Sync {
    fn process(&self, buffer: &PcmBuffer, params: &CompressionParams) -> Result<PcmBuffer, AudioError>;

    /// Identifier used in logs (e.g., "feed-forward-compressor").
    fn name(&self) -> &str;
}
