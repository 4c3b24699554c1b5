use crate::models::audio_models::PcmBuffer;
use crate::models::error::AudioError;

/// Turns encoded capture bytes into PCM.
///
/// The capture device hands over bytes in whatever container it records;
/// the pipeline only needs this one capability. Implemented by:
/// - `WavDecoder` (built in, hound-backed)
/// - platform decoders supplied by the host application
pub trait AudioDecoder: Send + Sync {
    /// Decode `bytes` into a buffer with equal-length channels and a
    /// positive sample rate.
    ///
    /// Returns `AudioError::DecodeFailed` when the bytes are unreadable.
    fn decode(&self, bytes: &[u8]) -> Result<PcmBuffer, AudioError>;
}
