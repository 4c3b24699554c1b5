//! WAV encoding and decoding.
//!
//! Encodes to the canonical 44-byte RIFF header followed by interleaved
//! 16-bit little-endian PCM. Decoding of arbitrary WAV input goes through
//! `hound` behind the [`AudioDecoder`] seam.

use std::io::Cursor;

use crate::models::audio_models::PcmBuffer;
use crate::models::error::AudioError;
use crate::traits::decoder::AudioDecoder;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Bit depth of encoded output.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Generate a 44-byte WAV RIFF header.
///
/// Format: PCM (format code 1), little-endian.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size (file size - 8)
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * block_align
/// [32-33]  block_align = channels * bit_depth / 8
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(sample_rate: u32, bit_depth: u16, channels: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let block_align = channels * bit_depth / 8;
    let byte_rate = sample_rate * block_align as u32;
    let chunk_size = 36 + data_size;

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Fields of a canonical 44-byte PCM header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub chunk_size: u32,
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

/// Read back a canonical header as written by [`generate_wav_header`].
///
/// Only the fixed 44-byte layout is accepted; files with extra chunks should
/// go through [`WavDecoder`].
pub fn parse_wav_header(bytes: &[u8]) -> Result<WavHeader, AudioError> {
    if bytes.len() < WAV_HEADER_SIZE {
        return Err(AudioError::DecodeFailed(format!(
            "{} bytes is shorter than a WAV header",
            bytes.len()
        )));
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" || &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
        return Err(AudioError::DecodeFailed("not a canonical RIFF/WAVE header".into()));
    }
    let u16_at = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
    let u32_at = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

    Ok(WavHeader {
        chunk_size: u32_at(4),
        audio_format: u16_at(20),
        channels: u16_at(22),
        sample_rate: u32_at(24),
        byte_rate: u32_at(28),
        block_align: u16_at(32),
        bits_per_sample: u16_at(34),
        data_size: u32_at(40),
    })
}

/// Convert one float sample to 16-bit PCM: clamp to [-1, 1], scale by
/// 32767, round to nearest.
pub fn sample_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

/// Encode `buffer` as a 16-bit PCM WAV file.
///
/// Samples are interleaved frame by frame: frame 0 channel 0, frame 0
/// channel 1, ..., frame 1 channel 0, ...
pub fn encode(buffer: &PcmBuffer) -> Result<Vec<u8>, AudioError> {
    let channel_count = buffer.channel_count();
    if channel_count == 0 {
        return Err(AudioError::EncodingFailed("buffer has no channels".into()));
    }
    let channels = u16::try_from(channel_count)
        .ok()
        .filter(|&c| c <= u16::MAX / (BITS_PER_SAMPLE / 8))
        .ok_or_else(|| AudioError::EncodingFailed(format!("too many channels: {}", channel_count)))?;

    let block_align = channel_count * (BITS_PER_SAMPLE as usize / 8);
    if buffer.sample_rate().checked_mul(block_align as u32).is_none() {
        return Err(AudioError::EncodingFailed(format!(
            "byte rate overflows at {} Hz",
            buffer.sample_rate()
        )));
    }
    let data_size = buffer
        .frame_count()
        .checked_mul(block_align)
        .and_then(|size| u32::try_from(size).ok())
        .filter(|&size| size <= u32::MAX - 36)
        .ok_or_else(|| AudioError::EncodingFailed("data chunk exceeds 4 GiB".into()))?;

    let mut bytes = Vec::with_capacity(WAV_HEADER_SIZE + data_size as usize);
    bytes.extend_from_slice(&generate_wav_header(buffer.sample_rate(), BITS_PER_SAMPLE, channels, data_size));

    let planes = buffer.channels();
    for frame in 0..buffer.frame_count() {
        for plane in planes {
            bytes.extend_from_slice(&sample_to_i16(plane[frame]).to_le_bytes());
        }
    }

    log::debug!(
        "Encoded WAV: {} frames, {} ch, {} Hz, {} bytes",
        buffer.frame_count(),
        channels,
        buffer.sample_rate(),
        bytes.len()
    );
    Ok(bytes)
}

/// Decoder for WAV input (integer 8–32 bit and 32-bit float), backed by `hound`.
///
/// Integer samples are scaled by the format's positive full scale, so 16-bit
/// output of [`encode`] decodes back within one quantization step.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl WavDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl AudioDecoder for WavDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<PcmBuffer, AudioError> {
        let reader = hound::WavReader::new(Cursor::new(bytes))
            .map_err(|e| AudioError::DecodeFailed(format!("unreadable WAV: {}", e)))?;
        let spec = reader.spec();
        if spec.channels == 0 {
            return Err(AudioError::DecodeFailed("WAV declares zero channels".into()));
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| AudioError::DecodeFailed(format!("corrupt sample data: {}", e)))?,
            hound::SampleFormat::Int => {
                if !(1..=32).contains(&spec.bits_per_sample) {
                    return Err(AudioError::DecodeFailed(format!(
                        "unsupported bit depth: {}",
                        spec.bits_per_sample
                    )));
                }
                let full_scale = ((1i64 << (spec.bits_per_sample - 1)) - 1).max(1) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| (v as f32 / full_scale).clamp(-1.0, 1.0)))
                    .collect::<Result<_, _>>()
                    .map_err(|e| AudioError::DecodeFailed(format!("corrupt sample data: {}", e)))?
            }
        };

        PcmBuffer::from_interleaved(&interleaved, spec.channels, spec.sample_rate)
            .map_err(|e| AudioError::DecodeFailed(e.to_string()))
    }
}
