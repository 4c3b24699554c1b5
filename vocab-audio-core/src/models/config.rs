use serde::{Deserialize, Serialize};

use super::error::AudioError;
use crate::traits::store::KeyValueStore;

/// Magnitude at or below which a sample counts as silence.
pub const NOISE_FLOOR: f32 = 0.001;

/// Minimum share of non-silent samples, in percent, for audio to be usable.
pub const MIN_CONTENT_PERCENT: usize = 1;

/// Encoded payloads smaller than this are rejected without decoding.
pub const MIN_ENCODED_BYTES: usize = 1000;

/// Padding kept on both sides of detected speech when trimming.
pub const TRIM_PADDING_SECS: f64 = 0.05;

/// Trim windows shorter than this are discarded in favour of the full buffer.
pub const MIN_TRIM_DURATION_SECS: f64 = 0.1;

/// Waveform bucket counts used by the preview and editor views.
pub const PREVIEW_BUCKETS: usize = 400;
pub const EDITOR_BUCKETS: usize = 1000;

/// Store key holding the serialized [`ProcessingSettings`].
pub const SETTINGS_KEY: &str = "settings";

/// Per-recording processing options.
///
/// Persisted as camelCase JSON so stored settings stay readable by other
/// front ends sharing the same store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingSettings {
    /// Trim leading/trailing silence (default: true).
    pub auto_trim_enabled: bool,

    /// Fraction of peak amplitude treated as the noise floor, in `(0, 1]` (default: 0.05).
    pub relative_silence_fraction: f32,

    /// Gate for the optional effect stages (default: false).
    pub extra_processing_enabled: bool,

    /// Run the dynamics compressor when extra processing is on (default: false).
    pub compression_enabled: bool,

    /// Compressor threshold in dBFS, `<= 0` (default: -24).
    pub compression_threshold: f32,

    /// Compression ratio, `>= 1` (default: 4).
    pub compression_ratio: f32,

    /// Attack time in seconds, `> 0` (default: 0.003).
    pub compression_attack: f32,

    /// Release time in seconds, `> 0` (default: 0.25).
    pub compression_release: f32,
}

impl ProcessingSettings {
    pub fn validate(&self) -> Result<(), AudioError> {
        if !(self.relative_silence_fraction > 0.0 && self.relative_silence_fraction <= 1.0) {
            return Err(AudioError::InvalidConfiguration(format!(
                "relative silence fraction must be in (0, 1]: {}",
                self.relative_silence_fraction
            )));
        }
        self.compression_params().validate()
    }

    /// Whether the compressor stage should run for these settings.
    pub fn compression_active(&self) -> bool {
        self.extra_processing_enabled && self.compression_enabled
    }

    pub fn compression_params(&self) -> CompressionParams {
        CompressionParams {
            threshold_db: self.compression_threshold,
            ratio: self.compression_ratio,
            attack_secs: self.compression_attack,
            release_secs: self.compression_release,
        }
    }

    /// Load settings from the store, falling back to defaults when the key is
    /// missing or unreadable.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let bytes = match store.get(SETTINGS_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Self::default(),
            Err(e) => {
                log::warn!("Failed to read settings, using defaults: {}", e);
                return Self::default();
            }
        };
        match serde_json::from_slice::<Self>(&bytes) {
            Ok(settings) if settings.validate().is_ok() => settings,
            Ok(_) => {
                log::warn!("Stored settings out of range, using defaults");
                Self::default()
            }
            Err(e) => {
                log::warn!("Failed to parse settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), AudioError> {
        self.validate()?;
        let json = serde_json::to_vec(self)
            .map_err(|e| AudioError::StorageError(format!("failed to serialize settings: {}", e)))?;
        store.set(SETTINGS_KEY, &json)
    }
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            auto_trim_enabled: true,
            relative_silence_fraction: 0.05,
            extra_processing_enabled: false,
            compression_enabled: false,
            compression_threshold: -24.0,
            compression_ratio: 4.0,
            compression_attack: 0.003,
            compression_release: 0.25,
        }
    }
}

/// Parameters handed to a [`DynamicsProcessor`](crate::traits::dynamics::DynamicsProcessor).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionParams {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_secs: f32,
    pub release_secs: f32,
}

impl CompressionParams {
    pub fn validate(&self) -> Result<(), AudioError> {
        if !(self.threshold_db <= 0.0) {
            return Err(AudioError::InvalidConfiguration(format!(
                "compression threshold must be <= 0 dB: {}",
                self.threshold_db
            )));
        }
        if !(self.ratio >= 1.0) {
            return Err(AudioError::InvalidConfiguration(format!(
                "compression ratio must be >= 1: {}",
                self.ratio
            )));
        }
        if !(self.attack_secs > 0.0) || !(self.release_secs > 0.0) {
            return Err(AudioError::InvalidConfiguration(format!(
                "attack/release must be positive: {}/{}",
                self.attack_secs, self.release_secs
            )));
        }
        Ok(())
    }
}

impl Default for CompressionParams {
    fn default() -> Self {
        ProcessingSettings::default().compression_params()
    }
}
