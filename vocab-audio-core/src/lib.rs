//! # vocab-audio-core
//!
//! Processing and packaging core for spoken vocabulary recordings.
//!
//! Takes captured audio bytes through decode, silence trimming, optional
//! dynamics compression, 16-bit WAV encoding and validation, with a fallback
//! ladder that always reverts to the nearest good stage. Finished recordings
//! are bundled with a word list, card template and validation report into a
//! store-only ZIP archive.
//!
//! Decoding of arbitrary capture formats, compression engines, persistence
//! and UI notifications are injected through the traits in [`traits`].
//!
//! ## Architecture
//!
//! ```text
//! vocab-audio-core (this crate)
//! ├── traits/       ← AudioDecoder, DynamicsProcessor, PipelineObserver, KeyValueStore
//! ├── models/       ← AudioError, PipelineState, ProcessingSettings, PcmBuffer, ArchiveManifest, etc.
//! ├── processing/   ← CRC-32, waveform analysis, silence trimming, WAV codec, validator, compressor
//! ├── session/      ← PipelineOrchestrator (per-capture state machine)
//! ├── storage/      ← ZipWriter, key-value stores, recording metadata
//! └── package/      ← PackageAssembler and its text documents
//! ```

pub mod models;
pub mod package;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioStats, PcmBuffer, TrimWindow, WaveformSummary};
pub use models::config::{CompressionParams, ProcessingSettings};
pub use models::error::AudioError;
pub use models::package_models::{ArchiveManifest, CaptureRecord, WordEntry};
pub use models::recording_result::{CaptureId, ProcessedMetadata, ProcessedResult, Stage};
pub use models::state::PipelineState;
pub use package::assembler::{Package, PackageAssembler, PackageOptions};
pub use processing::dynamics::Compressor;
pub use processing::silence::SilenceTrimmer;
pub use processing::validator::ValidationOutcome;
pub use processing::wav_format::WavDecoder;
pub use session::orchestrator::{PipelineOrchestrator, ProcessOutcome};
pub use storage::kv_store::{DirectoryStore, FallbackStore, MemoryStore};
pub use storage::zip_writer::{build_archive, ArchiveEntry, ZipWriter};
pub use traits::decoder::AudioDecoder;
pub use traits::dynamics::DynamicsProcessor;
pub use traits::observer::PipelineObserver;
pub use traits::store::KeyValueStore;
