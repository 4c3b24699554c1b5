use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::models::audio_models::{PcmBuffer, TrimWindow};
use crate::models::config::{ProcessingSettings, PREVIEW_BUCKETS};
use crate::models::error::AudioError;
use crate::models::recording_result::{
    CaptureId, FallbackRecord, ProcessedMetadata, ProcessedResult, Stage, TrimReport,
};
use crate::models::state::PipelineState;
use crate::processing::dynamics::Compressor;
use crate::processing::silence::{self, SilenceTrimmer};
use crate::processing::validator;
use crate::processing::wav_format::{self, WavDecoder};
use crate::processing::waveform;
use crate::storage::recordings;
use crate::storage::zip_writer::sha256_hex;
use crate::traits::decoder::AudioDecoder;
use crate::traits::dynamics::DynamicsProcessor;
use crate::traits::observer::PipelineObserver;
use crate::traits::store::KeyValueStore;

/// Result of [`PipelineOrchestrator::process`], tagged with whether the
/// capture is still the word's latest take.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Current(ProcessedResult),
    /// A newer take was started while this one was processing. Callers
    /// should drop the result.
    Stale(ProcessedResult),
}

impl ProcessOutcome {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }

    pub fn result(&self) -> &ProcessedResult {
        match self {
            Self::Current(result) | Self::Stale(result) => result,
        }
    }

    pub fn into_result(self) -> ProcessedResult {
        match self {
            Self::Current(result) | Self::Stale(result) => result,
        }
    }
}

/// Per-capture state, protected by the orchestrator's `parking_lot::Mutex`.
struct CaptureSlot {
    state: PipelineState,
    running: bool,
    last_result: Option<ProcessedResult>,
}

impl CaptureSlot {
    fn new() -> Self {
        Self {
            state: PipelineState::Idle,
            running: false,
            last_result: None,
        }
    }
}

#[derive(Default)]
struct Registry {
    slots: HashMap<CaptureId, CaptureSlot>,
    /// Current take per word. Cleared by `reset`.
    takes: HashMap<String, u64>,
    /// Highest take ever issued per word. Never cleared, so take numbers are
    /// not reused.
    issued: HashMap<String, u64>,
}

impl Registry {
    /// A take is stale once a newer one exists, or once its word was reset.
    fn is_stale(&self, id: &CaptureId) -> bool {
        match self.takes.get(&id.word_id) {
            Some(&latest) => latest > id.take,
            None => self.issued.get(&id.word_id).is_some_and(|&issued| issued >= id.take),
        }
    }

    fn outcome(&self, id: &CaptureId, result: ProcessedResult) -> ProcessOutcome {
        if self.is_stale(id) {
            ProcessOutcome::Stale(result)
        } else {
            ProcessOutcome::Current(result)
        }
    }
}

/// Releases the capture's single-flight flag when a run ends, including by
/// panic in an injected stage.
struct InFlight<'a> {
    registry: &'a Mutex<Registry>,
    finished: &'a Condvar,
    id: &'a CaptureId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut registry = self.registry.lock();
        if let Some(slot) = registry.slots.get_mut(self.id) {
            slot.running = false;
        }
        drop(registry);
        self.finished.notify_all();
    }
}

/// Runs one capture through decode → trim → compress → encode → validate.
///
/// Data flow:
/// ```text
/// [bytes] → [AudioDecoder] → original ─→ [SilenceTrimmer] → trimmed ─→ [DynamicsProcessor] → compressed
///                               │                             │                                 │
///                               │      (fails validation)     │     (throws / fails validation) │
///                               │◄────────────────────────────┘◄────────────────────────────────┘
///                               ▼
///                        [WAV encode] → [validate] ──(fails)──→ re-encode original
/// ```
///
/// At most one run per [`CaptureId`] executes at a time. A second
/// [`process`](Self::process) call for a busy capture returns the last
/// completed result, or waits for the pending run.
pub struct PipelineOrchestrator {
    decoder: Arc<dyn AudioDecoder>,
    dynamics: Arc<dyn DynamicsProcessor>,
    trimmer: SilenceTrimmer,
    observer: Option<Arc<dyn PipelineObserver>>,
    store: Option<Arc<dyn KeyValueStore>>,
    registry: Mutex<Registry>,
    finished: Condvar,
    /// Serializes the stale check with the store write.
    committing: Mutex<()>,
}

impl PipelineOrchestrator {
    pub fn new(decoder: Arc<dyn AudioDecoder>, dynamics: Arc<dyn DynamicsProcessor>) -> Self {
        Self {
            decoder,
            dynamics,
            trimmer: SilenceTrimmer::default(),
            observer: None,
            store: None,
            registry: Mutex::new(Registry::default()),
            finished: Condvar::new(),
            committing: Mutex::new(()),
        }
    }

    /// WAV input with the built-in compressor.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(WavDecoder::new()), Arc::new(Compressor::default()))
    }

    pub fn set_observer(&mut self, observer: Arc<dyn PipelineObserver>) {
        self.observer = Some(observer);
    }

    /// Persist current results to `store` (best effort).
    pub fn set_store(&mut self, store: Arc<dyn KeyValueStore>) {
        self.store = Some(store);
    }

    pub fn set_trimmer(&mut self, trimmer: SilenceTrimmer) {
        self.trimmer = trimmer;
    }

    /// Start a new take for `word_id`. Earlier takes become stale.
    pub fn begin_capture(&self, word_id: &str) -> CaptureId {
        let mut registry = self.registry.lock();
        let take = registry.issued.get(word_id).map_or(1, |t| t + 1);
        registry.issued.insert(word_id.to_string(), take);
        registry.takes.insert(word_id.to_string(), take);
        registry
            .slots
            .retain(|id, slot| id.word_id != word_id || slot.running);
        CaptureId::new(word_id, take)
    }

    /// Latest take issued for `word_id`.
    pub fn current_take(&self, word_id: &str) -> Option<u64> {
        self.registry.lock().takes.get(word_id).copied()
    }

    pub fn state(&self, id: &CaptureId) -> PipelineState {
        self.registry
            .lock()
            .slots
            .get(id)
            .map_or(PipelineState::Idle, |slot| slot.state.clone())
    }

    /// Forget the current take and finished states for `word_id`. Runs still
    /// in flight keep their slot until they finish and report as stale.
    pub fn reset(&self, word_id: &str) {
        let mut registry = self.registry.lock();
        registry.takes.remove(word_id);
        registry
            .slots
            .retain(|id, slot| id.word_id != word_id || slot.running);
        log::debug!("Reset pipeline state for {}", word_id);
    }

    /// Process `bytes` captured for `id`.
    ///
    /// Only an undecodable capture (or invalid `settings`) is an error; every
    /// later stage failure is absorbed by the fallback ladder.
    pub fn process(
        &self,
        id: &CaptureId,
        bytes: &[u8],
        settings: &ProcessingSettings,
    ) -> Result<ProcessOutcome, AudioError> {
        settings.validate()?;

        {
            let mut registry = self.registry.lock();
            let slot = registry.slots.entry(id.clone()).or_insert_with(CaptureSlot::new);
            if slot.running {
                if let Some(result) = slot.last_result.clone() {
                    log::debug!("{} busy, returning last completed result", id);
                    return Ok(registry.outcome(id, result));
                }
                log::debug!("{} busy, waiting for pending run", id);
                while registry.slots.get(id).is_some_and(|slot| slot.running) {
                    self.finished.wait(&mut registry);
                }
                let Some(slot) = registry.slots.get(id) else {
                    return Err(AudioError::ProcessingFailed(format!("{} was reset while processing", id)));
                };
                return match (&slot.last_result, &slot.state) {
                    (Some(result), _) => Ok(registry.outcome(id, result.clone())),
                    (None, PipelineState::Failed(e)) => Err(e.clone()),
                    (None, _) => Err(AudioError::ProcessingFailed(format!("{} ended without a result", id))),
                };
            }
            slot.running = true;
        }

        let _in_flight = InFlight {
            registry: &self.registry,
            finished: &self.finished,
            id,
        };

        match self.run(id, bytes, settings) {
            Ok(result) => {
                {
                    let mut registry = self.registry.lock();
                    if let Some(slot) = registry.slots.get_mut(id) {
                        slot.state = PipelineState::Done(Box::new(result.clone()));
                        slot.last_result = Some(result.clone());
                    }
                }
                self.notify_state(id, &PipelineState::Done(Box::new(result.clone())));
                if let Some(ref observer) = self.observer {
                    observer.on_processing_finished(id, &result);
                }

                if self.commit(&result) {
                    Ok(ProcessOutcome::Current(result))
                } else {
                    log::debug!("{} superseded by a newer take, not persisting", id);
                    Ok(ProcessOutcome::Stale(result))
                }
            }
            Err(e) => {
                log::error!("{} failed: {}", id, e);
                self.set_state(id, PipelineState::Failed(e.clone()));
                Err(e)
            }
        }
    }

    // --- Internal helpers ---

    fn run(&self, id: &CaptureId, bytes: &[u8], settings: &ProcessingSettings) -> Result<ProcessedResult, AudioError> {
        self.set_state(id, PipelineState::Decoding);
        let original = self.decoder.decode(bytes).map_err(|e| match e {
            AudioError::DecodeFailed(_) => e,
            other => AudioError::DecodeFailed(other.to_string()),
        })?;
        let original_check = validator::validate_buffer(&original);
        if !original_check.valid {
            log::warn!("{} capture itself is unusable: {}", id, original_check.reason);
        }

        let mut fallbacks = Vec::new();
        let mut applied_stages = Vec::new();

        // Rung 1: trim.
        let mut trim_window: Option<TrimWindow> = None;
        let mut trim_report = None;
        let trimmed = if settings.auto_trim_enabled {
            self.set_state(id, PipelineState::Trimming);
            let window = self
                .trimmer
                .find_trim_window(&original, settings.relative_silence_fraction);
            if window.is_full(original.duration_secs()) {
                log::debug!("{} nothing to trim", id);
                None
            } else {
                let candidate = silence::apply_trim(&original, &window);
                let check = validator::validate_buffer(&candidate);
                if check.valid {
                    trim_report = Some(TrimReport {
                        original: waveform::summarize(&original, PREVIEW_BUCKETS),
                        trimmed: waveform::summarize(&candidate, PREVIEW_BUCKETS),
                        window,
                    });
                    trim_window = Some(window);
                    applied_stages.push(Stage::Trim);
                    Some(candidate)
                } else {
                    self.fallback(id, Stage::Trim, &check.reason, &mut fallbacks);
                    None
                }
            }
        } else {
            None
        };
        let base = trimmed.as_ref().unwrap_or(&original);

        // Rung 2: compression.
        let compressed = if settings.compression_active() {
            self.set_state(id, PipelineState::Compressing);
            match self.compress(base, settings) {
                Ok(buffer) => {
                    applied_stages.push(Stage::Compress);
                    Some(buffer)
                }
                Err(e) => {
                    self.fallback(id, Stage::Compress, &e.to_string(), &mut fallbacks);
                    None
                }
            }
        } else {
            None
        };
        let processed = compressed.as_ref().unwrap_or(base);

        // Rung 3: encode and validate the final bytes.
        self.set_state(id, PipelineState::Encoding);
        let encoded = wav_format::encode(processed);
        self.set_state(id, PipelineState::Validating);
        let verdict = encoded.map_err(|e| (Stage::Encode, e.to_string())).and_then(|bytes| {
            let check = validator::validate_encoded(&bytes, &WavDecoder::new());
            if check.valid {
                Ok((bytes, check.reason))
            } else {
                Err((Stage::Validate, check.reason))
            }
        });

        let (final_bytes, final_buffer, is_valid, diagnostics) = match verdict {
            Ok((bytes, reason)) => (bytes, processed, true, reason),
            Err((stage, reason)) => {
                self.fallback(id, stage, &reason, &mut fallbacks);
                applied_stages.clear();
                trim_window = None;
                trim_report = None;
                let bytes = wav_format::encode(&original)?;
                let diagnostics = format!("reverted to original capture ({}): {}", reason, original_check.reason);
                (bytes, &original, original_check.valid, diagnostics)
            }
        };

        let checksum = sha256_hex(&final_bytes);
        let metadata = ProcessedMetadata::new(
            id,
            final_buffer.duration_secs(),
            final_buffer.sample_rate(),
            final_buffer.channel_count() as u16,
            final_bytes.len(),
            &checksum,
            trim_window,
            applied_stages.clone(),
            is_valid,
        );

        log::debug!(
            "{} done: {} bytes, stages {:?}, {} fallback(s)",
            id,
            final_bytes.len(),
            applied_stages,
            fallbacks.len()
        );

        Ok(ProcessedResult {
            capture_id: id.clone(),
            bytes: final_bytes,
            trim_window,
            trim_report,
            is_valid,
            diagnostics,
            applied_stages,
            fallbacks,
            metadata,
        })
    }

    /// Run the dynamics stage and check its output before trusting it.
    fn compress(&self, input: &PcmBuffer, settings: &ProcessingSettings) -> Result<PcmBuffer, AudioError> {
        let output = self.dynamics.process(input, &settings.compression_params())?;
        if output.channel_count() != input.channel_count()
            || output.sample_rate() != input.sample_rate()
            || output.frame_count() != input.frame_count()
        {
            return Err(AudioError::ProcessingFailed(format!(
                "{} changed the buffer shape ({} ch/{} Hz/{} frames → {} ch/{} Hz/{} frames)",
                self.dynamics.name(),
                input.channel_count(),
                input.sample_rate(),
                input.frame_count(),
                output.channel_count(),
                output.sample_rate(),
                output.frame_count()
            )));
        }
        validator::validate_buffer(&output).into_result()?;
        Ok(output)
    }

    fn fallback(&self, id: &CaptureId, from: Stage, reason: &str, records: &mut Vec<FallbackRecord>) {
        log::warn!("{} fallback from {}: {}", id, from, reason);
        records.push(FallbackRecord {
            from,
            reason: reason.to_string(),
        });
        self.set_state(
            id,
            PipelineState::Fallback {
                from,
                reason: reason.to_string(),
            },
        );
        if let Some(ref observer) = self.observer {
            observer.on_fallback(id, from, reason);
        }
    }

    /// Persist `result` unless its take is stale. Returns whether it was
    /// still current. A newer take's commit waits until this write lands.
    fn commit(&self, result: &ProcessedResult) -> bool {
        let _committing = self.committing.lock();
        if self.registry.lock().is_stale(&result.capture_id) {
            return false;
        }
        if let Some(ref store) = self.store {
            if let Err(e) = recordings::save_recording(store.as_ref(), result) {
                log::warn!("Failed to persist {}: {}", result.capture_id, e);
            }
        }
        true
    }

    fn set_state(&self, id: &CaptureId, state: PipelineState) {
        {
            let mut registry = self.registry.lock();
            if let Some(slot) = registry.slots.get_mut(id) {
                slot.state = state.clone();
            }
        }
        log::debug!("{} → {}", id, state.name());
        self.notify_state(id, &state);
    }

    fn notify_state(&self, id: &CaptureId, state: &PipelineState) {
        if let Some(ref observer) = self.observer {
            observer.on_state_changed(id, state);
        }
    }
}
