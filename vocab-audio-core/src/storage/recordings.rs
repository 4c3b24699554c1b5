//! Per-word recording persistence on top of a [`KeyValueStore`].
//!
//! Layout:
//! ```text
//! recording/<word_id>        WAV bytes of the latest kept take
//! recording/<word_id>.json   ProcessedMetadata sidecar
//! recorded_words             JSON array of word ids with a recording
//! ```

use std::collections::BTreeSet;

use crate::models::error::AudioError;
use crate::models::package_models::CaptureRecord;
use crate::models::recording_result::ProcessedResult;
use crate::storage::metadata;
use crate::traits::store::KeyValueStore;

pub const RECORDED_WORDS_KEY: &str = "recorded_words";

pub fn recording_key(word_id: &str) -> String {
    format!("recording/{}", word_id)
}

/// Ids of all words that have a stored recording, in sorted order.
///
/// A missing key is an empty set.
pub fn recorded_words(store: &dyn KeyValueStore) -> Result<BTreeSet<String>, AudioError> {
    match store.get(RECORDED_WORDS_KEY)? {
        Some(json) => serde_json::from_slice(&json)
            .map_err(|e| AudioError::StorageError(format!("failed to parse recorded words: {}", e))),
        None => Ok(BTreeSet::new()),
    }
}

fn write_recorded_words(store: &dyn KeyValueStore, words: &BTreeSet<String>) -> Result<(), AudioError> {
    let json = serde_json::to_vec(words)
        .map_err(|e| AudioError::StorageError(format!("failed to serialize recorded words: {}", e)))?;
    store.set(RECORDED_WORDS_KEY, &json)
}

/// Store a processed result: bytes, metadata sidecar, and the word in the
/// recorded set.
pub fn save_recording(store: &dyn KeyValueStore, result: &ProcessedResult) -> Result<(), AudioError> {
    let word_id = &result.capture_id.word_id;
    store.set(&recording_key(word_id), &result.bytes)?;
    metadata::write_metadata(&result.metadata, store)?;

    let mut words = recorded_words(store)?;
    if words.insert(word_id.clone()) {
        write_recorded_words(store, &words)?;
    }
    Ok(())
}

/// Stored WAV bytes for `word_id`, if any.
pub fn load_recording(store: &dyn KeyValueStore, word_id: &str) -> Result<Option<Vec<u8>>, AudioError> {
    store.get(&recording_key(word_id))
}

/// Remove a word's recording, sidecar, and recorded-set membership.
pub fn clear_recording(store: &dyn KeyValueStore, word_id: &str) -> Result<(), AudioError> {
    store.clear(&recording_key(word_id))?;
    store.clear(&metadata::metadata_key(word_id))?;

    let mut words = recorded_words(store)?;
    if words.remove(word_id) {
        write_recorded_words(store, &words)?;
    }
    Ok(())
}

/// Every stored recording as a [`CaptureRecord`], ordered by word id.
///
/// Words listed in the recorded set whose bytes have gone missing are skipped
/// with a warning.
pub fn load_all(store: &dyn KeyValueStore) -> Result<Vec<CaptureRecord>, AudioError> {
    let mut records = Vec::new();
    for word_id in recorded_words(store)? {
        let Some(bytes) = load_recording(store, &word_id)? else {
            log::warn!("Recorded word {} has no stored audio, skipping", word_id);
            continue;
        };
        let mut record = CaptureRecord::new(word_id.clone(), bytes);
        if let Ok(Some(meta)) = metadata::read_metadata(&word_id, store) {
            if let Ok(at) = chrono::DateTime::parse_from_rfc3339(&meta.created_at) {
                record = record.recorded_at(at.with_timezone(&chrono::Utc));
            }
        }
        records.push(record);
    }
    Ok(records)
}
