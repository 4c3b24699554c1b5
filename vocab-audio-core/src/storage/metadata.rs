use crate::models::error::AudioError;
use crate::models::package_models::ArchiveManifest;
use crate::models::recording_result::ProcessedMetadata;
use crate::traits::store::KeyValueStore;

/// Store key of the metadata sidecar for a word's recording.
pub fn metadata_key(word_id: &str) -> String {
    format!("recording/{}.json", word_id)
}

/// Write recording metadata as a JSON sidecar next to the recording.
///
/// Stored under `recording/{word_id}.json`.
pub fn write_metadata(metadata: &ProcessedMetadata, store: &dyn KeyValueStore) -> Result<(), AudioError> {
    let json = serde_json::to_vec_pretty(metadata)
        .map_err(|e| AudioError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    store.set(&metadata_key(&metadata.word_id), &json)
}

/// Read recording metadata for `word_id`, `None` when nothing was stored.
pub fn read_metadata(word_id: &str, store: &dyn KeyValueStore) -> Result<Option<ProcessedMetadata>, AudioError> {
    let Some(json) = store.get(&metadata_key(word_id))? else {
        return Ok(None);
    };
    let metadata = serde_json::from_slice(&json)
        .map_err(|e| AudioError::StorageError(format!("failed to parse metadata: {}", e)))?;
    Ok(Some(metadata))
}

/// Serialize an archive manifest as pretty JSON for `manifest.json`.
pub fn manifest_json(manifest: &ArchiveManifest) -> Result<String, AudioError> {
    serde_json::to_string_pretty(manifest)
        .map_err(|e| AudioError::StorageError(format!("failed to serialize manifest: {}", e)))
}

pub fn parse_manifest(json: &str) -> Result<ArchiveManifest, AudioError> {
    serde_json::from_str(json).map_err(|e| AudioError::StorageError(format!("failed to parse manifest: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::TrimWindow;
    use crate::models::package_models::{CaptureVerdict, EntryKind, ManifestEntry};
    use crate::models::recording_result::{CaptureId, Stage};
    use crate::storage::kv_store::MemoryStore;

    #[test]
    fn metadata_round_trips_through_store() {
        let store = MemoryStore::new();
        let metadata = ProcessedMetadata::new(
            &CaptureId::new("w3", 2),
            0.8,
            16000,
            1,
            25_644,
            "deadbeef",
            Some(TrimWindow::full(0.8)),
            vec![Stage::Trim],
            true,
        );
        write_metadata(&metadata, &store).unwrap();
        assert!(store.get("recording/w3.json").unwrap().is_some());
        assert_eq!(read_metadata("w3", &store).unwrap(), Some(metadata));
        assert_eq!(read_metadata("w4", &store).unwrap(), None);
    }

    #[test]
    fn corrupt_metadata_is_a_storage_error() {
        let store = MemoryStore::new();
        store.set("recording/w1.json", b"{not json").unwrap();
        assert!(matches!(read_metadata("w1", &store), Err(AudioError::StorageError(_))));
    }

    #[test]
    fn manifest_json_uses_camel_case() {
        let manifest = ArchiveManifest {
            deck_name: "Bangla Vocabulary".into(),
            created_at: "2026-03-01T10:00:00+00:00".into(),
            entries: vec![ManifestEntry {
                path: "audio/INVALID_w2.txt".into(),
                kind: EntryKind::Placeholder,
                size: 42,
                crc32: 0x1234_5678,
                word_id: Some("w2".into()),
                reason: Some("payload is very small".into()),
            }],
            verdicts: vec![CaptureVerdict {
                word_id: "w2".into(),
                path: "audio/INVALID_w2.txt".into(),
                valid: false,
                reason: "payload is very small".into(),
            }],
            valid_count: 0,
            invalid_count: 1,
        };
        let json = manifest_json(&manifest).unwrap();
        assert!(json.contains("\"deckName\""));
        assert!(json.contains("\"invalidCount\": 1"));
        assert!(json.contains("\"kind\": \"placeholder\""));
        assert_eq!(parse_manifest(&json).unwrap(), manifest);
    }
}
