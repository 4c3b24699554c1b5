use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use crate::models::error::AudioError;
use crate::models::package_models::{
    ArchiveManifest, CaptureRecord, CaptureVerdict, EntryKind, ManifestEntry, WordEntry,
};
use crate::package::documents;
use crate::processing::crc32;
use crate::processing::validator;
use crate::processing::wav_format::WavDecoder;
use crate::storage::metadata::manifest_json;
use crate::storage::recordings;
use crate::storage::zip_writer::{build_archive, sha256_hex, ArchiveEntry};
use crate::traits::decoder::AudioDecoder;
use crate::traits::store::KeyValueStore;

pub const DEFAULT_DECK_NAME: &str = "Vocabulary Audio Collection";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOptions {
    /// Deck name shown in the README and used for the archive file name.
    pub deck_name: String,
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            deck_name: DEFAULT_DECK_NAME.to_string(),
        }
    }
}

/// A finished archive.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub bytes: Vec<u8>,
    pub manifest: ArchiveManifest,
    /// SHA-256 hex digest of `bytes`.
    pub checksum: String,
}

impl Package {
    /// Suggested file name, e.g. `vocabulary_audio_collection.zip`.
    pub fn file_name(&self) -> String {
        format!("{}.zip", documents::slug(&self.manifest.deck_name))
    }

    pub fn save(&self, path: &Path) -> Result<(), AudioError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AudioError::StorageError(format!("failed to create directory: {}", e)))?;
        }
        fs::write(path, &self.bytes).map_err(|e| AudioError::StorageError(format!("failed to write package: {}", e)))
    }
}

/// Per-capture archive entry plus its verdict.
struct CaptureEntry {
    entry: ArchiveEntry,
    kind: EntryKind,
    verdict: CaptureVerdict,
}

/// Builds export archives from stored captures and the word list.
///
/// Captures are validated one by one in input order; failures become text
/// placeholders so every capture is accounted for in the report.
pub struct PackageAssembler {
    decoder: Arc<dyn AudioDecoder>,
    options: PackageOptions,
}

impl PackageAssembler {
    pub fn new(decoder: Arc<dyn AudioDecoder>, options: PackageOptions) -> Self {
        Self { decoder, options }
    }

    /// WAV decoding with default options.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(WavDecoder::new()), PackageOptions::default())
    }

    pub fn options(&self) -> &PackageOptions {
        &self.options
    }

    /// Full package: documents, manifest, audio or placeholders, report.
    ///
    /// Fails with `ArchiveEmpty` when no capture validates.
    pub fn assemble(&self, captures: &[CaptureRecord], words: &[WordEntry]) -> Result<Package, AudioError> {
        let now = Utc::now();
        let index: HashMap<&str, &WordEntry> = words.iter().map(|w| (w.id.as_str(), w)).collect();

        let captures = dedupe(captures);
        let capture_entries: Vec<CaptureEntry> = captures.iter().map(|c| self.capture_entry(c, &index)).collect();
        let verdicts: Vec<CaptureVerdict> = capture_entries.iter().map(|c| c.verdict.clone()).collect();
        let valid_count = verdicts.iter().filter(|v| v.valid).count();
        let invalid_count = verdicts.len() - valid_count;

        if valid_count == 0 {
            log::error!("No valid audio among {} captures", verdicts.len());
            return Err(AudioError::ArchiveEmpty);
        }
        if invalid_count > 0 {
            log::warn!("{} invalid captures replaced by placeholders", invalid_count);
        }

        let matched: Vec<&WordEntry> = captures.iter().filter_map(|c| index.get(c.word_id.as_str()).copied()).collect();

        let mut manifest = ArchiveManifest {
            deck_name: self.options.deck_name.clone(),
            created_at: now.to_rfc3339(),
            entries: Vec::new(),
            verdicts,
            valid_count,
            invalid_count,
        };

        let documents_part = vec![
            (
                ArchiveEntry::text(
                    documents::README_PATH,
                    &documents::readme(&self.options.deck_name, &matched, valid_count, now),
                ),
                EntryKind::Document,
            ),
            (
                ArchiveEntry::text(documents::WORD_LIST_PATH, &documents::word_list_csv(&matched)),
                EntryKind::Document,
            ),
            (
                ArchiveEntry::text(documents::TEMPLATE_PATH, documents::anki_template()),
                EntryKind::Document,
            ),
        ];
        let report = ArchiveEntry::text(documents::REPORT_PATH, &documents::validation_report(&manifest, now));

        manifest.entries = documents_part
            .iter()
            .map(|(entry, kind)| manifest_entry(entry, *kind, None, None))
            .chain(capture_entries.iter().map(|c| {
                manifest_entry(&c.entry, c.kind, Some(c.verdict.word_id.as_str()), Some(c.verdict.reason.as_str()))
            }))
            .chain(std::iter::once(manifest_entry(&report, EntryKind::Document, None, None)))
            .collect();
        let manifest_entry_doc = ArchiveEntry::text(documents::MANIFEST_PATH, &manifest_json(&manifest)?);

        let mut entries: Vec<ArchiveEntry> = documents_part.into_iter().map(|(entry, _)| entry).collect();
        entries.push(manifest_entry_doc);
        entries.extend(capture_entries.into_iter().map(|c| c.entry));
        entries.push(report);

        let package = self.finish(entries, manifest)?;
        log::info!(
            "Package {} created: {}, {} bytes",
            package.file_name(),
            package.manifest.summary_line(),
            package.bytes.len()
        );
        Ok(package)
    }

    /// Archive of valid `audio/<id>.wav` entries only.
    pub fn assemble_audio_only(&self, captures: &[CaptureRecord], words: &[WordEntry]) -> Result<Package, AudioError> {
        let index: HashMap<&str, &WordEntry> = words.iter().map(|w| (w.id.as_str(), w)).collect();
        let capture_entries: Vec<CaptureEntry> = dedupe(captures)
            .iter()
            .map(|c| self.capture_entry(c, &index))
            .collect();

        let verdicts: Vec<CaptureVerdict> = capture_entries.iter().map(|c| c.verdict.clone()).collect();
        let valid_count = verdicts.iter().filter(|v| v.valid).count();
        if valid_count == 0 {
            return Err(AudioError::ArchiveEmpty);
        }

        let audio: Vec<CaptureEntry> = capture_entries.into_iter().filter(|c| c.kind == EntryKind::Audio).collect();
        let manifest = ArchiveManifest {
            deck_name: self.options.deck_name.clone(),
            created_at: Utc::now().to_rfc3339(),
            entries: audio
                .iter()
                .map(|c| manifest_entry(&c.entry, c.kind, Some(c.verdict.word_id.as_str()), Some(c.verdict.reason.as_str())))
                .collect(),
            valid_count,
            invalid_count: verdicts.len() - valid_count,
            verdicts,
        };

        let package = self.finish(audio.into_iter().map(|c| c.entry).collect(), manifest)?;
        log::info!(
            "Audio-only package created: {} files, {} bytes",
            package.manifest.valid_count,
            package.bytes.len()
        );
        Ok(package)
    }

    /// [`assemble`](Self::assemble) over every recording in `store`.
    pub fn assemble_from_store(&self, store: &dyn KeyValueStore, words: &[WordEntry]) -> Result<Package, AudioError> {
        let captures = recordings::load_all(store)?;
        self.assemble(&captures, words)
    }

    fn capture_entry(&self, capture: &CaptureRecord, index: &HashMap<&str, &WordEntry>) -> CaptureEntry {
        let Some(word) = index.get(capture.word_id.as_str()) else {
            let reason = format!("no word-list entry for {}", capture.word_id);
            log::warn!("Skipping capture: {}", reason);
            let path = documents::error_path(&capture.word_id);
            return CaptureEntry {
                entry: ArchiveEntry::text(
                    path.clone(),
                    &documents::error_placeholder(&capture.word_id, &reason, capture.recorded_at),
                ),
                kind: EntryKind::Placeholder,
                verdict: CaptureVerdict {
                    word_id: capture.word_id.clone(),
                    path,
                    valid: false,
                    reason,
                },
            };
        };

        let outcome = validator::validate_encoded(&capture.bytes, self.decoder.as_ref());
        if outcome.valid {
            log::debug!("Valid audio for {}: {}", word.id, outcome.reason);
            let path = documents::audio_path(&word.id);
            CaptureEntry {
                entry: ArchiveEntry::new(path.clone(), capture.bytes.clone()),
                kind: EntryKind::Audio,
                verdict: CaptureVerdict {
                    word_id: word.id.clone(),
                    path,
                    valid: true,
                    reason: outcome.reason,
                },
            }
        } else {
            log::warn!("Invalid audio for {}: {}", word.id, outcome.reason);
            let path = documents::invalid_path(&word.id);
            CaptureEntry {
                entry: ArchiveEntry::text(
                    path.clone(),
                    &documents::invalid_placeholder(word, &outcome.reason, capture.recorded_at),
                ),
                kind: EntryKind::Placeholder,
                verdict: CaptureVerdict {
                    word_id: word.id.clone(),
                    path,
                    valid: false,
                    reason: outcome.reason,
                },
            }
        }
    }

    fn finish(&self, entries: Vec<ArchiveEntry>, manifest: ArchiveManifest) -> Result<Package, AudioError> {
        let bytes = build_archive(&entries)?;
        let checksum = sha256_hex(&bytes);
        Ok(Package {
            bytes,
            manifest,
            checksum,
        })
    }
}

/// Keep the first capture per word; later ones would collide on path.
fn dedupe(captures: &[CaptureRecord]) -> Vec<&CaptureRecord> {
    let mut seen = HashSet::new();
    captures
        .iter()
        .filter(|c| {
            let first = seen.insert(c.word_id.clone());
            if !first {
                log::warn!("Duplicate capture for {} ignored", c.word_id);
            }
            first
        })
        .collect()
}

fn manifest_entry(entry: &ArchiveEntry, kind: EntryKind, word_id: Option<&str>, reason: Option<&str>) -> ManifestEntry {
    ManifestEntry {
        path: entry.path.clone(),
        kind,
        size: entry.data.len(),
        crc32: crc32::checksum(&entry.data),
        word_id: word_id.map(str::to_string),
        reason: reason.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::PcmBuffer;
    use crate::processing::wav_format;
    use crate::storage::kv_store::MemoryStore;
    use crate::storage::metadata::parse_manifest;

    fn speech(seed: f32) -> Vec<u8> {
        let samples = (0..4000).map(|i| (i as f32 * seed).sin() * 0.5).collect();
        wav_format::encode(&PcmBuffer::mono(samples, 8000).unwrap()).unwrap()
    }

    fn words() -> Vec<WordEntry> {
        vec![
            WordEntry::new("w1", "আমি", "I"),
            WordEntry::new("w2", "তুমি", "you"),
            WordEntry::new("w3", "সে", "he/she"),
        ]
    }

    /// Entry paths in archive order, read from the central directory.
    fn archive_paths(bytes: &[u8]) -> Vec<String> {
        let eocd = bytes.len() - 22;
        let count = u16::from_le_bytes([bytes[eocd + 10], bytes[eocd + 11]]) as usize;
        let mut at = u32::from_le_bytes([bytes[eocd + 16], bytes[eocd + 17], bytes[eocd + 18], bytes[eocd + 19]]) as usize;
        let mut paths = Vec::new();
        for _ in 0..count {
            let name_len = u16::from_le_bytes([bytes[at + 28], bytes[at + 29]]) as usize;
            paths.push(String::from_utf8(bytes[at + 46..at + 46 + name_len].to_vec()).unwrap());
            at += 46 + name_len;
        }
        paths
    }

    /// Payload of the entry named `path`, located through the central directory.
    fn archive_payload<'a>(bytes: &'a [u8], path: &str) -> &'a [u8] {
        let eocd = bytes.len() - 22;
        let count = u16::from_le_bytes([bytes[eocd + 10], bytes[eocd + 11]]) as usize;
        let mut at = u32::from_le_bytes([bytes[eocd + 16], bytes[eocd + 17], bytes[eocd + 18], bytes[eocd + 19]]) as usize;
        for _ in 0..count {
            let size = u32::from_le_bytes([bytes[at + 24], bytes[at + 25], bytes[at + 26], bytes[at + 27]]) as usize;
            let name_len = u16::from_le_bytes([bytes[at + 28], bytes[at + 29]]) as usize;
            let offset = u32::from_le_bytes([bytes[at + 42], bytes[at + 43], bytes[at + 44], bytes[at + 45]]) as usize;
            if &bytes[at + 46..at + 46 + name_len] == path.as_bytes() {
                let local_name_len = u16::from_le_bytes([bytes[offset + 26], bytes[offset + 27]]) as usize;
                let start = offset + 30 + local_name_len;
                return &bytes[start..start + size];
            }
            at += 46 + name_len;
        }
        panic!("{} not in archive", path);
    }

    #[test]
    fn assembles_in_fixed_order() {
        let captures = vec![
            CaptureRecord::new("w2", speech(0.1)),
            CaptureRecord::new("w1", vec![0u8; 200]),
            CaptureRecord::new("w3", speech(0.2)),
        ];
        let package = PackageAssembler::with_defaults().assemble(&captures, &words()).unwrap();

        assert_eq!(
            archive_paths(&package.bytes),
            vec![
                "README.md",
                "word_list.csv",
                "anki_template.txt",
                "manifest.json",
                "audio/w2.wav",
                "audio/INVALID_w1.txt",
                "audio/w3.wav",
                "AUDIO_VALIDATION_REPORT.md",
            ]
        );
        assert_eq!(package.manifest.summary_line(), "2 valid, 1 invalid, 66.7% success rate");
        assert_eq!(package.checksum, sha256_hex(&package.bytes));
        assert_eq!(package.file_name(), "vocabulary_audio_collection.zip");
        // Manifest lists every entry except itself.
        assert_eq!(package.manifest.entries.len(), 7);
        assert_eq!(package.manifest.audio_entries().count(), 2);
        assert_eq!(package.manifest.placeholder_entries().count(), 1);
    }

    #[test]
    fn embedded_manifest_matches_returned_manifest() {
        let captures = vec![CaptureRecord::new("w1", speech(0.1))];
        let package = PackageAssembler::with_defaults().assemble(&captures, &words()).unwrap();

        let json = std::str::from_utf8(archive_payload(&package.bytes, "manifest.json")).unwrap();
        assert_eq!(parse_manifest(json).unwrap(), package.manifest);

        let csv = std::str::from_utf8(archive_payload(&package.bytes, "word_list.csv")).unwrap();
        assert_eq!(csv, "Translation,Source,Audio\n\"আমি\",\"I\",\"[sound:w1.wav]\"");
    }

    #[test]
    fn capture_without_word_gets_error_placeholder() {
        let captures = vec![
            CaptureRecord::new("w1", speech(0.1)),
            CaptureRecord::new("ghost", speech(0.2)),
        ];
        let package = PackageAssembler::with_defaults().assemble(&captures, &words()).unwrap();
        assert!(archive_paths(&package.bytes).contains(&"audio/ERROR_ghost.txt".to_string()));
        assert_eq!(package.manifest.invalid_count, 1);
    }

    #[test]
    fn unsafe_word_ids_become_safe_paths() {
        let words = vec![
            WordEntry::new("w1\\a", "আমি", "I"),
            WordEntry::new("../x", "তুমি", "you"),
        ];
        let captures = vec![
            CaptureRecord::new("w1\\a", speech(0.1)),
            CaptureRecord::new("../x", speech(0.2)),
        ];
        let package = PackageAssembler::with_defaults().assemble(&captures, &words).unwrap();

        let paths = archive_paths(&package.bytes);
        assert!(paths.contains(&"audio/w1%5Ca.wav".to_string()));
        assert!(paths.contains(&"audio/..%2Fx.wav".to_string()));
        assert_eq!(package.manifest.valid_count, 2);

        let csv = std::str::from_utf8(archive_payload(&package.bytes, "word_list.csv")).unwrap();
        assert!(csv.contains("\"[sound:w1%5Ca.wav]\""));
        assert!(csv.contains("\"[sound:..%2Fx.wav]\""));
    }

    #[test]
    fn no_valid_capture_is_archive_empty() {
        let captures = vec![CaptureRecord::new("w1", vec![0u8; 10])];
        let err = PackageAssembler::with_defaults().assemble(&captures, &words()).unwrap_err();
        assert_eq!(err, AudioError::ArchiveEmpty);
        assert!(err.is_user_facing());
        assert_eq!(
            PackageAssembler::with_defaults().assemble(&[], &words()).unwrap_err(),
            AudioError::ArchiveEmpty
        );
    }

    #[test]
    fn duplicate_captures_keep_first() {
        let first = speech(0.1);
        let captures = vec![CaptureRecord::new("w1", first), CaptureRecord::new("w1", speech(0.3))];
        let package = PackageAssembler::with_defaults().assemble(&captures, &words()).unwrap();
        assert_eq!(package.manifest.total_count(), 1);
    }

    #[test]
    fn audio_only_contains_valid_audio() {
        let captures = vec![
            CaptureRecord::new("w1", speech(0.1)),
            CaptureRecord::new("w2", vec![1u8; 50]),
        ];
        let package = PackageAssembler::with_defaults()
            .assemble_audio_only(&captures, &words())
            .unwrap();
        assert_eq!(archive_paths(&package.bytes), vec!["audio/w1.wav"]);
        assert_eq!(package.manifest.invalid_count, 1);
    }

    #[test]
    fn assembles_from_store() {
        use crate::models::recording_result::{CaptureId, ProcessedMetadata, ProcessedResult};

        let store = MemoryStore::new();
        for (word, seed) in [("w1", 0.1), ("w3", 0.2)] {
            let bytes = speech(seed);
            let capture_id = CaptureId::new(word, 1);
            let metadata = ProcessedMetadata::new(&capture_id, 0.5, 8000, 1, bytes.len(), "", None, Vec::new(), true);
            let result = ProcessedResult {
                capture_id,
                bytes,
                trim_window: None,
                trim_report: None,
                is_valid: true,
                diagnostics: String::new(),
                applied_stages: Vec::new(),
                fallbacks: Vec::new(),
                metadata,
            };
            recordings::save_recording(&store, &result).unwrap();
        }

        let options = PackageOptions {
            deck_name: "Bangla Basics".into(),
        };
        let package = PackageAssembler::new(Arc::new(WavDecoder::new()), options)
            .assemble_from_store(&store, &words())
            .unwrap();
        assert_eq!(package.manifest.summary_line(), "2 valid, 0 invalid, 100.0% success rate");
        assert_eq!(package.file_name(), "bangla_basics.zip");
    }

    #[test]
    fn save_writes_bytes() {
        let captures = vec![CaptureRecord::new("w1", speech(0.1))];
        let package = PackageAssembler::with_defaults().assemble(&captures, &words()).unwrap();
        let path = std::env::temp_dir()
            .join(format!("vocab_audio_pkg_{}", uuid::Uuid::new_v4()))
            .join(package.file_name());
        package.save(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), package.bytes);
        fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
