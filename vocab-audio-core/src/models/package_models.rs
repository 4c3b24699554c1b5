use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the word list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub id: String,
    /// The vocabulary item as spoken in the recording.
    pub translation: String,
    /// The source-language text it translates.
    pub source: String,
}

impl WordEntry {
    pub fn new(id: impl Into<String>, translation: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            translation: translation.into(),
            source: source.into(),
        }
    }

    /// Anki-style audio reference, `[sound:<stem>.wav]`.
    pub fn audio_tag(&self) -> String {
        format!("[sound:{}.wav]", file_stem(&self.id))
    }
}

/// Word id as a single archive path segment.
///
/// Letters, digits, `-`, `_` and `.` are kept; every other byte is
/// percent-encoded, so distinct ids keep distinct stems and none contains a
/// separator. A stem made only of dots is encoded too.
pub fn file_stem(word_id: &str) -> String {
    let mut stem = String::with_capacity(word_id.len());
    for c in word_id.chars() {
        if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
            stem.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                stem.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    if stem.chars().all(|c| c == '.') {
        stem = stem.replace('.', "%2E");
    }
    stem
}

/// A stored recording handed to the package exporter.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRecord {
    pub word_id: String,
    pub bytes: Vec<u8>,
    pub recorded_at: Option<DateTime<Utc>>,
}

impl CaptureRecord {
    pub fn new(word_id: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            word_id: word_id.into(),
            bytes,
            recorded_at: None,
        }
    }

    pub fn recorded_at(mut self, at: DateTime<Utc>) -> Self {
        self.recorded_at = Some(at);
        self
    }
}

/// Role of an archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Document,
    Audio,
    Placeholder,
}

/// Manifest line for one archive entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub path: String,
    pub kind: EntryKind,
    pub size: usize,
    pub crc32: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Validation verdict for one capture, as listed in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureVerdict {
    pub word_id: String,
    pub path: String,
    pub valid: bool,
    pub reason: String,
}

/// Everything written into one exported archive, in archive order, plus
/// validation counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveManifest {
    pub deck_name: String,
    pub created_at: String,
    pub entries: Vec<ManifestEntry>,
    pub verdicts: Vec<CaptureVerdict>,
    pub valid_count: usize,
    pub invalid_count: usize,
}

impl ArchiveManifest {
    pub fn total_count(&self) -> usize {
        self.valid_count + self.invalid_count
    }

    /// Percentage of captures that validated, 0.0 when there were none.
    pub fn success_rate(&self) -> f64 {
        if self.total_count() == 0 {
            return 0.0;
        }
        self.valid_count as f64 * 100.0 / self.total_count() as f64
    }

    /// `"<v> valid, <i> invalid, <p>% success rate"`, rate to one decimal.
    pub fn summary_line(&self) -> String {
        format!(
            "{} valid, {} invalid, {:.1}% success rate",
            self.valid_count,
            self.invalid_count,
            self.success_rate()
        )
    }

    pub fn audio_entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::Audio)
    }

    pub fn placeholder_entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::Placeholder)
    }
}
