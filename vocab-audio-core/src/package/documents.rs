//! Text documents bundled with an exported package.

use chrono::{DateTime, Utc};

use crate::models::config::{MIN_CONTENT_PERCENT, NOISE_FLOOR};
use crate::models::package_models::{file_stem, ArchiveManifest, CaptureVerdict, WordEntry};

pub const README_PATH: &str = "README.md";
pub const WORD_LIST_PATH: &str = "word_list.csv";
pub const TEMPLATE_PATH: &str = "anki_template.txt";
pub const MANIFEST_PATH: &str = "manifest.json";
pub const REPORT_PATH: &str = "AUDIO_VALIDATION_REPORT.md";

pub const CSV_HEADER: &str = "Translation,Source,Audio";

pub fn audio_path(word_id: &str) -> String {
    format!("audio/{}.wav", file_stem(word_id))
}

pub fn invalid_path(word_id: &str) -> String {
    format!("audio/INVALID_{}.txt", file_stem(word_id))
}

pub fn error_path(word_id: &str) -> String {
    format!("audio/ERROR_{}.txt", file_stem(word_id))
}

/// Deck name as a file stem: lowercase, whitespace runs replaced by `_`.
pub fn slug(deck_name: &str) -> String {
    deck_name
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Quote a CSV field, doubling embedded quotes.
fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// One row per word: translation, source, audio tag. Header row first.
pub fn word_list_csv(words: &[&WordEntry]) -> String {
    let mut csv = String::from(CSV_HEADER);
    for word in words {
        csv.push('\n');
        csv.push_str(&csv_field(&word.translation));
        csv.push(',');
        csv.push_str(&csv_field(&word.source));
        csv.push(',');
        csv.push_str(&csv_field(&word.audio_tag()));
    }
    csv
}

pub fn readme(deck_name: &str, words: &[&WordEntry], audio_count: usize, generated_at: DateTime<Utc>) -> String {
    let mut doc = format!(
        "# {deck}\n\n\
         Generated on: {date}\n\
         Total recordings: {total}\n\n\
         ## Contents\n\n\
         - **{audio} audio files** in the `audio/` folder\n\
         - **{csv}**: word list with translations and audio tags\n\
         - **{template}**: card template for the note type\n\
         - **{manifest}**: machine-readable list of every entry\n\
         - **{report}**: per-recording validation results\n\n\
         Every file under `audio/` is 16-bit PCM WAV and passed validation \
         (not silent, at least {percent}% audible content).\n\n\
         ## Importing into Anki\n\n\
         1. Extract this archive.\n\
         2. Create a deck named \"{deck}\".\n\
         3. Create a note type with the fields Translation, Source, Audio and \
         paste the templates from `{template}`.\n\
         4. Import `{csv}`, mapping field 1 to Translation, field 2 to Source \
         and field 3 to Audio.\n\
         5. Copy the files from `audio/` into the profile's `collection.media` folder:\n\
         \x20  - Windows: `%APPDATA%\\Anki2\\<Profile>\\collection.media`\n\
         \x20  - macOS: `~/Library/Application Support/Anki2/<Profile>/collection.media`\n\
         \x20  - Linux: `~/.local/share/Anki2/<Profile>/collection.media`\n\n\
         ## Audio Files\n\n",
        deck = deck_name,
        date = generated_at.format("%Y-%m-%d"),
        total = words.len(),
        audio = audio_count,
        csv = WORD_LIST_PATH,
        template = TEMPLATE_PATH,
        manifest = MANIFEST_PATH,
        report = REPORT_PATH,
        percent = MIN_CONTENT_PERCENT,
    );
    for word in words {
        doc.push_str(&format!("- `{}.wav`: {} ({})\n", file_stem(&word.id), word.translation, word.source));
    }
    doc.push_str(&format!(
        "\n## File Structure\n\n```text\n{}/\n├── {}\n├── {}\n├── {}\n├── {}\n├── {}\n└── audio/\n```\n\n\
         If a recording does not play, check `{}` and re-record the word.\n",
        slug(deck_name),
        README_PATH,
        WORD_LIST_PATH,
        TEMPLATE_PATH,
        MANIFEST_PATH,
        REPORT_PATH,
        REPORT_PATH,
    ));
    doc
}

pub fn anki_template() -> &'static str {
    r#"# Anki Card Template

Use these templates for a note type with the fields Translation, Source, Audio.

## Front Template
```html
<div class="translation">{{Translation}}</div>
<div class="audio">{{Audio}}</div>
```

## Back Template
```html
{{FrontSide}}

<hr id="answer">

<div class="source">{{Source}}</div>
```

## Styling
```css
.card {
  font-family: arial;
  font-size: 20px;
  text-align: center;
  color: black;
  background-color: white;
  padding: 20px;
}

.translation {
  font-size: 2.5em;
  font-weight: bold;
  margin-bottom: 20px;
}

.source {
  font-size: 1.5em;
  margin-top: 15px;
}

.audio {
  margin: 20px 0;
}
```
"#
}

/// Markdown report listing every capture's verdict.
pub fn validation_report(manifest: &ArchiveManifest, generated_at: DateTime<Utc>) -> String {
    let mut doc = format!(
        "# Audio Validation Report\n\n\
         Generated: {}\n\
         Total Files Processed: {}\n\
         Valid Audio Files: {}\n\
         Invalid Audio Files: {}\n\
         Success Rate: {:.1}%\n\n\
         ## Summary\n\n{}\n\n",
        generated_at.to_rfc3339(),
        manifest.total_count(),
        manifest.valid_count,
        manifest.invalid_count,
        manifest.success_rate(),
        manifest.summary_line(),
    );
    if manifest.invalid_count == 0 {
        doc.push_str("All audio files passed validation and are included in the package.\n\n");
    } else {
        doc.push_str(&format!(
            "{} audio files failed validation and were replaced by placeholders.\n\n",
            manifest.invalid_count
        ));
    }

    doc.push_str("## Detailed Results\n\n");
    let (valid, invalid): (Vec<&CaptureVerdict>, Vec<&CaptureVerdict>) =
        manifest.verdicts.iter().partition(|v| v.valid);
    for (title, verdicts) in [("Valid Audio Files", valid), ("Invalid Audio Files", invalid)] {
        if verdicts.is_empty() {
            continue;
        }
        doc.push_str(&format!("### {}\n\n", title));
        for verdict in verdicts {
            doc.push_str(&format!("- **{}**: {}\n", verdict.path, verdict.reason));
        }
        doc.push('\n');
    }

    doc.push_str(&format!(
        "## Technical Details\n\n\
         - Audio format: WAV (16-bit PCM)\n\
         - Minimum payload size: checked before decoding\n\
         - Minimum audio content: {}% non-silent samples\n\
         - Minimum amplitude: {} (to tell audio from silence)\n",
        MIN_CONTENT_PERCENT, NOISE_FLOOR
    ));
    doc
}

/// Placeholder for a capture whose audio failed validation.
pub fn invalid_placeholder(word: &WordEntry, reason: &str, recorded_at: Option<DateTime<Utc>>) -> String {
    placeholder(
        "Invalid Audio File",
        &audio_path(&word.id),
        &format!("{} ({})", word.translation, word.source),
        reason,
        recorded_at,
        "This audio file was invalid and could not be included in the package.",
    )
}

/// Placeholder for a capture that could not be processed at all.
pub fn error_placeholder(word_id: &str, reason: &str, recorded_at: Option<DateTime<Utc>>) -> String {
    placeholder(
        "Audio Processing Error",
        &audio_path(word_id),
        word_id,
        reason,
        recorded_at,
        "This audio file could not be processed and was not included in the package.",
    )
}

fn placeholder(
    title: &str,
    path: &str,
    word: &str,
    reason: &str,
    recorded_at: Option<DateTime<Utc>>,
    footer: &str,
) -> String {
    let timestamp = recorded_at.map_or_else(|| "unknown".to_string(), |at| at.to_rfc3339());
    format!(
        "# {}\n\nFile: {}\nWord: {}\nError: {}\nTimestamp: {}\n\n{}\n",
        title, path, word, reason, timestamp, footer
    )
}
