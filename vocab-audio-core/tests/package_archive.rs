use std::sync::Arc;

use vocab_audio_core::processing::wav_format;
use vocab_audio_core::storage::recordings;
use vocab_audio_core::storage::zip_writer::write_archive_file;
use vocab_audio_core::{
    build_archive, ArchiveEntry, AudioError, CaptureRecord, DirectoryStore, MemoryStore, PackageAssembler,
    PackageOptions, PcmBuffer, PipelineOrchestrator, ProcessingSettings, WavDecoder, WordEntry, ZipWriter,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Bitwise CRC-32, independent of the crate's table-driven one.
fn reference_crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
        }
    }
    !crc
}

fn u16_at(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[derive(Debug)]
struct ParsedEntry {
    name: String,
    crc: u32,
    data: Vec<u8>,
}

/// Minimal store-only ZIP reader: EOCD → central directory → local headers.
/// Panics on anything a conforming reader would reject.
fn read_zip(bytes: &[u8]) -> Vec<ParsedEntry> {
    let eocd = bytes.len() - 22;
    assert_eq!(u32_at(bytes, eocd), 0x0605_4b50, "end of central directory");
    assert_eq!(u16_at(bytes, eocd + 4), 0);
    assert_eq!(u16_at(bytes, eocd + 6), 0);
    let count = u16_at(bytes, eocd + 10) as usize;
    assert_eq!(u16_at(bytes, eocd + 8) as usize, count);
    let cd_size = u32_at(bytes, eocd + 12) as usize;
    let cd_offset = u32_at(bytes, eocd + 16) as usize;
    assert_eq!(cd_offset + cd_size, eocd);
    assert_eq!(u16_at(bytes, eocd + 20), 0);

    let mut entries = Vec::new();
    let mut at = cd_offset;
    for _ in 0..count {
        assert_eq!(u32_at(bytes, at), 0x0201_4b50, "central header");
        assert_eq!(u16_at(bytes, at + 10), 0, "stored");
        let crc = u32_at(bytes, at + 16);
        let compressed = u32_at(bytes, at + 20) as usize;
        let size = u32_at(bytes, at + 24) as usize;
        assert_eq!(compressed, size);
        let name_len = u16_at(bytes, at + 28) as usize;
        let local = u32_at(bytes, at + 42) as usize;
        let name = String::from_utf8(bytes[at + 46..at + 46 + name_len].to_vec()).unwrap();

        assert_eq!(u32_at(bytes, local), 0x0403_4b50, "local header");
        assert_eq!(u32_at(bytes, local + 14), crc);
        assert_eq!(u32_at(bytes, local + 22) as usize, size);
        assert_eq!(u16_at(bytes, local + 26) as usize, name_len);
        let extra = u16_at(bytes, local + 28) as usize;
        assert_eq!(&bytes[local + 30..local + 30 + name_len], name.as_bytes());
        let start = local + 30 + name_len + extra;

        entries.push(ParsedEntry {
            name,
            crc,
            data: bytes[start..start + size].to_vec(),
        });
        at += 46 + name_len;
    }
    assert_eq!(at, eocd);
    entries
}

fn speech(frames: usize, freq: f32) -> Vec<u8> {
    let samples = (0..frames)
        .map(|i| (i as f32 * freq * std::f32::consts::TAU / 8000.0).sin() * 0.5)
        .collect();
    wav_format::encode(&PcmBuffer::mono(samples, 8000).unwrap()).unwrap()
}

fn words() -> Vec<WordEntry> {
    vec![
        WordEntry::new("w1", "জল", "water"),
        WordEntry::new("w2", "ভাত", "rice"),
        WordEntry::new("w3", "বই", "book"),
    ]
}

#[test]
fn archive_parses_back_to_input() {
    let inputs = vec![
        ArchiveEntry::text("README.md", "# Deck\n"),
        ArchiveEntry::new("empty.bin", Vec::new()),
        ArchiveEntry::new("audio/w1.wav", speech(2000, 220.0)),
        ArchiveEntry::text("notes/ünïcode.txt", "বাংলা"),
    ];
    let bytes = build_archive(&inputs).unwrap();
    let parsed = read_zip(&bytes);

    assert_eq!(parsed.len(), inputs.len());
    for (input, entry) in inputs.iter().zip(&parsed) {
        assert_eq!(entry.name, input.path);
        assert_eq!(entry.data, input.data);
        assert_eq!(entry.crc, reference_crc32(&input.data));
    }
}

#[test]
fn archive_bytes_are_reproducible() {
    let inputs = vec![
        ArchiveEntry::text("a.txt", "one"),
        ArchiveEntry::text("b.txt", "two"),
    ];
    assert_eq!(build_archive(&inputs).unwrap(), build_archive(&inputs).unwrap());

    let mut writer = ZipWriter::new(Vec::new());
    for entry in &inputs {
        writer.add(entry).unwrap();
    }
    assert_eq!(writer.entry_count(), 2);
    assert_eq!(writer.finish().unwrap(), build_archive(&inputs).unwrap());
}

#[test]
fn empty_archive_is_just_eocd() {
    let bytes = build_archive(&[]).unwrap();
    assert_eq!(bytes.len(), 22);
    assert!(read_zip(&bytes).is_empty());
}

#[test]
fn duplicate_paths_are_rejected() {
    let inputs = vec![ArchiveEntry::text("a.txt", "1"), ArchiveEntry::text("a.txt", "2")];
    assert_eq!(
        build_archive(&inputs).unwrap_err(),
        AudioError::DuplicateEntry("a.txt".into())
    );
}

#[test]
fn archive_file_checksum_matches_contents() {
    let path = std::env::temp_dir()
        .join(format!("vocab_audio_it_{}", uuid::Uuid::new_v4()))
        .join("deck.zip");
    let inputs = vec![ArchiveEntry::text("a.txt", "hello")];
    let checksum = write_archive_file(&path, &inputs).unwrap();
    let written = std::fs::read(&path).unwrap();
    assert_eq!(written, build_archive(&inputs).unwrap());
    assert_eq!(checksum.len(), 64);
    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[test]
fn three_captures_one_undecodable() {
    init_logging();
    let captures = vec![
        CaptureRecord::new("w1", speech(4000, 200.0)),
        CaptureRecord::new("w2", vec![0x5A; 3000]),
        CaptureRecord::new("w3", speech(6000, 300.0)),
    ];
    let package = PackageAssembler::with_defaults().assemble(&captures, &words()).unwrap();
    let entries = read_zip(&package.bytes);

    let audio: Vec<&ParsedEntry> = entries.iter().filter(|e| e.name.ends_with(".wav")).collect();
    assert_eq!(audio.len(), 2);
    assert_eq!(audio[0].name, "audio/w1.wav");
    assert_eq!(audio[0].data, captures[0].bytes);
    assert_eq!(audio[1].name, "audio/w3.wav");

    let placeholders: Vec<&ParsedEntry> = entries.iter().filter(|e| e.name.starts_with("audio/INVALID_")).collect();
    assert_eq!(placeholders.len(), 1);
    assert_eq!(placeholders[0].name, "audio/INVALID_w2.txt");
    let text = String::from_utf8(placeholders[0].data.clone()).unwrap();
    assert!(text.contains("failed to decode"));

    let report = entries.iter().find(|e| e.name == "AUDIO_VALIDATION_REPORT.md").unwrap();
    let report = String::from_utf8(report.data.clone()).unwrap();
    assert!(report.contains("2 valid, 1 invalid, 66.7% success rate"));
    assert!(report.contains("Total Files Processed: 3"));

    assert_eq!(entries.first().unwrap().name, "README.md");
    assert_eq!(entries.last().unwrap().name, "AUDIO_VALIDATION_REPORT.md");
    for entry in &entries {
        assert_eq!(entry.crc, reference_crc32(&entry.data));
    }

    let csv = entries.iter().find(|e| e.name == "word_list.csv").unwrap();
    let csv = String::from_utf8(csv.data.clone()).unwrap();
    assert_eq!(csv.lines().count(), 4);
    assert!(csv.contains("\"জল\",\"water\",\"[sound:w1.wav]\""));
}

#[test]
fn recorded_words_flow_into_package() {
    init_logging();
    let dir = std::env::temp_dir().join(format!("vocab_audio_store_it_{}", uuid::Uuid::new_v4()));
    let store = Arc::new(DirectoryStore::open(&dir).unwrap());

    let mut pipeline = PipelineOrchestrator::with_defaults();
    pipeline.set_store(store.clone());
    let settings = ProcessingSettings::default();
    settings.save(store.as_ref()).unwrap();
    let loaded = ProcessingSettings::load(store.as_ref());
    assert_eq!(loaded, settings);

    for (word, freq) in [("w1", 200.0), ("w3", 300.0)] {
        let samples: Vec<f32> = (0..16000)
            .map(|i| {
                if (6000..10000).contains(&i) {
                    (i as f32 * freq * std::f32::consts::TAU / 8000.0).sin() * 0.5
                } else {
                    0.0
                }
            })
            .collect();
        let capture = wav_format::encode(&PcmBuffer::mono(samples, 8000).unwrap()).unwrap();
        let id = pipeline.begin_capture(word);
        let outcome = pipeline.process(&id, &capture, &loaded).unwrap();
        assert!(!outcome.is_stale());
        assert!(outcome.result().trim_window.is_some());
    }

    let words_recorded = recordings::recorded_words(store.as_ref()).unwrap();
    assert_eq!(words_recorded.into_iter().collect::<Vec<_>>(), vec!["w1", "w3"]);

    let assembler = PackageAssembler::new(
        Arc::new(WavDecoder::new()),
        PackageOptions {
            deck_name: "Kitchen Words".into(),
        },
    );
    let package = assembler.assemble_from_store(store.as_ref(), &words()).unwrap();
    assert_eq!(package.manifest.summary_line(), "2 valid, 0 invalid, 100.0% success rate");
    assert_eq!(package.file_name(), "kitchen_words.zip");
    let names: Vec<String> = read_zip(&package.bytes).into_iter().map(|e| e.name).collect();
    assert!(names.contains(&"audio/w1.wav".to_string()));
    assert!(names.contains(&"audio/w3.wav".to_string()));

    let memory = MemoryStore::new();
    assert_eq!(
        assembler.assemble_from_store(&memory, &words()).unwrap_err(),
        AudioError::ArchiveEmpty
    );

    std::fs::remove_dir_all(&dir).ok();
}
