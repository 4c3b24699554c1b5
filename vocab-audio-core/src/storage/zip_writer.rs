use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::models::error::AudioError;
use crate::processing::crc32;

const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIR_SIGNATURE: u32 = 0x0605_4b50;

/// Version 2.0: stored entries, no ZIP64.
const ZIP_VERSION: u16 = 20;
const METHOD_STORED: u16 = 0;

const LOCAL_HEADER_SIZE: usize = 30;
const CENTRAL_HEADER_SIZE: usize = 46;
const END_OF_CENTRAL_DIR_SIZE: usize = 22;

/// A named payload destined for an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Forward-slash separated path, unique within the archive.
    pub path: String,
    pub data: Vec<u8>,
}

impl ArchiveEntry {
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
        }
    }

    /// Entry holding UTF-8 text.
    pub fn text(path: impl Into<String>, content: &str) -> Self {
        Self::new(path, content.as_bytes().to_vec())
    }
}

/// Central directory record kept until `finish`.
struct CentralRecord {
    name: Vec<u8>,
    crc: u32,
    size: u32,
    local_header_offset: u32,
}

/// Streaming store-only ZIP writer.
///
/// ## Layout
///
/// ```text
/// [local header 1][name 1][data 1]
/// [local header 2][name 2][data 2]
/// ...
/// [central record 1][name 1] ... [central record n][name n]
/// [end of central directory]
/// ```
///
/// Entries are written in call order, uncompressed, with zeroed timestamps,
/// so identical input produces identical bytes.
pub struct ZipWriter<W: Write> {
    sink: W,
    records: Vec<CentralRecord>,
    paths: HashSet<String>,
    total_bytes_written: u64,
}

impl<W: Write> ZipWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            records: Vec::new(),
            paths: HashSet::new(),
            total_bytes_written: 0,
        }
    }

    /// Append one entry: local header, file name, raw payload.
    pub fn add_entry(&mut self, path: &str, data: &[u8]) -> Result<(), AudioError> {
        validate_path(path)?;
        if self.paths.contains(path) {
            return Err(AudioError::DuplicateEntry(path.to_string()));
        }
        if self.records.len() >= u16::MAX as usize {
            return Err(AudioError::ArchiveTooLarge(format!(
                "more than {} entries",
                u16::MAX
            )));
        }
        let size = u32::try_from(data.len())
            .map_err(|_| AudioError::ArchiveTooLarge(format!("{} exceeds 4 GiB", path)))?;
        let local_header_offset = u32::try_from(self.total_bytes_written)
            .map_err(|_| AudioError::ArchiveTooLarge(format!("{} starts beyond 4 GiB", path)))?;

        let name = path.as_bytes();
        let crc = crc32::checksum(data);

        let mut header = Vec::with_capacity(LOCAL_HEADER_SIZE + name.len());
        header.extend_from_slice(&LOCAL_HEADER_SIGNATURE.to_le_bytes());
        header.extend_from_slice(&ZIP_VERSION.to_le_bytes()); // version needed
        header.extend_from_slice(&0u16.to_le_bytes()); // flags
        header.extend_from_slice(&METHOD_STORED.to_le_bytes());
        header.extend_from_slice(&0u16.to_le_bytes()); // mod time
        header.extend_from_slice(&0u16.to_le_bytes()); // mod date
        header.extend_from_slice(&crc.to_le_bytes());
        header.extend_from_slice(&size.to_le_bytes()); // compressed
        header.extend_from_slice(&size.to_le_bytes()); // uncompressed
        header.extend_from_slice(&(name.len() as u16).to_le_bytes());
        header.extend_from_slice(&0u16.to_le_bytes()); // extra field length
        header.extend_from_slice(name);

        self.write_raw(&header)?;
        self.write_raw(data)?;

        log::debug!("Added archive entry {} ({} bytes, crc {:08x})", path, size, crc);

        self.paths.insert(path.to_string());
        self.records.push(CentralRecord {
            name: name.to_vec(),
            crc,
            size,
            local_header_offset,
        });
        Ok(())
    }

    pub fn add(&mut self, entry: &ArchiveEntry) -> Result<(), AudioError> {
        self.add_entry(&entry.path, &entry.data)
    }

    pub fn entry_count(&self) -> usize {
        self.records.len()
    }

    /// Total bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    /// Write the central directory and end record, returning the sink.
    pub fn finish(mut self) -> Result<W, AudioError> {
        let central_start = u32::try_from(self.total_bytes_written)
            .map_err(|_| AudioError::ArchiveTooLarge("central directory starts beyond 4 GiB".into()))?;

        let records = std::mem::take(&mut self.records);
        let mut central = Vec::new();
        for record in &records {
            central.extend_from_slice(&CENTRAL_HEADER_SIGNATURE.to_le_bytes());
            central.extend_from_slice(&ZIP_VERSION.to_le_bytes()); // version made by
            central.extend_from_slice(&ZIP_VERSION.to_le_bytes()); // version needed
            central.extend_from_slice(&0u16.to_le_bytes()); // flags
            central.extend_from_slice(&METHOD_STORED.to_le_bytes());
            central.extend_from_slice(&0u16.to_le_bytes()); // mod time
            central.extend_from_slice(&0u16.to_le_bytes()); // mod date
            central.extend_from_slice(&record.crc.to_le_bytes());
            central.extend_from_slice(&record.size.to_le_bytes());
            central.extend_from_slice(&record.size.to_le_bytes());
            central.extend_from_slice(&(record.name.len() as u16).to_le_bytes());
            central.extend_from_slice(&0u16.to_le_bytes()); // extra field length
            central.extend_from_slice(&0u16.to_le_bytes()); // comment length
            central.extend_from_slice(&0u16.to_le_bytes()); // disk number start
            central.extend_from_slice(&0u16.to_le_bytes()); // internal attributes
            central.extend_from_slice(&0u32.to_le_bytes()); // external attributes
            central.extend_from_slice(&record.local_header_offset.to_le_bytes());
            central.extend_from_slice(&record.name);
        }
        let central_size = u32::try_from(central.len())
            .map_err(|_| AudioError::ArchiveTooLarge("central directory exceeds 4 GiB".into()))?;
        if central_start.checked_add(central_size).is_none() {
            return Err(AudioError::ArchiveTooLarge("archive exceeds 4 GiB".into()));
        }
        self.write_raw(&central)?;

        let entry_count = records.len() as u16;
        let mut end = Vec::with_capacity(END_OF_CENTRAL_DIR_SIZE);
        end.extend_from_slice(&END_OF_CENTRAL_DIR_SIGNATURE.to_le_bytes());
        end.extend_from_slice(&0u16.to_le_bytes()); // this disk
        end.extend_from_slice(&0u16.to_le_bytes()); // disk with central directory
        end.extend_from_slice(&entry_count.to_le_bytes()); // entries on this disk
        end.extend_from_slice(&entry_count.to_le_bytes()); // total entries
        end.extend_from_slice(&central_size.to_le_bytes());
        end.extend_from_slice(&central_start.to_le_bytes());
        end.extend_from_slice(&0u16.to_le_bytes()); // comment length
        self.write_raw(&end)?;

        self.sink
            .flush()
            .map_err(|e| AudioError::StorageError(format!("flush failed: {}", e)))?;
        Ok(self.sink)
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), AudioError> {
        self.sink
            .write_all(data)
            .map_err(|e| AudioError::StorageError(format!("write failed: {}", e)))?;
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }
}

/// Paths must be relative, forward-slash separated, free of `.`/`..`
/// segments, and fit a 16-bit length.
fn validate_path(path: &str) -> Result<(), AudioError> {
    if path.is_empty() {
        return Err(AudioError::StorageError("archive path is empty".into()));
    }
    if path.starts_with('/') || path.contains('\\') {
        return Err(AudioError::StorageError(format!(
            "archive path must be relative with '/' separators: {}",
            path
        )));
    }
    if path.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(AudioError::StorageError(format!("archive path escapes its root: {}", path)));
    }
    if path.len() > u16::MAX as usize {
        return Err(AudioError::ArchiveTooLarge(format!("path of {} bytes", path.len())));
    }
    Ok(())
}

/// Build a complete archive in memory, entries in slice order.
pub fn build_archive(entries: &[ArchiveEntry]) -> Result<Vec<u8>, AudioError> {
    let capacity = entries
        .iter()
        .map(|e| LOCAL_HEADER_SIZE + CENTRAL_HEADER_SIZE + 2 * e.path.len() + e.data.len())
        .sum::<usize>()
        + END_OF_CENTRAL_DIR_SIZE;

    let mut writer = ZipWriter::new(Vec::with_capacity(capacity));
    for entry in entries {
        writer.add(entry)?;
    }
    writer.finish()
}

/// Write an archive to `path` and return the SHA-256 hex digest of the file.
pub fn write_archive_file(path: &Path, entries: &[ArchiveEntry]) -> Result<String, AudioError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AudioError::StorageError(format!("failed to create directory: {}", e)))?;
    }
    let file = File::create(path).map_err(|e| AudioError::StorageError(format!("failed to create file: {}", e)))?;

    let mut writer = ZipWriter::new(BufWriter::new(file));
    for entry in entries {
        writer.add(entry)?;
    }
    writer.finish()?;

    sha256_file(path)
}

/// Compute SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, AudioError> {
    let data =
        fs::read(path).map_err(|e| AudioError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    Ok(sha256_hex(&data))
}

/// SHA-256 hex digest of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data).iter().map(|b| format!("{:02x}", b)).collect()
}
