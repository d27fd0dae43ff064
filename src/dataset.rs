// File: dataset.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::errors::{ScrapeError, ScrapeResult};
use crate::record::{sha256_hex, EnforcementRecord};
use crate::resolver::ResolvedRecord;
use chrono::NaiveDate;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

pub const INDEX_FILE: &str = "index.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const PDF_DIR: &str = "pdfs";

#[cfg(unix)]
const PUBLISHED_MODE: u32 = 0o644;

/// Everything the writer owns below the dataset root.
const OWNED: [&str; 3] = [INDEX_FILE, METADATA_FILE, PDF_DIR];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Metadata,
    Document,
}

/// A file in the dataset tree, relative to the dataset root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetFile {
    pub kind: FileKind,
    pub path: PathBuf,
}

#[derive(Serialize)]
struct IndexRow<'a> {
    #[serde(flatten)]
    record: &'a EnforcementRecord,
    filename: &'a str,
    sha256: &'a str,
}

#[derive(Serialize)]
struct Index<'a> {
    records: Vec<IndexRow<'a>>,
}

#[derive(Serialize)]
struct Metadata {
    record_count: usize,
    latest_decision: Option<NaiveDate>,
    index_sha256: String,
}

/// Write `bytes` to a temporary sibling of `path`, then rename it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // temp files start out owner-only
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(PUBLISHED_MODE))?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> ScrapeResult<Vec<u8>> {
    let mut out = Vec::new();
    {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        value.serialize(&mut serializer)?;
    }
    out.push(b'\n');
    Ok(out)
}

#[derive(Debug, Clone)]
pub struct DatasetWriter {
    root: PathBuf,
}

impl DatasetWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pdf_path(&self, filename: &str) -> PathBuf {
        self.root.join(PDF_DIR).join(filename)
    }

    /// Move the previous output aside and leave an empty `pdfs/` behind.
    pub fn clear(&self) -> ScrapeResult<Baseline> {
        fs::create_dir_all(&self.root)?;
        let parent = match self.root.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let stash = tempfile::Builder::new()
            .prefix(".penalty-scrape-")
            .tempdir_in(parent)?;

        let mut baseline = Baseline {
            root: self.root.clone(),
            stash,
            moved: Vec::new(),
        };
        for name in OWNED {
            let from = self.root.join(name);
            if fs::symlink_metadata(&from).is_err() {
                continue;
            }
            if let Err(e) = fs::rename(&from, baseline.stash.path().join(name)) {
                // only part of the output was moved; nothing was written yet
                let undo = baseline.move_back();
                if let Err(undo) = baseline.settle(undo) {
                    warn!("Could not undo partial clear of {}: {}", self.root.display(), undo);
                }
                return Err(e.into());
            }
            baseline.moved.push(name);
        }

        if let Err(e) = fs::create_dir_all(self.root.join(PDF_DIR)) {
            if let Err(undo) = baseline.restore() {
                warn!("Could not undo clear of {}: {}", self.root.display(), undo);
            }
            return Err(e.into());
        }
        info!(
            "Cleared {} ({} previous artifacts set aside)",
            self.root.display(),
            baseline.moved.len()
        );
        Ok(baseline)
    }

    pub fn write_pdf(&self, filename: &str, bytes: &[u8]) -> ScrapeResult<DatasetFile> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(ScrapeError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to write PDF named '{}'", filename),
            )));
        }
        write_atomic(&self.pdf_path(filename), bytes)?;
        debug!("Wrote {} ({} bytes)", filename, bytes.len());
        Ok(DatasetFile {
            kind: FileKind::Document,
            path: Path::new(PDF_DIR).join(filename),
        })
    }

    /// Write `index.json` and `metadata.json` for `records`.
    ///
    /// Output depends only on the input: rows are sorted by identifier and no
    /// clock value is written, so the same records give the same bytes.
    pub fn write(&self, records: &[ResolvedRecord]) -> ScrapeResult<Vec<DatasetFile>> {
        fs::create_dir_all(&self.root)?;

        let mut rows: Vec<IndexRow> = records
            .iter()
            .map(|r| IndexRow {
                record: &r.record,
                filename: &r.filename,
                sha256: &r.fingerprint,
            })
            .collect();
        rows.sort_by(|a, b| a.record.id.cmp(&b.record.id));

        let index = to_json(&Index { records: rows })?;
        let metadata = to_json(&Metadata {
            record_count: records.len(),
            latest_decision: records.iter().map(|r| r.record.date).max(),
            index_sha256: sha256_hex(&index),
        })?;

        write_atomic(&self.root.join(INDEX_FILE), &index)?;
        write_atomic(&self.root.join(METADATA_FILE), &metadata)?;
        info!("Wrote metadata for {} records", records.len());

        Ok(vec![
            DatasetFile {
                kind: FileKind::Metadata,
                path: PathBuf::from(INDEX_FILE),
            },
            DatasetFile {
                kind: FileKind::Metadata,
                path: PathBuf::from(METADATA_FILE),
            },
        ])
    }
}

/// The previous run's output, held aside while a new run writes the tree.
///
/// `restore` puts it back, `discard` (or dropping) deletes it.
#[derive(Debug)]
pub struct Baseline {
    root: PathBuf,
    stash: TempDir,
    moved: Vec<&'static str>,
}

impl Baseline {
    /// A PDF from the previous run, if it had one under that name.
    pub fn pdf(&self, filename: &str) -> Option<PathBuf> {
        if !self.moved.contains(&PDF_DIR) {
            return None;
        }
        let path = self.stash.path().join(PDF_DIR).join(filename);
        path.is_file().then_some(path)
    }

    /// Number of top-level artifacts that existed before the run.
    pub fn len(&self) -> usize {
        self.moved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moved.is_empty()
    }

    /// Drop whatever this run wrote and move the previous output back.
    ///
    /// If that fails the stash directory is left on disk, with whatever was
    /// not moved back still inside it.
    pub fn restore(self) -> ScrapeResult<()> {
        let result = self.remove_current().and_then(|()| self.move_back());
        self.settle(result)
    }

    fn remove_current(&self) -> ScrapeResult<()> {
        for name in OWNED {
            let current = self.root.join(name);
            match fs::symlink_metadata(&current) {
                Ok(meta) if meta.is_dir() => fs::remove_dir_all(&current)?,
                Ok(_) => fs::remove_file(&current)?,
                Err(_) => {}
            }
        }
        Ok(())
    }

    fn move_back(&self) -> ScrapeResult<()> {
        for name in &self.moved {
            fs::rename(self.stash.path().join(name), self.root.join(name))?;
        }
        Ok(())
    }

    fn settle(self, result: ScrapeResult<()>) -> ScrapeResult<()> {
        match result {
            Ok(()) => {
                info!("Restored previous contents of {}", self.root.display());
                Ok(())
            }
            Err(e) => {
                let kept = self.stash.keep();
                error!(
                    "Could not restore {}: {}; previous output left in {}",
                    self.root.display(),
                    e,
                    kept.display()
                );
                Err(e)
            }
        }
    }

    pub fn discard(self) -> ScrapeResult<()> {
        self.stash.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");

        let leftovers = fs::read_dir(dir.path().join("a")).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_write_pdf_layout() {
        let dir = TempDir::new().unwrap();
        let writer = DatasetWriter::new(dir.path().join("data"));

        let file = writer.write_pdf("2020-01-01-acme.pdf", b"%PDF-1.4").unwrap();
        assert_eq!(file.kind, FileKind::Document);
        assert_eq!(file.path, Path::new("pdfs").join("2020-01-01-acme.pdf"));
        assert_eq!(fs::read(writer.pdf_path("2020-01-01-acme.pdf")).unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn test_write_pdf_rejects_paths() {
        let dir = TempDir::new().unwrap();
        let writer = DatasetWriter::new(dir.path());

        assert!(writer.write_pdf("../escape.pdf", b"x").is_err());
        assert!(writer.write_pdf("", b"x").is_err());
    }

    #[test]
    fn test_clear_and_restore_round_trip() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("data");
        let writer = DatasetWriter::new(&root);
        writer.write_pdf("old.pdf", b"old").unwrap();
        fs::write(root.join(INDEX_FILE), b"old index").unwrap();
        fs::write(root.join("README.md"), b"keep me").unwrap();

        let baseline = writer.clear().unwrap();
        assert_eq!(baseline.len(), 2);
        assert!(!root.join(INDEX_FILE).exists());
        assert!(root.join(PDF_DIR).is_dir());
        assert_eq!(fs::read_dir(root.join(PDF_DIR)).unwrap().count(), 0);
        assert!(root.join("README.md").exists());
        assert_eq!(fs::read(baseline.pdf("old.pdf").unwrap()).unwrap(), b"old");
        assert!(baseline.pdf("missing.pdf").is_none());

        writer.write_pdf("new.pdf", b"new").unwrap();
        fs::write(root.join(METADATA_FILE), b"half written run").unwrap();
        baseline.restore().unwrap();

        assert_eq!(fs::read(root.join(INDEX_FILE)).unwrap(), b"old index");
        assert!(!root.join(METADATA_FILE).exists());
        assert!(root.join(PDF_DIR).join("old.pdf").exists());
        assert!(!root.join(PDF_DIR).join("new.pdf").exists());
    }

    #[test]
    fn test_failed_restore_keeps_previous_output() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("data");
        let writer = DatasetWriter::new(&root);
        writer.write_pdf("old.pdf", b"old").unwrap();
        fs::write(root.join(INDEX_FILE), b"old index").unwrap();

        let baseline = writer.clear().unwrap();
        let stashed = baseline.pdf("old.pdf").unwrap();
        // nowhere to move things back to
        fs::remove_dir_all(&root).unwrap();

        assert!(baseline.restore().is_err());
        assert_eq!(fs::read(&stashed).unwrap(), b"old");
        assert_eq!(
            fs::read(stashed.parent().unwrap().parent().unwrap().join(INDEX_FILE)).unwrap(),
            b"old index"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_published_files_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let writer = DatasetWriter::new(dir.path());
        writer.write_pdf("a.pdf", b"%PDF").unwrap();
        writer.write(&[]).unwrap();

        for path in [
            writer.pdf_path("a.pdf"),
            dir.path().join(INDEX_FILE),
            dir.path().join(METADATA_FILE),
        ] {
            let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o644, "{}", path.display());
        }
    }

    #[test]
    fn test_discard_drops_previous_output() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("data");
        let writer = DatasetWriter::new(&root);
        writer.write_pdf("old.pdf", b"old").unwrap();

        let baseline = writer.clear().unwrap();
        let stash = baseline.pdf("old.pdf").unwrap();
        baseline.discard().unwrap();

        assert!(!stash.exists());
        assert!(!root.join(PDF_DIR).join("old.pdf").exists());
    }

    fn resolved(org: &str, day: u32) -> ResolvedRecord {
        let date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let pdf_url = format!("https://ico.org.uk/media/action-weve-taken/mpns/{}/x.pdf", day);
        let filename = format!("2024-01-{:02}-{}.pdf", day, org.to_lowercase());
        let fingerprint = sha256_hex(org.as_bytes());
        ResolvedRecord {
            record: EnforcementRecord {
                id: EnforcementRecord::derive_id(&pdf_url, date),
                organisation: org.to_string(),
                date,
                kind: None,
                penalty_amount: Some(1000 * u64::from(day)),
                sector: None,
                summary: None,
                source_id: Some(day.to_string()),
                page_url: "https://ico.org.uk/action-weve-taken/enforcement/x/".to_string(),
                pdf_url,
            },
            file: DatasetFile {
                kind: FileKind::Document,
                path: Path::new(PDF_DIR).join(&filename),
            },
            cache_entry: crate::cache::CacheEntry {
                fingerprint: fingerprint.clone(),
                source: String::new(),
                filename: filename.clone(),
                last_seen: chrono::Utc::now(),
            },
            filename,
            fingerprint,
            fetched: true,
        }
    }

    #[test]
    fn test_metadata_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let writer = DatasetWriter::new(dir.path());
        let records = vec![resolved("Acme", 3), resolved("Widget", 9)];

        let files = writer.write(&records).unwrap();
        assert_eq!(files.len(), 2);
        let index = fs::read(dir.path().join(INDEX_FILE)).unwrap();
        let metadata = fs::read(dir.path().join(METADATA_FILE)).unwrap();

        let reversed: Vec<ResolvedRecord> = records.into_iter().rev().collect();
        writer.write(&reversed).unwrap();
        assert_eq!(fs::read(dir.path().join(INDEX_FILE)).unwrap(), index);
        assert_eq!(fs::read(dir.path().join(METADATA_FILE)).unwrap(), metadata);

        let text = String::from_utf8(metadata).unwrap();
        assert!(text.starts_with("{\n    \"record_count\": 2,\n"));
        assert!(text.contains("\"latest_decision\": \"2024-01-09\""));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_clear_on_fresh_root() {
        let dir = TempDir::new().unwrap();
        let writer = DatasetWriter::new(dir.path().join("fresh"));

        let baseline = writer.clear().unwrap();
        assert!(baseline.is_empty());
        assert!(writer.root().join(PDF_DIR).is_dir());
        assert!(baseline.pdf("anything.pdf").is_none());
    }
}
