// File: cache.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::dataset::write_atomic;
use crate::errors::{ScrapeError, ScrapeResult};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const CACHE_VERSION: u32 = 1;

/// What a previous run knew about one fully processed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// SHA-256 of the PDF bytes.
    pub fingerprint: String,
    /// SHA-256 of the PDF URL, compared before any bytes are fetched.
    pub source: String,
    pub filename: String,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    entries: BTreeMap<String, CacheEntry>,
}

/// Durable identifier -> entry map kept in one JSON file.
///
/// Opened once per run, handed to the resolver, saved when the run has
/// written its output. Saving replaces the file atomically.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
    corruption: Option<ScrapeError>,
    dirty: bool,
}

impl CacheStore {
    /// Never fails: a missing file is an empty cache and an unreadable one
    /// is treated the same way, with the reason kept in `corruption()`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (entries, corruption) = match Self::read(&path) {
            Ok(entries) => (entries, None),
            Err(e) => {
                warn!("{}; starting with an empty cache", e);
                (BTreeMap::new(), Some(e))
            }
        };
        debug!("Cache {} holds {} entries", path.display(), entries.len());

        Self {
            path,
            entries,
            corruption,
            dirty: false,
        }
    }

    fn read(path: &Path) -> ScrapeResult<BTreeMap<String, CacheEntry>> {
        let corrupt = |reason: String| ScrapeError::CacheCorruption {
            path: path.to_path_buf(),
            reason,
        };

        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(corrupt(e.to_string())),
        };
        let file: CacheFile = serde_json::from_slice(&raw).map_err(|e| corrupt(e.to_string()))?;
        if file.version != CACHE_VERSION {
            return Err(corrupt(format!("unsupported version {}", file.version)));
        }
        Ok(file.entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn corruption(&self) -> Option<&ScrapeError> {
        self.corruption.as_ref()
    }

    pub fn lookup(&self, id: &str) -> Option<&CacheEntry> {
        self.entries.get(id)
    }

    /// Last write wins.
    pub fn record(&mut self, id: &str, entry: CacheEntry) {
        self.entries.insert(id.to_string(), entry);
        self.dirty = true;
    }

    /// Drop every entry whose identifier fails `keep`; returns how many went.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, _| keep(id));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    /// Forget everything and persist the empty store right away.
    pub fn clear(&mut self) -> ScrapeResult<()> {
        self.entries.clear();
        self.corruption = None;
        self.dirty = true;
        self.save()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&mut self) -> ScrapeResult<()> {
        if !self.dirty {
            return Ok(());
        }
        let file = CacheFile {
            version: CACHE_VERSION,
            entries: self.entries.clone(),
        };
        let mut bytes = serde_json::to_vec_pretty(&file)?;
        bytes.push(b'\n');
        write_atomic(&self.path, &bytes)?;
        self.dirty = false;
        debug!("Saved {} cache entries to {}", self.entries.len(), self.path.display());
        Ok(())
    }

    pub fn close(mut self) -> ScrapeResult<()> {
        self.save()
    }
}
