// File: summary.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::dataset::{DatasetFile, FileKind};
use crate::errors::ScrapeError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters for one scrape run. Non-fatal errors end up here instead of
/// being raised.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    records: usize,
    skipped: usize,
    failed: usize,
    duplicates: usize,
    cache_hits: usize,
    downloads: usize,
    cache_corrupted: bool,
    files: Vec<DatasetFile>,
    errors: Vec<String>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.start_time = Some(Utc::now());
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
        self.files.sort_by(|a, b| a.path.cmp(&b.path));
    }

    pub fn set_records(&mut self, records: usize) {
        self.records = records;
    }

    /// Records written to the dataset.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Counts a listing entry that could not be used. Parse problems are
    /// skips, anything else (detail page or PDF unreachable) is a failure.
    pub fn add_problem(&mut self, error: &ScrapeError) {
        match error {
            ScrapeError::PartialParse { .. } => self.skipped += 1,
            _ => self.failed += 1,
        }
        self.errors.push(error.to_string());
    }

    /// The cache file could not be read and the run started from nothing.
    pub fn add_cache_corruption(&mut self, error: &ScrapeError) {
        self.cache_corrupted = true;
        self.errors.push(error.to_string());
    }

    pub fn cache_corrupted(&self) -> bool {
        self.cache_corrupted
    }

    pub fn add_error(&mut self, message: String) {
        self.errors.push(message);
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn add_duplicate(&mut self) {
        self.duplicates += 1;
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn add_cache_hit(&mut self) {
        self.cache_hits += 1;
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits
    }

    pub fn add_download(&mut self) {
        self.downloads += 1;
    }

    pub fn downloads(&self) -> usize {
        self.downloads
    }

    pub fn add_file(&mut self, file: DatasetFile) {
        self.files.push(file);
    }

    pub fn files(&self) -> &[DatasetFile] {
        &self.files
    }

    pub fn documents(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.kind == FileKind::Document)
            .count()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn duration_ms(&self) -> Option<i64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}
