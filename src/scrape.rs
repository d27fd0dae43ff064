// File: scrape.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::cache::CacheStore;
use crate::config::ConfigParameter;
use crate::dataset::{Baseline, DatasetWriter};
use crate::errors::ScrapeResult;
use crate::fetcher::Fetch;
use crate::parser::{Entry, Listing};
use crate::record::EnforcementRecord;
use crate::resolver::{plan_filenames, DocumentResolver};
use crate::summary::RunSummary;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::collections::{BTreeMap, HashSet};

/// One pass of listing -> records -> PDFs -> metadata -> cache.
pub struct Scraper<'a, F: Fetch> {
    fetcher: F,
    config: &'a ConfigParameter,
    cache: &'a mut CacheStore,
    writer: &'a DatasetWriter,
}

impl<'a, F: Fetch> Scraper<'a, F> {
    pub fn new(
        fetcher: F,
        config: &'a ConfigParameter,
        cache: &'a mut CacheStore,
        writer: &'a DatasetWriter,
    ) -> Self {
        Self {
            fetcher,
            config,
            cache,
            writer,
        }
    }

    fn progress(&self, len: usize) -> ProgressBar {
        if self.config.quiet() {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::with_template("[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        pb
    }

    /// Collect every record from the listing. Of two records with the same
    /// identifier the later one is kept.
    fn collect(&self, summary: &mut RunSummary) -> ScrapeResult<Vec<EnforcementRecord>> {
        let mut records: BTreeMap<String, EnforcementRecord> = BTreeMap::new();
        let listing = Listing::new(&self.fetcher, self.config.list_url(), self.config.max_pages())?;

        for entry in listing {
            match entry? {
                Entry::Record(record) => {
                    if let Some(previous) = records.insert(record.id.clone(), record) {
                        info!(
                            "Duplicate listing entry {} ({}), keeping the later one",
                            previous.id, previous.page_url
                        );
                        summary.add_duplicate();
                    }
                }
                Entry::Skipped(e) => summary.add_problem(&e),
            }
        }

        Ok(records.into_values().collect())
    }

    /// Everything below the listing is best effort: a record that cannot be
    /// completed is counted and left out. Only the listing and the metadata
    /// documents can fail the run.
    pub fn run(&mut self, baseline: &Baseline) -> ScrapeResult<RunSummary> {
        let mut summary = RunSummary::new();
        summary.start();
        if let Some(e) = self.cache.corruption() {
            summary.add_cache_corruption(e);
        }

        let records = self.collect(&mut summary)?;
        info!("Found {} records", records.len());
        let filenames = plan_filenames(&records);

        let resolver = DocumentResolver::new(&self.fetcher, &*self.cache, self.writer, baseline);
        let pb = self.progress(records.len());
        let mut resolved = Vec::with_capacity(records.len());
        for record in &records {
            pb.set_message(record.organisation.clone());
            match resolver.resolve(record, &filenames[&record.id]) {
                Ok(done) => {
                    if done.fetched {
                        summary.add_download();
                    } else {
                        summary.add_cache_hit();
                    }
                    summary.add_file(done.file.clone());
                    resolved.push(done);
                }
                Err(e) => {
                    warn!("{}", e);
                    summary.add_problem(&e);
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        for file in self.writer.write(&resolved)? {
            summary.add_file(file);
        }
        summary.set_records(resolved.len());

        for done in &resolved {
            self.cache.record(&done.record.id, done.cache_entry.clone());
        }
        let listed: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        let pruned = self.cache.retain(|id| listed.contains(id));
        if pruned > 0 {
            info!("Dropped {} cache entries no longer listed", pruned);
        }
        if let Err(e) = self.cache.save() {
            warn!("Could not save cache {}: {}", self.cache.path().display(), e);
            summary.add_error(format!("cache not saved: {}", e));
        }

        summary.finish();
        Ok(summary)
    }
}
