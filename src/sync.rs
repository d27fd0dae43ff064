// File: sync.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::cache::CacheStore;
use crate::config::ConfigParameter;
use crate::dataset::DatasetWriter;
use crate::errors::ScrapeError;
use crate::fetcher::Fetch;
use crate::repository::Repository;
use crate::scrape::Scraper;
use crate::summary::RunSummary;
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncState {
    Idle,
    CacheCleared,
    RepoSynced,
    OutputCleared,
    Scraped,
    Committed,
    Pushed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Idle => "idle",
            SyncState::CacheCleared => "cache-cleared",
            SyncState::RepoSynced => "repo-synced",
            SyncState::OutputCleared => "output-cleared",
            SyncState::Scraped => "scraped",
            SyncState::Committed => "committed",
            SyncState::Pushed => "pushed",
        };
        write!(f, "{}", name)
    }
}

/// A run that stopped while moving into `stage`.
#[derive(Debug)]
pub struct SyncFailure {
    pub stage: SyncState,
    pub error: ScrapeError,
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run failed at stage {}: {}", self.stage, self.error)
    }
}

impl std::error::Error for SyncFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

fn failed_at(stage: SyncState) -> impl FnOnce(ScrapeError) -> SyncFailure {
    move |error| SyncFailure { stage, error }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub summary: RunSummary,
    pub committed: bool,
    pub pushed: bool,
}

impl SyncReport {
    pub fn records(&self) -> usize {
        self.summary.records()
    }

    pub fn files(&self) -> usize {
        self.summary.files().len()
    }
}

/// Runs cache invalidation, checkout sync, output clearing, the scrape,
/// commit and push, in that order. Any failing step ends the run.
pub struct Orchestrator<'a, F: Fetch, R: Repository> {
    config: &'a ConfigParameter,
    fetcher: F,
    repository: R,
    cache: CacheStore,
    writer: DatasetWriter,
    state: SyncState,
    history: Vec<SyncState>,
}

impl<'a, F: Fetch, R: Repository> Orchestrator<'a, F, R> {
    pub fn new(config: &'a ConfigParameter, fetcher: F, repository: R, cache: CacheStore) -> Self {
        Self {
            config,
            fetcher,
            repository,
            cache,
            writer: DatasetWriter::new(config.dataset_dir()),
            state: SyncState::Idle,
            history: vec![SyncState::Idle],
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Every state entered so far, starting with `Idle`.
    pub fn history(&self) -> &[SyncState] {
        &self.history
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn into_cache(self) -> CacheStore {
        self.cache
    }

    fn enter(&mut self, state: SyncState) {
        debug!("{} -> {}", self.state, state);
        self.state = state;
        self.history.push(state);
    }

    pub fn run(&mut self) -> Result<SyncReport, SyncFailure> {
        if self.config.force_recrawl() {
            self.cache
                .clear()
                .map_err(failed_at(SyncState::CacheCleared))?;
            info!("Cache {} cleared", self.cache.path().display());
        }
        self.enter(SyncState::CacheCleared);

        self.repository
            .sync()
            .map_err(failed_at(SyncState::RepoSynced))?;
        self.enter(SyncState::RepoSynced);

        let baseline = self
            .writer
            .clear()
            .map_err(failed_at(SyncState::OutputCleared))?;
        self.enter(SyncState::OutputCleared);

        let scraped =
            Scraper::new(&self.fetcher, self.config, &mut self.cache, &self.writer).run(&baseline);
        let summary = match scraped {
            Ok(summary) => summary,
            Err(e) => {
                if let Err(undo) = baseline.restore() {
                    warn!("Could not restore {}: {}", self.writer.root().display(), undo);
                }
                return Err(failed_at(SyncState::Scraped)(e));
            }
        };
        if let Err(e) = baseline.discard() {
            warn!("Could not remove previous output: {}", e);
        }
        self.enter(SyncState::Scraped);

        let committed = self
            .repository
            .commit(&summary)
            .map_err(failed_at(SyncState::Committed))?;
        self.enter(SyncState::Committed);

        if committed {
            self.repository
                .push()
                .map_err(failed_at(SyncState::Pushed))?;
        } else {
            info!("Nothing committed, skipping push");
        }
        self.enter(SyncState::Pushed);
        self.enter(SyncState::Idle);

        Ok(SyncReport {
            summary,
            committed,
            pushed: committed,
        })
    }
}
