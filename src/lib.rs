// File: lib.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::bool_assert_comparison)]
#![allow(clippy::new_without_default)]

pub mod cache;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod fetcher;
pub mod html;
pub mod parser;
pub mod record;
pub mod report;
pub mod repository;
pub mod resolver;
pub mod scrape;
pub mod summary;
pub mod sync;


pub use errors::{ScrapeError, ScrapeResult};
pub use sync::{Orchestrator, SyncFailure, SyncReport, SyncState};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_imports() {
        let _ = config::ConfigParameter::default();
        let _ = summary::RunSummary::new();
        let _ = repository::LocalRepository;
        let _ = dataset::DatasetWriter::new("output");
        let _ = SyncState::Idle;
    }
}
