// File: main.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::*;
use penalty_scrape::cache::CacheStore;
use penalty_scrape::cli::{Cli, Commands};
use penalty_scrape::config::ConfigParameter;
use penalty_scrape::fetcher::HttpFetcher;
use penalty_scrape::report::ReportGenerator;
use penalty_scrape::repository::{GitRepository, LocalRepository};
use penalty_scrape::{Orchestrator, SyncReport};
use simple_logger::SimpleLogger;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    if let Err(e) = SimpleLogger::new().with_level(cli.log_level()).init() {
        eprintln!("Failed to initialise logging: {}", e);
    }

    let config = cli.to_config();
    let result = match cli.command {
        Some(Commands::ClearCache) => clear_cache(&config),
        Some(Commands::Sync) | None => sync(&cli, &config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn clear_cache(config: &ConfigParameter) -> Result<()> {
    let mut cache = CacheStore::open(config.cache_path());
    let count = cache.len();
    cache.clear().context("Failed to clear cache")?;
    print_success(&format!(
        "Cleared {} cache entries from {}",
        count,
        config.cache_path().display()
    ));
    Ok(())
}

fn sync(cli: &Cli, config: &ConfigParameter) -> Result<()> {
    let format = match &cli.sync.summary {
        Some(_) => Some(cli.sync.report_format().ok_or_else(|| {
            anyhow!("Unknown summary format '{}'", cli.sync.summary_format)
        })?),
        None => None,
    };

    let fetcher = HttpFetcher::new(config).context("Failed to set up HTTP client")?;
    let cache = CacheStore::open(config.cache_path());

    let report = if config.git() {
        let repo = GitRepository::from_config(config).context("Failed to locate dataset")?;
        Orchestrator::new(config, fetcher, repo, cache).run()?
    } else {
        Orchestrator::new(config, fetcher, LocalRepository, cache).run()?
    };

    if !config.quiet() {
        print_report(&report);
    }
    if let (Some(path), Some(format)) = (&cli.sync.summary, format) {
        ReportGenerator::generate_report(&report, path, format)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    let summary = &report.summary;
    print_success(&format!(
        "Run completed with {} records and {} files",
        report.records(),
        report.files()
    ));
    print_info(&format!(
        "Downloaded {}, reused {}, skipped {}, failed {}, duplicates {}",
        summary.downloads(),
        summary.cache_hits(),
        summary.skipped(),
        summary.failed(),
        summary.duplicates()
    ));
    if let Some(ms) = summary.duration_ms() {
        print_info(&format!("Took {} ms", ms));
    }
    for error in summary.errors() {
        print_warning(error);
    }
    if report.committed {
        print_success("Changes committed and pushed");
    } else {
        print_info("No changes committed");
    }
}

fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}
