// File: cli.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

use crate::config::{ConfigParameter, DEFAULT_BOT_EMAIL, DEFAULT_BOT_NAME, DEFAULT_LIST_URL};
use crate::report::ReportFormat;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(long = "cache-file", global = true, help = "Cache file (default: local data dir)")]
    pub cache_file: Option<PathBuf>,

    #[arg(long = "log-level", default_value = "warn", global = true)]
    pub log_level: String,

    #[arg(
        short = 'v',
        long = "verbose",
        help = "Enable verbose output",
        global = true
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long = "quiet",
        help = "Reduce output verbosity",
        global = true
    )]
    pub quiet: bool,

    #[arg(long = "no-color", help = "Disable colored output", global = true)]
    pub no_color: bool,

    #[command(flatten)]
    pub sync: SyncArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scrape, write the dataset, commit and push (the default)
    Sync,
    /// Forget every cached fingerprint
    ClearCache,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    #[arg(short = 'o', long = "output-dir", default_value = "output")]
    pub output_dir: PathBuf,

    #[arg(long = "list-url", default_value = DEFAULT_LIST_URL)]
    pub list_url: String,

    #[arg(
        short = 'f',
        long = "force-recrawl",
        help = "Clear the cache first so every PDF is fetched again"
    )]
    pub force_recrawl: bool,

    #[arg(long = "no-git", help = "Only write the dataset, skip sync/commit/push")]
    pub no_git: bool,

    #[arg(long = "repo-dir", default_value = ".")]
    pub repo_dir: PathBuf,

    #[arg(long = "remote", default_value = "origin")]
    pub remote: String,

    #[arg(long = "branch", default_value = "master")]
    pub branch: String,

    #[arg(long = "bot-name", default_value = DEFAULT_BOT_NAME)]
    pub bot_name: String,

    #[arg(long = "bot-email", default_value = DEFAULT_BOT_EMAIL)]
    pub bot_email: String,

    #[arg(
        short = 't',
        long = "timeout",
        default_value_t = 30,
        help = "HTTP request timeout in seconds"
    )]
    pub timeout: u64,

    #[arg(long = "retries", default_value_t = 4, help = "Attempts per request")]
    pub retries: u32,

    #[arg(long = "backoff-ms", default_value_t = 500)]
    pub backoff_ms: u64,

    #[arg(short = 'r', long = "rate-limit", default_value_t = 2, help = "Requests per second, 0 for no limit")]
    pub rate_limit: u32,

    #[arg(long = "max-pages", default_value_t = 200)]
    pub max_pages: u32,

    #[arg(long = "summary", help = "Also write the run summary to this file")]
    pub summary: Option<PathBuf>,

    #[arg(long = "summary-format", default_value = "text")]
    pub summary_format: String,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            return LevelFilter::Info;
        }
        if self.quiet {
            return LevelFilter::Error;
        }
        self.log_level.parse().unwrap_or(LevelFilter::Warn)
    }

    pub fn to_config(&self) -> ConfigParameter {
        let args = &self.sync;
        let mut config = ConfigParameter::new();
        config.set_list_url(args.list_url.clone());
        config.set_dataset_dir(args.output_dir.clone());
        if let Some(cache) = &self.cache_file {
            config.set_cache_path(cache.clone());
        }
        config.set_timeout(args.timeout);
        config.set_max_attempts(args.retries);
        config.set_backoff_ms(args.backoff_ms);
        config.set_rate_limit(args.rate_limit);
        config.set_max_pages(args.max_pages);
        config.set_force_recrawl(args.force_recrawl);
        config.set_git(!args.no_git);
        config.set_repo_dir(args.repo_dir.clone());
        config.set_remote(args.remote.clone());
        config.set_branch(args.branch.clone());
        config.set_bot_name(args.bot_name.clone());
        config.set_bot_email(args.bot_email.clone());
        config.set_quiet(self.quiet);
        config
    }
}

impl SyncArgs {
    pub fn report_format(&self) -> Option<ReportFormat> {
        match self.summary_format.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}
