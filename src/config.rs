// File: config.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LIST_URL: &str = "https://ico.org.uk/action-weve-taken/enforcement/";
pub const DEFAULT_BOT_NAME: &str = "penalty-scrape bot";
pub const DEFAULT_BOT_EMAIL: &str = "penalty-scrape@users.noreply.github.com";

#[derive(Debug, Clone)]
pub struct ConfigParameter {
    list_url: String,
    dataset_dir: PathBuf,
    cache_path: PathBuf,
    timeout: u64,
    max_attempts: u32,
    backoff_ms: u64,
    max_backoff_ms: u64,
    rate_limit: u32,
    max_pages: u32,
    force_recrawl: bool,
    git: bool,
    repo_dir: PathBuf,
    remote: String,
    branch: String,
    bot_name: String,
    bot_email: String,
    quiet: bool,
}

impl Default for ConfigParameter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigParameter {
    pub fn new() -> Self {
        Self {
            list_url: DEFAULT_LIST_URL.to_string(),
            dataset_dir: PathBuf::from("output"),
            cache_path: default_cache_path(),
            timeout: 30,
            max_attempts: 4,
            backoff_ms: 500,
            max_backoff_ms: 8000,
            rate_limit: 2,
            max_pages: 200,
            force_recrawl: false,
            git: true,
            repo_dir: PathBuf::from("."),
            remote: "origin".to_string(),
            branch: "master".to_string(),
            bot_name: DEFAULT_BOT_NAME.to_string(),
            bot_email: DEFAULT_BOT_EMAIL.to_string(),
            quiet: false,
        }
    }

    pub fn set_list_url(&mut self, list_url: String) {
        self.list_url = list_url;
    }

    pub fn list_url(&self) -> &str {
        &self.list_url
    }

    pub fn set_dataset_dir(&mut self, dataset_dir: PathBuf) {
        self.dataset_dir = dataset_dir;
    }

    pub fn dataset_dir(&self) -> &Path {
        &self.dataset_dir
    }

    pub fn set_cache_path(&mut self, cache_path: PathBuf) {
        self.cache_path = cache_path;
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    pub fn set_timeout(&mut self, timeout: u64) {
        self.timeout = timeout;
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    pub fn set_max_attempts(&mut self, max_attempts: u32) {
        self.max_attempts = max_attempts.max(1);
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn set_backoff_ms(&mut self, backoff_ms: u64) {
        self.backoff_ms = backoff_ms;
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn set_max_backoff_ms(&mut self, max_backoff_ms: u64) {
        self.max_backoff_ms = max_backoff_ms;
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn set_rate_limit(&mut self, rate_limit: u32) {
        self.rate_limit = rate_limit;
    }

    /// Requests per second; zero disables the quota.
    pub fn rate_limit(&self) -> u32 {
        self.rate_limit
    }

    pub fn set_max_pages(&mut self, max_pages: u32) {
        self.max_pages = max_pages.max(1);
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub fn set_force_recrawl(&mut self, force_recrawl: bool) {
        self.force_recrawl = force_recrawl;
    }

    pub fn force_recrawl(&self) -> bool {
        self.force_recrawl
    }

    pub fn set_git(&mut self, git: bool) {
        self.git = git;
    }

    pub fn git(&self) -> bool {
        self.git
    }

    pub fn set_repo_dir(&mut self, repo_dir: PathBuf) {
        self.repo_dir = repo_dir;
    }

    /// Working tree the dataset directory lives in.
    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    pub fn set_remote(&mut self, remote: String) {
        self.remote = remote;
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn set_branch(&mut self, branch: String) {
        self.branch = branch;
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn set_bot_name(&mut self, bot_name: String) {
        self.bot_name = bot_name;
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    pub fn set_bot_email(&mut self, bot_email: String) {
        self.bot_email = bot_email;
    }

    pub fn bot_email(&self) -> &str {
        &self.bot_email
    }

    pub fn set_quiet(&mut self, quiet: bool) {
        self.quiet = quiet;
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }
}

fn default_cache_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(env!("CARGO_PKG_NAME"))
        .join("cache.json")
}
