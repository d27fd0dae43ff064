// File: repository.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::config::ConfigParameter;
use crate::errors::{ScrapeError, ScrapeResult};
use crate::summary::RunSummary;
use log::{debug, info};
use std::ffi::OsStr;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

/// The version-control side of a sync: bring the checkout to the remote's
/// state, record the new dataset, publish it.
pub trait Repository {
    fn sync(&mut self) -> ScrapeResult<()>;
    /// Returns false when the dataset did not change.
    fn commit(&mut self, summary: &RunSummary) -> ScrapeResult<bool>;
    fn push(&mut self) -> ScrapeResult<()>;
}

/// For runs without a checkout: every step succeeds and nothing is committed.
#[derive(Debug, Default)]
pub struct LocalRepository;

impl Repository for LocalRepository {
    fn sync(&mut self) -> ScrapeResult<()> {
        Ok(())
    }

    fn commit(&mut self, _summary: &RunSummary) -> ScrapeResult<bool> {
        Ok(false)
    }

    fn push(&mut self) -> ScrapeResult<()> {
        Ok(())
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
}

impl ChangeSet {
    /// Reads `git diff --name-status` output.
    pub fn parse(name_status: &str) -> Self {
        let mut changes = Self::default();
        for line in name_status.lines() {
            let mut fields = line.split('\t');
            let (Some(status), Some(first)) = (fields.next(), fields.next()) else {
                continue;
            };
            match status.chars().next() {
                Some('A') | Some('C') => changes.added.push(first.to_string()),
                Some('D') => changes.removed.push(first.to_string()),
                Some('R') => {
                    changes.removed.push(first.to_string());
                    if let Some(second) = fields.next() {
                        changes.added.push(second.to_string());
                    }
                }
                Some(_) => changes.modified.push(first.to_string()),
                None => {}
            }
        }
        changes
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    pub fn commit_message(&self, summary: &RunSummary) -> String {
        let mut msg = format!(
            "Update enforcement dataset: {} added, {} modified, {} removed\n\n",
            self.added.len(),
            self.modified.len(),
            self.removed.len()
        );
        let _ = writeln!(
            msg,
            "Records: {} (downloaded {}, cached {}, skipped {}, failed {})",
            summary.records(),
            summary.downloads(),
            summary.cache_hits(),
            summary.skipped(),
            summary.failed()
        );
        for (title, paths) in [
            ("Added", &self.added),
            ("Modified", &self.modified),
            ("Removed", &self.removed),
        ] {
            if paths.is_empty() {
                continue;
            }
            let _ = write!(msg, "\n{}:\n", title);
            for path in paths {
                let _ = writeln!(msg, "  {}", path);
            }
        }
        if !summary.errors().is_empty() {
            msg.push_str("\nProblems:\n");
            for error in summary.errors() {
                let _ = writeln!(msg, "  {}", error);
            }
        }
        msg
    }
}

/// Drives the `git` binary in an existing checkout. Credentials are whatever
/// the environment gives git for `remote`.
#[derive(Debug, Clone)]
pub struct GitRepository {
    workdir: PathBuf,
    dataset: PathBuf,
    remote: String,
    branch: String,
    bot_name: String,
    bot_email: String,
}

impl GitRepository {
    pub fn new(workdir: impl Into<PathBuf>, dataset: impl Into<PathBuf>) -> Self {
        let defaults = ConfigParameter::new();
        Self {
            workdir: workdir.into(),
            dataset: dataset.into(),
            remote: defaults.remote().to_string(),
            branch: defaults.branch().to_string(),
            bot_name: defaults.bot_name().to_string(),
            bot_email: defaults.bot_email().to_string(),
        }
    }

    pub fn from_config(config: &ConfigParameter) -> ScrapeResult<Self> {
        let dataset = if config.dataset_dir().is_absolute() {
            config.dataset_dir().to_path_buf()
        } else {
            std::env::current_dir()?.join(config.dataset_dir())
        };
        let mut repo = Self::new(config.repo_dir(), dataset);
        repo.remote = config.remote().to_string();
        repo.branch = config.branch().to_string();
        repo.bot_name = config.bot_name().to_string();
        repo.bot_email = config.bot_email().to_string();
        Ok(repo)
    }

    pub fn dataset(&self) -> &Path {
        &self.dataset
    }

    fn git<I, S>(&self, step: &str, args: I) -> ScrapeResult<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new("git");
        command.current_dir(&self.workdir).args(args);
        debug!("{:?}", command);

        let output = command.output().map_err(|e| ScrapeError::Collaborator {
            step: step.to_string(),
            message: e.to_string(),
        })?;
        if !output.status.success() {
            return Err(ScrapeError::Collaborator {
                step: step.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub fn staged_changes(&self) -> ScrapeResult<ChangeSet> {
        let dataset = self.dataset.as_os_str();
        self.git("git add", [OsStr::new("add"), OsStr::new("-A"), OsStr::new("--"), dataset])?;
        let out = self.git(
            "git diff",
            [
                OsStr::new("diff"),
                OsStr::new("--cached"),
                OsStr::new("--name-status"),
                OsStr::new("--"),
                dataset,
            ],
        )?;
        Ok(ChangeSet::parse(&out))
    }
}

impl Repository for GitRepository {
    fn sync(&mut self) -> ScrapeResult<()> {
        let upstream = format!("{}/{}", self.remote, self.branch);
        self.git("git fetch", ["fetch", "--quiet", self.remote.as_str(), self.branch.as_str()])?;
        self.git("git reset", ["reset", "--hard", "--quiet", upstream.as_str()])?;
        if self.dataset.exists() {
            self.git(
                "git clean",
                [OsStr::new("clean"), OsStr::new("-fdq"), OsStr::new("--"), self.dataset.as_os_str()],
            )?;
        }
        info!("Checkout reset to {}", upstream);
        Ok(())
    }

    fn commit(&mut self, summary: &RunSummary) -> ScrapeResult<bool> {
        let changes = self.staged_changes()?;
        if changes.is_empty() {
            info!("Dataset unchanged, nothing to commit");
            return Ok(false);
        }

        let message = changes.commit_message(summary);
        let name = format!("user.name={}", self.bot_name);
        let email = format!("user.email={}", self.bot_email);
        self.git(
            "git commit",
            [
                "-c",
                name.as_str(),
                "-c",
                email.as_str(),
                "commit",
                "--quiet",
                "-m",
                message.as_str(),
            ],
        )?;
        info!(
            "Committed {} added, {} modified, {} removed",
            changes.added.len(),
            changes.modified.len(),
            changes.removed.len()
        );
        Ok(true)
    }

    fn push(&mut self) -> ScrapeResult<()> {
        let refspec = format!("HEAD:{}", self.branch);
        self.git("git push", ["push", "--quiet", self.remote.as_str(), refspec.as_str()])?;
        info!("Pushed to {} {}", self.remote, self.branch);
        Ok(())
    }
}
