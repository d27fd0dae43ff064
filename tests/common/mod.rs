// File: common/mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(dead_code)]

use penalty_scrape::cache::CacheStore;
use penalty_scrape::config::ConfigParameter;
use penalty_scrape::fetcher::Fetch;
use penalty_scrape::repository::{LocalRepository, Repository};
use penalty_scrape::{Orchestrator, ScrapeError, ScrapeResult, SyncFailure, SyncReport};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

pub const SITE: &str = "https://ico.test";
pub const LIST_URL: &str = "https://ico.test/action-weve-taken/enforcement/";

/// In-memory stand-in for the regulator's site. Every fetch is logged.
#[derive(Default)]
pub struct FakeSite {
    pages: RefCell<HashMap<String, Result<Vec<u8>, u16>>>,
    calls: RefCell<Vec<String>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, url: &str, body: &str) {
        self.pages
            .borrow_mut()
            .insert(url.to_string(), Ok(body.as_bytes().to_vec()));
    }

    pub fn fail(&self, url: &str, status: u16) {
        self.pages.borrow_mut().insert(url.to_string(), Err(status));
    }

    /// Puts every slug on listing page one; page two is empty.
    pub fn listing(&self, slugs: &[&str]) {
        let links: String = slugs
            .iter()
            .map(|slug| format!("<li><a href=\"/action-weve-taken/enforcement/{}/\">{}</a></li>\n", slug, slug))
            .collect();
        self.page(
            LIST_URL,
            &format!(
                "<html><body><h1>Enforcement action</h1><ul>{}</ul>\
                 <a href=\"/action-weve-taken/enforcement/?page=2\">Next</a></body></html>",
                links
            ),
        );
        self.page(&format!("{}?page=2", LIST_URL), "<html><body><ul></ul></body></html>");
    }

    /// Registers a detail page and its PDF; returns the PDF URL.
    pub fn notice(&self, slug: &str, org: &str, date: &str, pdf_id: u32) -> String {
        let pdf_url = format!("{}/media/action-weve-taken/mpns/{}/{}.pdf", SITE, pdf_id, slug);
        self.page(&detail_url(slug), &detail_page(org, date, &pdf_url));
        self.page(&pdf_url, &format!("%PDF-1.4 {} {}", slug, pdf_id));
        pdf_url
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn pdf_calls(&self) -> usize {
        self.calls.borrow().iter().filter(|u| u.ends_with(".pdf")).count()
    }

    pub fn reset_calls(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl Fetch for FakeSite {
    fn fetch(&self, url: &str) -> ScrapeResult<Vec<u8>> {
        self.calls.borrow_mut().push(url.to_string());
        match self.pages.borrow().get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(ScrapeError::Remote {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(ScrapeError::Remote {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

pub fn detail_url(slug: &str) -> String {
    format!("{}{}/", LIST_URL, slug)
}

pub fn detail_page(org: &str, date: &str, pdf_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>{org} | ICO</title>
    <meta name="description" content="{org} has been fined &pound;120,000 by the ICO.">
</head>
<body>
    <h1>{org}</h1>
    <dl>
        <dt>Date</dt>
        <dd>{date}</dd>
        <dt>Sector</dt>
        <dd>Marketing</dd>
    </dl>
    <p><a href="{pdf_url}">Monetary penalty notice (PDF)</a></p>
</body>
</html>"#
    )
}

pub fn config(dir: &Path) -> ConfigParameter {
    let mut config = ConfigParameter::new();
    config.set_list_url(LIST_URL.to_string());
    config.set_dataset_dir(dir.join("data"));
    config.set_cache_path(dir.join("cache").join("cache.json"));
    config.set_git(false);
    config.set_quiet(true);
    config
}

pub fn run(config: &ConfigParameter, site: &FakeSite) -> Result<SyncReport, SyncFailure> {
    run_with(config, site, LocalRepository)
}

pub fn run_with<R: Repository>(
    config: &ConfigParameter,
    site: &FakeSite,
    repository: R,
) -> Result<SyncReport, SyncFailure> {
    let cache = CacheStore::open(config.cache_path());
    Orchestrator::new(config, site, repository, cache).run()
}

/// Every file below `root` with its bytes, keyed by relative path.
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(base: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(base, &path, out);
            } else {
                let rel = path.strip_prefix(base).unwrap().to_path_buf();
                out.insert(rel, fs::read(&path).unwrap());
            }
        }
    }

    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

pub fn index(root: &Path) -> serde_json::Value {
    serde_json::from_slice(&fs::read(root.join("index.json")).unwrap()).unwrap()
}
