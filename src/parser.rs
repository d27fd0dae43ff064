// File: parser.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::errors::{ScrapeError, ScrapeResult};
use crate::fetcher::Fetch;
use crate::html::{definition_value, links, normalize_ws, text_content, DT, H1, META_DESCRIPTION};
use crate::record::{ActionKind, EnforcementRecord};
use chrono::NaiveDate;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::Html;
use std::collections::{HashSet, VecDeque};

static POUNDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"£\s*([0-9][0-9,]*)").unwrap());
static SOURCE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d+)/").unwrap());
static KIND_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"/action-weve-taken/([^/]+)/").unwrap());

const LISTING_SEGMENT: &str = "/action-weve-taken/enforcement/";
const DOCUMENT_SEGMENT: &str = "/media/action-weve-taken/";
const DATE_FORMATS: &[&str] = &["%d %B %Y", "%d %b %Y", "%Y-%m-%d", "%d/%m/%Y"];

fn is_document(url: &Url) -> bool {
    url.path().contains(DOCUMENT_SEGMENT) && url.path().to_ascii_lowercase().ends_with(".pdf")
}

/// Detail page links on one listing page, in page order and without repeats.
///
/// The listing itself and anything carrying a query string (pagination,
/// facet filters) is left out.
pub fn parse_listing(html: &str, page_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let listing_path = page_url.path().trim_end_matches('/');
    let mut seen = HashSet::new();

    links(&document, page_url)
        .into_iter()
        .filter(|url| {
            url.path().contains(LISTING_SEGMENT)
                && url.query().is_none()
                && url.path().trim_end_matches('/') != listing_path
        })
        .filter(|url| seen.insert(url.to_string()))
        .collect()
}

/// Builds a record from a detail page. Every field problem is reported as a
/// `PartialParse` error for this page alone.
pub fn parse_detail(html: &str, page_url: &Url) -> ScrapeResult<EnforcementRecord> {
    let url = page_url.as_str();
    let document = Html::parse_document(html);

    let headings: Vec<String> = document.select(&H1).map(text_content).collect();
    let organisation = match headings.as_slice() {
        [single] if !single.is_empty() => single.clone(),
        [_] => return Err(ScrapeError::partial_parse(url, "empty <h1> heading")),
        other => {
            return Err(ScrapeError::partial_parse(
                url,
                format!("expected one <h1> heading, found {}", other.len()),
            ))
        }
    };

    let definitions: Vec<(String, String)> = document
        .select(&DT)
        .filter_map(|dt| {
            definition_value(dt).map(|dd| (text_content(dt).to_lowercase(), text_content(dd)))
        })
        .collect();
    let definition = |keys: &[&str]| {
        definitions
            .iter()
            .find(|(label, _)| keys.iter().any(|k| label.contains(k)))
            .map(|(_, value)| value.clone())
    };

    let raw_date =
        definition(&["date"]).ok_or_else(|| ScrapeError::partial_parse(url, "missing date"))?;
    let date = parse_date(&raw_date)
        .ok_or_else(|| ScrapeError::partial_parse(url, format!("malformed date '{}'", raw_date)))?;

    let mut pdf_links: Vec<Url> = Vec::new();
    for link in links(&document, page_url).into_iter().filter(is_document) {
        if !pdf_links.contains(&link) {
            pdf_links.push(link);
        }
    }
    let pdf_url = match pdf_links.as_slice() {
        [single] => single.to_string(),
        [] => return Err(ScrapeError::partial_parse(url, "no PDF link")),
        many => {
            return Err(ScrapeError::partial_parse(
                url,
                format!("{} different PDF links", many.len()),
            ))
        }
    };

    let summary = document
        .select(&META_DESCRIPTION)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(normalize_ws)
        .filter(|s| !s.is_empty());
    let penalty_amount = definition(&["penalty", "fine", "amount"])
        .as_deref()
        .and_then(parse_pounds)
        .or_else(|| summary.as_deref().and_then(parse_pounds));

    Ok(EnforcementRecord {
        id: EnforcementRecord::derive_id(&pdf_url, date),
        organisation,
        date,
        kind: KIND_SLUG
            .captures(&pdf_url)
            .and_then(|caps| ActionKind::from_slug(&caps[1])),
        penalty_amount,
        sector: definition(&["sector"]).filter(|s| !s.is_empty()),
        summary,
        source_id: SOURCE_ID.captures(&pdf_url).map(|caps| caps[1].to_string()),
        page_url: url.to_string(),
        pdf_url,
    })
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = normalize_ws(raw);
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&raw, format).ok())
}

/// First `£` amount in whole pounds.
pub fn parse_pounds(text: &str) -> Option<u64> {
    POUNDS
        .captures(text)
        .and_then(|caps| caps[1].replace(',', "").parse().ok())
}

#[derive(Debug)]
pub enum Entry {
    Record(EnforcementRecord),
    /// A detail page that was fetched or parsed unsuccessfully; the crawl goes on.
    Skipped(ScrapeError),
}

/// Lazy walk over the paginated listing.
///
/// Listing pages are fetched on demand; page one is the bare listing URL,
/// later pages add `?page=N`. The walk ends on a page with no unseen detail
/// links or after `max_pages`. A listing page that cannot be fetched yields
/// one `Err` and ends the walk.
pub struct Listing<F: Fetch> {
    fetcher: F,
    list_url: Url,
    max_pages: u32,
    page: u32,
    pending: VecDeque<Url>,
    seen: HashSet<String>,
    finished: bool,
}

impl<F: Fetch> Listing<F> {
    pub fn new(fetcher: F, list_url: &str, max_pages: u32) -> ScrapeResult<Self> {
        let list_url = Url::parse(list_url).map_err(|e| ScrapeError::InvalidUrl {
            url: list_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            fetcher,
            list_url,
            max_pages: max_pages.max(1),
            page: 0,
            pending: VecDeque::new(),
            seen: HashSet::new(),
            finished: false,
        })
    }

    /// Rewind to the first listing page.
    pub fn restart(&mut self) {
        self.page = 0;
        self.pending.clear();
        self.seen.clear();
        self.finished = false;
    }

    /// Listing pages fetched so far.
    pub fn pages(&self) -> u32 {
        self.page
    }

    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.list_url.clone();
        if page > 1 {
            url.query_pairs_mut().append_pair("page", &page.to_string());
        }
        url
    }

    fn load_detail(&self, url: &Url) -> Entry {
        let parsed = self
            .fetcher
            .fetch(url.as_str())
            .and_then(|body| parse_detail(&String::from_utf8_lossy(&body), url));
        match parsed {
            Ok(record) => Entry::Record(record),
            Err(e) => {
                warn!("{}", e);
                Entry::Skipped(e)
            }
        }
    }
}

impl<F: Fetch> Iterator for Listing<F> {
    type Item = ScrapeResult<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(url) = self.pending.pop_front() {
                return Some(Ok(self.load_detail(&url)));
            }
            if self.finished || self.page >= self.max_pages {
                self.finished = true;
                return None;
            }

            self.page += 1;
            let url = self.page_url(self.page);
            let body = match self.fetcher.fetch(url.as_str()) {
                Ok(body) => body,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            };

            let links = parse_listing(&String::from_utf8_lossy(&body), &url);
            let fresh: Vec<Url> = links
                .into_iter()
                .filter(|link| self.seen.insert(link.to_string()))
                .collect();
            if fresh.is_empty() {
                info!("Listing page {} has no new entries, end of listing", self.page);
                self.finished = true;
                return None;
            }

            info!("Listing page {}: {} entries", self.page, fresh.len());
            self.pending.extend(fresh);
        }
    }
}
