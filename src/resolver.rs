// File: resolver.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::cache::{CacheEntry, CacheStore};
use crate::dataset::{Baseline, DatasetFile, DatasetWriter};
use crate::errors::{ScrapeError, ScrapeResult};
use crate::fetcher::Fetch;
use crate::record::{sha256_hex, EnforcementRecord};
use chrono::Utc;
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};
use std::fs;

const MAX_SLUG_LEN: usize = 80;
const SUFFIX_LEN: usize = 8;

/// A record whose PDF is on disk, plus the cache entry to store once the
/// run's metadata is written.
#[derive(Debug, Clone)]
pub struct ResolvedRecord {
    pub record: EnforcementRecord,
    pub filename: String,
    pub fingerprint: String,
    pub file: DatasetFile,
    /// False when the bytes were reused from the previous run.
    pub fetched: bool,
    pub cache_entry: CacheEntry,
}

pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(ch.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug.to_string()
    }
}

fn base_stem(record: &EnforcementRecord) -> String {
    format!("{}-{}", record.date.format("%Y-%m-%d"), slugify(&record.organisation))
}

/// Filename per record identifier, `<date>-<organisation>.pdf`.
///
/// Every record of a group sharing a name gets a suffix taken from its
/// identifier, so the outcome does not depend on listing order.
pub fn plan_filenames(records: &[EnforcementRecord]) -> BTreeMap<String, String> {
    let mut stems: HashMap<String, usize> = HashMap::new();
    for record in records {
        *stems.entry(base_stem(record)).or_default() += 1;
    }

    let mut names: BTreeMap<String, String> = records
        .iter()
        .map(|record| {
            let stem = base_stem(record);
            let name = if stems[&stem] > 1 {
                format!("{}-{}.pdf", stem, &record.id[..SUFFIX_LEN.min(record.id.len())])
            } else {
                format!("{}.pdf", stem)
            };
            (record.id.clone(), name)
        })
        .collect();

    // A suffixed name can still meet an unsuffixed one; fall back to the full id.
    let mut taken: HashMap<String, usize> = HashMap::new();
    for name in names.values() {
        *taken.entry(name.clone()).or_default() += 1;
    }
    for record in records {
        if let Some(name) = names.get_mut(&record.id) {
            if taken[name.as_str()] > 1 {
                *name = format!("{}-{}.pdf", base_stem(record), record.id);
            }
        }
    }

    names
}

/// Turns records into PDFs in the dataset tree, reusing the previous run's
/// bytes whenever the cache says nothing changed.
pub struct DocumentResolver<'a, F: Fetch> {
    fetcher: F,
    cache: &'a CacheStore,
    writer: &'a DatasetWriter,
    baseline: &'a Baseline,
}

impl<'a, F: Fetch> DocumentResolver<'a, F> {
    pub fn new(
        fetcher: F,
        cache: &'a CacheStore,
        writer: &'a DatasetWriter,
        baseline: &'a Baseline,
    ) -> Self {
        Self {
            fetcher,
            cache,
            writer,
            baseline,
        }
    }

    fn reuse(&self, entry: &CacheEntry) -> Option<Vec<u8>> {
        let path = self.baseline.pdf(&entry.filename)?;
        let bytes = fs::read(&path).ok()?;
        if sha256_hex(&bytes) == entry.fingerprint {
            Some(bytes)
        } else {
            debug!("{} no longer matches its fingerprint", path.display());
            None
        }
    }

    pub fn resolve(&self, record: &EnforcementRecord, filename: &str) -> ScrapeResult<ResolvedRecord> {
        let source = sha256_hex(record.pdf_url.as_bytes());
        let reused = self
            .cache
            .lookup(&record.id)
            .filter(|entry| entry.source == source)
            .and_then(|entry| self.reuse(entry));

        let (bytes, fetched) = match reused {
            Some(bytes) => {
                debug!("Cache hit for {} ({})", record.id, record.organisation);
                (bytes, false)
            }
            None => {
                info!("Downloading {}", record.pdf_url);
                let bytes = self
                    .fetcher
                    .fetch(&record.pdf_url)
                    .map_err(|e| ScrapeError::download(&record.id, e))?;
                (bytes, true)
            }
        };

        let fingerprint = sha256_hex(&bytes);
        let file = self
            .writer
            .write_pdf(filename, &bytes)
            .map_err(|e| ScrapeError::download(&record.id, e))?;

        Ok(ResolvedRecord {
            record: record.clone(),
            filename: filename.to_string(),
            fingerprint: fingerprint.clone(),
            file,
            fetched,
            cache_entry: CacheEntry {
                fingerprint,
                source,
                filename: filename.to_string(),
                last_seen: Utc::now(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn record(org: &str, date: (i32, u32, u32), pdf: &str) -> EnforcementRecord {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        EnforcementRecord {
            id: EnforcementRecord::derive_id(pdf, date),
            organisation: org.to_string(),
            date,
            kind: None,
            penalty_amount: None,
            sector: None,
            summary: None,
            source_id: None,
            page_url: "https://ico.org.uk/x/".to_string(),
            pdf_url: pdf.to_string(),
        }
    }

    struct CountingFetcher {
        calls: Cell<usize>,
        fail: bool,
    }

    impl Fetch for CountingFetcher {
        fn fetch(&self, url: &str) -> ScrapeResult<Vec<u8>> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                Err(ScrapeError::Remote {
                    url: url.to_string(),
                    status: 404,
                })
            } else {
                Ok(format!("%PDF {}", url).into_bytes())
            }
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Acme Widgets (UK) Ltd."), "acme-widgets-uk-ltd");
        assert_eq!(slugify("  --  "), "unknown");
        assert_eq!(slugify("Café Ltd"), "caf-ltd");
        assert!(slugify(&"a".repeat(200)).len() <= 80);
    }

    #[test]
    fn test_unique_names_have_no_suffix() {
        let records = vec![
            record("Acme Ltd", (2020, 1, 1), "https://x/1.pdf"),
            record("Beta plc", (2020, 1, 1), "https://x/2.pdf"),
        ];
        let names = plan_filenames(&records);

        assert_eq!(names[&records[0].id], "2020-01-01-acme-ltd.pdf");
        assert_eq!(names[&records[1].id], "2020-01-01-beta-plc.pdf");
    }

    #[test]
    fn test_colliding_names_are_suffixed_in_any_order() {
        let a = record("Acme Ltd", (2020, 1, 1), "https://x/1.pdf");
        let b = record("ACME LTD", (2020, 1, 1), "https://x/2.pdf");

        let forward = plan_filenames(&[a.clone(), b.clone()]);
        let backward = plan_filenames(&[b.clone(), a.clone()]);

        assert_eq!(forward, backward);
        assert_ne!(forward[&a.id], forward[&b.id]);
        assert_eq!(forward[&a.id], format!("2020-01-01-acme-ltd-{}.pdf", &a.id[..8]));
    }

    #[test]
    fn test_resolve_fetches_then_reuses() {
        let dir = TempDir::new().unwrap();
        let writer = DatasetWriter::new(dir.path().join("data"));
        let mut cache = CacheStore::open(dir.path().join("cache.json"));
        let rec = record("Acme Ltd", (2020, 1, 1), "https://x/1.pdf");
        let fetcher = CountingFetcher {
            calls: Cell::new(0),
            fail: false,
        };

        let baseline = writer.clear().unwrap();
        let first = DocumentResolver::new(&fetcher, &cache, &writer, &baseline)
            .resolve(&rec, "2020-01-01-acme-ltd.pdf")
            .unwrap();
        assert!(first.fetched);
        assert_eq!(fetcher.calls.get(), 1);
        cache.record(&rec.id, first.cache_entry.clone());
        baseline.discard().unwrap();

        let baseline = writer.clear().unwrap();
        let second = DocumentResolver::new(&fetcher, &cache, &writer, &baseline)
            .resolve(&rec, "2020-01-01-acme-ltd.pdf")
            .unwrap();
        assert!(!second.fetched);
        assert_eq!(fetcher.calls.get(), 1);
        assert_eq!(second.fingerprint, first.fingerprint);
        assert!(writer.pdf_path("2020-01-01-acme-ltd.pdf").exists());
    }

    #[test]
    fn test_changed_url_is_refetched() {
        let dir = TempDir::new().unwrap();
        let writer = DatasetWriter::new(dir.path().join("data"));
        let mut cache = CacheStore::open(dir.path().join("cache.json"));
        let rec = record("Acme Ltd", (2020, 1, 1), "https://x/1.pdf");
        let fetcher = CountingFetcher {
            calls: Cell::new(0),
            fail: false,
        };

        let baseline = writer.clear().unwrap();
        let first = DocumentResolver::new(&fetcher, &cache, &writer, &baseline)
            .resolve(&rec, "a.pdf")
            .unwrap();
        let mut stale = first.cache_entry;
        stale.source = "something else".to_string();
        cache.record(&rec.id, stale);
        baseline.discard().unwrap();

        let baseline = writer.clear().unwrap();
        let again = DocumentResolver::new(&fetcher, &cache, &writer, &baseline)
            .resolve(&rec, "a.pdf")
            .unwrap();
        assert!(again.fetched);
        assert_eq!(fetcher.calls.get(), 2);
    }

    #[test]
    fn test_failed_fetch_is_download_error() {
        let dir = TempDir::new().unwrap();
        let writer = DatasetWriter::new(dir.path().join("data"));
        let cache = CacheStore::open(dir.path().join("cache.json"));
        let rec = record("Acme Ltd", (2020, 1, 1), "https://x/1.pdf");
        let fetcher = CountingFetcher {
            calls: Cell::new(0),
            fail: true,
        };

        let baseline = writer.clear().unwrap();
        let err = DocumentResolver::new(&fetcher, &cache, &writer, &baseline)
            .resolve(&rec, "a.pdf")
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Download { .. }));
        assert!(!writer.pdf_path("a.pdf").exists());
    }
}
