// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::sync::SyncReport;
use std::fs::File;
use std::io::{Result, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

pub struct ReportGenerator;

impl ReportGenerator {
    pub fn generate_report(report: &SyncReport, output_path: &Path, format: ReportFormat) -> Result<()> {
        let mut file = File::create(output_path)?;
        match format {
            ReportFormat::Text => file.write_all(Self::render_text(report).as_bytes()),
            ReportFormat::Json => {
                let json = serde_json::to_string_pretty(report)?;
                writeln!(file, "{}", json)
            }
        }
    }

    pub fn render_text(report: &SyncReport) -> String {
        let summary = &report.summary;
        let mut out = format!(
            "records: {}\nfiles: {}\ndownloaded: {}\ncached: {}\nskipped: {}\nfailed: {}\nduplicates: {}\ncache corrupted: {}\ncommitted: {}\npushed: {}\n",
            summary.records(),
            summary.files().len(),
            summary.downloads(),
            summary.cache_hits(),
            summary.skipped(),
            summary.failed(),
            summary.duplicates(),
            summary.cache_corrupted(),
            report.committed,
            report.pushed,
        );
        for error in summary.errors() {
            out.push_str("error: ");
            out.push_str(error);
            out.push('\n');
        }
        out
    }
}
