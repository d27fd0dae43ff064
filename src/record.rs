// File: record.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const ID_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    EnforcementNotice,
    MonetaryPenalty,
    Undertaking,
}

impl ActionKind {
    /// Maps the `/action-weve-taken/<slug>/` path segment of a notice URL.
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "enforcement-notices" => Some(Self::EnforcementNotice),
            "mpns" => Some(Self::MonetaryPenalty),
            "undertakings" => Some(Self::Undertaking),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::EnforcementNotice => write!(f, "enforcement-notice"),
            ActionKind::MonetaryPenalty => write!(f, "monetary-penalty"),
            ActionKind::Undertaking => write!(f, "undertaking"),
        }
    }
}

/// One published enforcement action, as found on its detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnforcementRecord {
    pub id: String,
    pub organisation: String,
    pub date: NaiveDate,
    pub kind: Option<ActionKind>,
    pub penalty_amount: Option<u64>,
    pub sector: Option<String>,
    pub summary: Option<String>,
    pub source_id: Option<String>,
    pub page_url: String,
    pub pdf_url: String,
}

impl EnforcementRecord {
    /// Stable key for a notice: same PDF URL and decision date, same id.
    pub fn derive_id(pdf_url: &str, date: NaiveDate) -> String {
        let digest = sha256_hex(format!("{}\n{}", pdf_url, date.format("%Y-%m-%d")).as_bytes());
        digest[..ID_LEN].to_string()
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_id_is_stable() {
        let url = "https://ico.org.uk/media/action-weve-taken/mpns/2172972/acme.pdf";
        let a = EnforcementRecord::derive_id(url, date(2017, 12, 21));
        let b = EnforcementRecord::derive_id(url, date(2017, 12, 21));

        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_id_depends_on_url_and_date() {
        let url = "https://ico.org.uk/media/action-weve-taken/mpns/1/a.pdf";
        let base = EnforcementRecord::derive_id(url, date(2020, 1, 1));

        assert_ne!(base, EnforcementRecord::derive_id(url, date(2020, 1, 2)));
        assert_ne!(
            base,
            EnforcementRecord::derive_id("https://ico.org.uk/media/action-weve-taken/mpns/2/a.pdf", date(2020, 1, 1))
        );
    }

    #[test]
    fn test_action_kind_slugs() {
        assert_eq!(ActionKind::from_slug("mpns"), Some(ActionKind::MonetaryPenalty));
        assert_eq!(
            ActionKind::from_slug("enforcement-notices"),
            Some(ActionKind::EnforcementNotice)
        );
        assert_eq!(ActionKind::from_slug("undertakings"), Some(ActionKind::Undertaking));
        assert_eq!(ActionKind::from_slug("prosecutions"), None);
        assert_eq!(ActionKind::MonetaryPenalty.to_string(), "monetary-penalty");
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&ActionKind::EnforcementNotice).unwrap();
        assert_eq!(json, "\"enforcement-notice\"");
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
