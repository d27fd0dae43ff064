// File: errors.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ScrapeError {
    /// Connection failure or timeout that survived every retry.
    Network {
        url: String,
        attempts: u32,
        message: String,
    },
    /// Non-2xx answer from the remote side.
    Remote { url: String, status: u16 },
    /// A configured URL that does not parse.
    InvalidUrl { url: String, reason: String },
    /// A single listing entry that could not be turned into a record.
    PartialParse { url: String, reason: String },
    /// A PDF that could not be fetched or written for one record.
    Download { id: String, reason: String },
    /// The persisted cache could not be read back.
    CacheCorruption { path: PathBuf, reason: String },
    Io(std::io::Error),
    Serialization(serde_json::Error),
    /// An external collaborator (git, ...) failed.
    Collaborator { step: String, message: String },
}

impl ScrapeError {
    pub fn partial_parse(url: &str, reason: impl Into<String>) -> Self {
        Self::PartialParse {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub fn download(id: &str, reason: impl fmt::Display) -> Self {
        Self::Download {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Only connection level failures and 5xx answers are worth another try.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Remote { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network {
                url,
                attempts,
                message,
            } => write!(
                f,
                "Network error for {} after {} attempt(s): {}",
                url, attempts, message
            ),
            Self::Remote { url, status } => write!(f, "Remote error: HTTP {} for {}", status, url),
            Self::InvalidUrl { url, reason } => write!(f, "Invalid URL '{}': {}", url, reason),
            Self::PartialParse { url, reason } => {
                write!(f, "Skipped entry {}: {}", url, reason)
            }
            Self::Download { id, reason } => write!(f, "Download failed for {}: {}", id, reason),
            Self::CacheCorruption { path, reason } => {
                write!(f, "Cache file {} unreadable: {}", path.display(), reason)
            }
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::Collaborator { step, message } => {
                write!(f, "{} failed: {}", step, message)
            }
        }
    }
}

impl std::error::Error for ScrapeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ScrapeError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<serde_json::Error> for ScrapeError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error)
    }
}

impl From<tempfile::PersistError> for ScrapeError {
    fn from(error: tempfile::PersistError) -> Self {
        Self::Io(error.error)
    }
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
