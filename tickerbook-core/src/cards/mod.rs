//! Generated company cards (`governance.md`, `events.md`).
//!
//! A card is rebuilt from downloaded data on every run. Automatic sections
//! are regenerated; manual sections are recovered from the previous file
//! with [`crate::sections`] and written back, or replaced by their default
//! template when nothing was recovered.

pub mod events;
pub mod governance;

use crate::frontmatter::parse_frontmatter;
use crate::sections::ManualSections;
use crate::sources::SourceError;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// File every company directory is expected to carry
pub const INDEX_FILE: &str = "_index.md";

#[derive(Error, Debug)]
pub enum CardError {
    #[error("Companies directory not found: {0:?}")]
    CompaniesDirMissing(PathBuf),

    #[error("Unknown ticker {ticker}: {dir:?} does not exist")]
    UnknownTicker { ticker: String, dir: PathBuf },

    #[error("Failed to list companies: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A manual section and the template used when it has no content yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualSection {
    pub title: &'static str,
    pub default_body: &'static str,
}

/// Titles of `sections`, in document order
pub fn manual_titles(sections: &[ManualSection]) -> Vec<&'static str> {
    sections.iter().map(|s| s.title).collect()
}

/// Result of regenerating one card
#[derive(Debug, Clone, PartialEq)]
pub enum FillOutcome<S> {
    Written { path: PathBuf, stats: S },
    /// Not enough downloaded data to build the card
    Skipped { reason: String },
}

/// Incremental writer for a card document
///
/// Section layout is fixed so that extracting the manual sections from the
/// output and assembling again yields the same text.
#[derive(Debug, Clone)]
pub struct CardDocument {
    out: String,
}

impl CardDocument {
    /// Start a card with frontmatter, a title heading and an intro paragraph
    pub fn new(ticker: &str, updated: NaiveDate, title: &str, intro: &str) -> Self {
        let out = format!(
            "---\nticker: {ticker}\nupdated: {}\n---\n\n# {title}\n\n{}\n\n",
            updated.format("%Y-%m-%d"),
            intro.trim_end()
        );
        Self { out }
    }

    /// Append a section regenerated from data
    pub fn auto_section(&mut self, title: &str, body: &str) {
        self.out
            .push_str(&format!("## {title}\n\n{}\n\n", body.trim_end()));
    }

    /// Append a manual section, preferring the recovered body over the template
    pub fn manual_section(&mut self, section: &ManualSection, recovered: &ManualSections) {
        let body = recovered.body_or(section.title, section.default_body);
        self.out
            .push_str(&format!("## {}\n{}\n\n", section.title, body.trim_end()));
    }

    pub fn finish(self) -> String {
        let mut text = self.out.trim_end().to_string();
        text.push('\n');
        text
    }
}

/// Log duplicated manual headings found in the previous version of a card
pub(crate) fn warn_duplicates(path: &Path, recovered: &ManualSections) {
    for title in recovered.duplicates() {
        tracing::warn!(
            "{:?}: section «{}» appears more than once; keeping the first",
            path,
            title
        );
    }
}

pub(crate) fn write_card(path: &Path, content: &str) -> Result<(), CardError> {
    std::fs::write(path, content).map_err(|source| CardError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Escape a value for use inside a pipe table cell
pub(crate) fn table_cell(text: &str) -> String {
    text.replace('|', "/").replace(['\r', '\n'], " ")
}

/// Active tickers under `companies_dir`, sorted
///
/// Directories starting with `_` or `.` are skipped, as are companies
/// marked `status: delisted` or `delisted: true` in their `_index.md`.
pub fn discover_tickers(companies_dir: &Path) -> Result<Vec<String>, CardError> {
    if !companies_dir.is_dir() {
        return Err(CardError::CompaniesDirMissing(companies_dir.to_path_buf()));
    }

    let mut tickers = Vec::new();
    for entry in WalkDir::new(companies_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('_') || name.starts_with('.') {
            continue;
        }
        if is_delisted(&entry.path().join(INDEX_FILE)) {
            tracing::debug!("Skipping delisted company {}", name);
            continue;
        }
        tickers.push(name);
    }

    Ok(tickers)
}

/// Tickers to process: the requested ones (upper-cased, must exist), or
/// every active company when none were requested
pub fn resolve_tickers(companies_dir: &Path, requested: &[String]) -> Result<Vec<String>, CardError> {
    if requested.is_empty() {
        return discover_tickers(companies_dir);
    }

    requested
        .iter()
        .map(|ticker| {
            let ticker = ticker.to_uppercase();
            let dir = companies_dir.join(&ticker);
            if dir.is_dir() {
                Ok(ticker)
            } else {
                Err(CardError::UnknownTicker { ticker, dir })
            }
        })
        .collect()
}

fn is_delisted(index_file: &Path) -> bool {
    let Ok(content) = std::fs::read_to_string(index_file) else {
        return false;
    };
    match parse_frontmatter(&content) {
        Ok((meta, _)) => {
            meta.get("status") == Some("delisted") || meta.get("delisted") == Some("true")
        }
        Err(e) => {
            tracing::warn!("Invalid frontmatter in {:?}: {}", index_file, e);
            false
        }
    }
}

/// Display name from `_index.md` (`name`, then `company`), else the ticker
pub fn company_name(companies_dir: &Path, ticker: &str) -> String {
    let index_file = companies_dir.join(ticker).join(INDEX_FILE);
    let Ok(content) = std::fs::read_to_string(&index_file) else {
        return ticker.to_string();
    };
    match parse_frontmatter(&content) {
        Ok((meta, _)) => meta
            .get("name")
            .or_else(|| meta.get("company"))
            .unwrap_or(ticker)
            .to_string(),
        Err(e) => {
            tracing::warn!("Invalid frontmatter in {:?}: {}", index_file, e);
            ticker.to_string()
        }
    }
}
