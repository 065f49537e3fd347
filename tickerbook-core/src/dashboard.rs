//! Dashboard content: every company card, sector and trend forecast,
//! gathered into the shapes the page templates need.

use crate::cards::INDEX_FILE;
use crate::config::Config;
use crate::frontmatter::parse_frontmatter;
use crate::models::{parse_number, Company, Frontmatter, Sector};
use crate::sources::{read_json, Trend, TREND_FILE};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Failed to list {0}")]
    Walk(#[from] walkdir::Error),
}

/// Growth / flat / decline split in whole percent, summing to 100 at most
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Forecast {
    pub growth: i64,
    pub flat: i64,
    pub decline: i64,
}

impl Forecast {
    pub fn from_trend(trend: &Trend) -> Self {
        let growth = (trend.growth_probability * 100.0).round() as i64;
        let decline = (trend.decline_probability * 100.0).round() as i64;
        Self {
            growth,
            flat: (100 - growth - decline).max(0),
            decline,
        }
    }
}

/// One row of the index table, serialized into the page for client-side
/// filtering and sorting
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRow {
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub sector_name: String,
    pub sentiment: String,
    pub position: String,
    pub price: String,
    pub target: String,
    /// Whole percent
    pub upside: Option<i64>,
    pub pe: Option<f64>,
    pub div_yield: String,
    pub updated: String,
    pub is_stub: bool,
}

/// Headline numbers for the index page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexStats {
    pub total: usize,
    pub filled: usize,
    pub bullish: usize,
    pub buy: usize,
    /// Mean upside over companies that state one, whole percent
    pub avg_upside: i64,
}

impl IndexStats {
    pub fn avg_upside_label(&self) -> String {
        if self.avg_upside >= 0 {
            format!("+{}%", self.avg_upside)
        } else {
            format!("{}%", self.avg_upside)
        }
    }
}

/// Everything the dashboard is built from
#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    pub companies: Vec<Company>,
    pub sectors: BTreeMap<String, Sector>,
    /// Keyed by ticker
    pub trends: BTreeMap<String, Trend>,
}

impl DashboardData {
    pub fn load(config: &Config) -> Result<Self, DashboardError> {
        let companies_dir = config.companies_dir();
        Ok(Self {
            companies: load_companies(&companies_dir)?,
            sectors: load_sectors(&config.sectors_dir())?,
            trends: load_trends(&companies_dir)?,
        })
    }

    /// Display name of a sector slug, falling back to the slug itself
    pub fn sector_name(&self, slug: &str) -> String {
        self.sectors
            .get(slug)
            .map_or_else(|| slug.to_string(), |s| s.name.clone())
    }

    pub fn forecast(&self, ticker: &str) -> Option<Forecast> {
        self.trends.get(ticker).map(Forecast::from_trend)
    }

    pub fn stats(&self) -> IndexStats {
        let upsides: Vec<f64> = self
            .companies
            .iter()
            .filter_map(Company::upside_fraction)
            .collect();
        let avg_upside = if upsides.is_empty() {
            0
        } else {
            (upsides.iter().sum::<f64>() / upsides.len() as f64 * 100.0).round() as i64
        };

        IndexStats {
            total: self.companies.len(),
            filled: self.companies.iter().filter(|c| !c.is_stub).count(),
            bullish: self.companies.iter().filter(|c| c.sentiment == "bullish").count(),
            buy: self.companies.iter().filter(|c| c.position == "buy").count(),
            avg_upside,
        }
    }

    pub fn index_rows(&self) -> Vec<IndexRow> {
        self.companies
            .iter()
            .map(|c| IndexRow {
                ticker: c.ticker.clone(),
                name: c.name.clone(),
                sector: c.sector.clone(),
                sector_name: if c.sector.is_empty() {
                    String::new()
                } else {
                    self.sector_name(&c.sector)
                },
                sentiment: c.sentiment.clone(),
                position: c.position.clone(),
                price: c.current_price.clone(),
                target: c.fair_value.clone(),
                upside: c.upside_fraction().map(|u| (u * 100.0).round() as i64),
                pe: parse_number(&c.p_e),
                div_yield: c.dividend_yield.clone(),
                updated: c.updated.clone(),
                is_stub: c.is_stub,
            })
            .collect()
    }

    /// Distinct sector slugs, sentiments and positions used by companies
    pub fn filter_values(&self) -> (Vec<String>, Vec<String>, Vec<String>) {
        let distinct = |field: fn(&Company) -> &str| -> Vec<String> {
            self.companies
                .iter()
                .map(field)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };
        (
            distinct(|c| c.sector.as_str()),
            distinct(|c| c.sentiment.as_str()),
            distinct(|c| c.position.as_str()),
        )
    }
}

/// Sorted sub-directories of `dir` whose names do not start with `_` or `.`
fn card_dirs(dir: &Path) -> Result<Vec<(String, PathBuf)>, DashboardError> {
    if !dir.is_dir() {
        tracing::warn!("Directory {:?} not found", dir);
        return Ok(Vec::new());
    }

    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.file_type().is_dir() && !name.starts_with('_') && !name.starts_with('.') {
            dirs.push((name, entry.into_path()));
        }
    }
    Ok(dirs)
}

/// Read a card's frontmatter and body
///
/// A card with broken frontmatter is kept with empty metadata. A card that
/// cannot be read at all is logged and skipped.
fn read_card(path: &Path) -> Option<(Frontmatter, String)> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("Skipping unreadable card {:?}: {}", path, e);
            return None;
        }
    };

    match parse_frontmatter(&content) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!("Invalid frontmatter in {:?}: {}", path, e);
            let body = crate::frontmatter::split_body(&content).to_string();
            Some((Frontmatter::default(), body))
        }
    }
}

/// Load `companies/*/_index.md`; a ticker seen twice keeps its first card
pub fn load_companies(companies_dir: &Path) -> Result<Vec<Company>, DashboardError> {
    let mut seen = HashSet::new();
    let mut companies = Vec::new();

    for (name, dir) in card_dirs(companies_dir)? {
        let path = dir.join(INDEX_FILE);
        let Some((meta, body)) = read_card(&path) else {
            continue;
        };
        let company = Company::from_card(&name, meta, body, path);
        if !seen.insert(company.ticker.clone()) {
            tracing::warn!(
                "Duplicate ticker {} in {:?}; skipping",
                company.ticker,
                company.source_path
            );
            continue;
        }
        companies.push(company);
    }

    tracing::debug!("Loaded {} companies", companies.len());
    Ok(companies)
}

/// Load `sectors/*/_index.md`, keyed by directory name
pub fn load_sectors(sectors_dir: &Path) -> Result<BTreeMap<String, Sector>, DashboardError> {
    let mut sectors = BTreeMap::new();
    for (slug, dir) in card_dirs(sectors_dir)? {
        let Some((meta, _)) = read_card(&dir.join(INDEX_FILE)) else {
            continue;
        };
        sectors.insert(
            slug.clone(),
            Sector {
                name: meta.get("name").unwrap_or(&slug).to_string(),
                sentiment: meta.get_or_empty("sentiment"),
                slug,
            },
        );
    }
    Ok(sectors)
}

/// Load `companies/*/trend.json`, keyed by the ticker inside the file (or
/// the directory name); unreadable files are skipped
pub fn load_trends(companies_dir: &Path) -> Result<BTreeMap<String, Trend>, DashboardError> {
    let mut trends = BTreeMap::new();
    for (name, dir) in card_dirs(companies_dir)? {
        match read_json::<Trend>(&dir.join(TREND_FILE)) {
            Ok(Some(trend)) => {
                let ticker = trend.ticker.clone().unwrap_or(name);
                trends.insert(ticker, trend);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("{}", e),
        }
    }
    Ok(trends)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture() -> (tempfile::TempDir, Config) {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("companies/SBER/_index.md"),
            "---\nname: Сбербанк\nsector: banks\nsentiment: bullish\nposition: buy\nupside: 30%\np_e: \"4,5\"\n---\n# Сбербанк\n",
        );
        write(
            &root.join("companies/SBERP/_index.md"),
            "---\nticker: SBER\nname: Сбербанк преф\n---\n",
        );
        write(
            &root.join("companies/GAZP/_index.md"),
            "---\nname: Газпром\nsector: oil\nupside: -10%\n---\nзаглушка\n",
        );
        write(&root.join("companies/_template/_index.md"), "---\nname: T\n---\n");
        write(&root.join("companies/LKOH/notes.md"), "без карточки");
        write(
            &root.join("companies/SBER/trend.json"),
            r#"{"ticker": "SBER", "growth_probability": 0.55, "decline_probability": 0.2}"#,
        );
        write(&root.join("companies/GAZP/trend.json"), "not json");
        write(
            &root.join("sectors/banks/_index.md"),
            "---\nname: Банки\nsentiment: bullish\n---\n",
        );
        write(&root.join("tickerbook.yml"), "");
        let config = Config::from_file(root.join("tickerbook.yml")).unwrap();
        (dir, config)
    }

    #[test]
    fn test_load_dashboard_data() {
        let (_dir, config) = fixture();
        let data = DashboardData::load(&config).unwrap();

        let tickers: Vec<&str> = data.companies.iter().map(|c| c.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["GAZP", "SBER"]);
        assert_eq!(data.sectors["banks"].name, "Банки");
        assert_eq!(data.trends.len(), 1);
        assert_eq!(data.sector_name("banks"), "Банки");
        assert_eq!(data.sector_name("oil"), "oil");
    }

    #[test]
    fn test_stats_and_rows() {
        let (_dir, config) = fixture();
        let data = DashboardData::load(&config).unwrap();

        let stats = data.stats();
        assert_eq!(
            stats,
            IndexStats {
                total: 2,
                filled: 1,
                bullish: 1,
                buy: 1,
                avg_upside: 10,
            }
        );
        assert_eq!(stats.avg_upside_label(), "+10%");

        let rows = data.index_rows();
        assert_eq!(rows[1].sector_name, "Банки");
        assert_eq!(rows[1].upside, Some(30));
        assert_eq!(rows[1].pe, Some(4.5));
        assert!(rows[0].is_stub);

        let json = serde_json::to_string(&rows[0]).unwrap();
        assert!(json.contains(r#""sectorName":"oil""#));
        assert!(json.contains(r#""isStub":true"#));
    }

    #[test]
    fn test_filter_values() {
        let (_dir, config) = fixture();
        let data = DashboardData::load(&config).unwrap();
        let (sectors, sentiments, positions) = data.filter_values();
        assert_eq!(sectors, vec!["banks", "oil"]);
        assert_eq!(sentiments, vec!["bullish"]);
        assert_eq!(positions, vec!["buy"]);
    }

    #[test]
    fn test_forecast() {
        let forecast = Forecast::from_trend(&Trend {
            ticker: None,
            growth_probability: 0.55,
            decline_probability: 0.2,
        });
        assert_eq!(
            forecast,
            Forecast {
                growth: 55,
                flat: 25,
                decline: 20
            }
        );

        let lopsided = Forecast::from_trend(&Trend {
            ticker: None,
            growth_probability: 0.8,
            decline_probability: 0.4,
        });
        assert_eq!(lopsided.flat, 0);
    }

    #[test]
    fn test_unreadable_card_does_not_hide_others() {
        let (dir, config) = fixture();
        fs::write(dir.path().join("companies/GAZP/_index.md"), b"---\nname: \xff\xfe\n---\n").unwrap();
        fs::create_dir_all(dir.path().join("sectors/oil")).unwrap();
        fs::write(dir.path().join("sectors/oil/_index.md"), b"\xff\xfe").unwrap();

        let data = DashboardData::load(&config).unwrap();
        let tickers: Vec<&str> = data.companies.iter().map(|c| c.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["SBER"]);
        assert_eq!(data.sectors.len(), 1);
        assert!(data.sectors.contains_key("banks"));
    }

    #[test]
    fn test_missing_directories() {
        let dir = tempdir().unwrap();
        assert!(load_companies(&dir.path().join("companies")).unwrap().is_empty());
        assert!(load_sectors(&dir.path().join("sectors")).unwrap().is_empty());
    }
}
