//! Readers for the data files the download scripts leave under
//! `companies/{TICKER}/data/` and for the central bank schedule in
//! `russia/macro.md`.
//!
//! A missing file means "no data" and is not an error. A file that exists
//! but cannot be parsed is a [`SourceError`]; callers log it and carry on
//! without that source.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

pub const MOEX_EVENTS_FILE: &str = "moex_events.json";
pub const SANCTIONS_FILE: &str = "sanctions.json";
pub const SMARTLAB_YEARLY_FILE: &str = "smartlab_yearly.csv";
pub const PRICE_HISTORY_FILE: &str = "price_history.csv";
pub const TREND_FILE: &str = "trend.json";

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// One dividend payment as published by MOEX ISS
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    /// Record date, `YYYY-MM-DD`
    #[serde(default)]
    pub registryclosedate: String,

    #[serde(default)]
    pub value: Option<f64>,

    #[serde(default = "default_currency")]
    pub currencyid: String,
}

fn default_currency() -> String {
    String::from("RUB")
}

impl Dividend {
    pub fn amount(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }
}

/// A corporate event from the MOEX ISS calendar
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IrEvent {
    #[serde(default)]
    pub event_date: String,

    #[serde(default)]
    pub event_type: String,

    #[serde(default)]
    pub description: Option<String>,
}

impl IrEvent {
    /// Description, falling back to the event type
    pub fn title(&self) -> &str {
        match self.description.as_deref() {
            Some(desc) if !desc.trim().is_empty() => desc,
            _ => &self.event_type,
        }
    }
}

/// Contents of `moex_events.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoexEvents {
    #[serde(default)]
    pub dividends: Vec<Dividend>,

    #[serde(default)]
    pub ir_events: Vec<IrEvent>,
}

/// Contents of `sanctions.json` (OpenSanctions screening)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SanctionsReport {
    #[serde(default)]
    pub query: String,

    #[serde(default)]
    pub date: String,

    #[serde(default)]
    pub total: u64,

    #[serde(default)]
    pub relevant_matches: u64,

    #[serde(default)]
    pub results: Vec<SanctionsMatch>,
}

impl SanctionsReport {
    pub fn has_matches(&self) -> bool {
        self.relevant_matches > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SanctionsMatch {
    #[serde(default)]
    pub caption: Option<String>,

    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default)]
    pub datasets: Vec<String>,

    #[serde(default)]
    pub score: f64,
}

/// Price forecast probabilities from `trend.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    #[serde(default)]
    pub ticker: Option<String>,

    #[serde(default)]
    pub growth_probability: f64,

    #[serde(default)]
    pub decline_probability: f64,
}

/// One row of `price_history.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: String,
    pub close: f64,
    pub volume_rub: i64,
    pub market_cap_bln: f64,
}

/// Paths of the per-ticker data files
#[derive(Debug, Clone)]
pub struct TickerData {
    dir: PathBuf,
}

impl TickerData {
    pub fn new(companies_dir: &Path, ticker: &str) -> Self {
        Self {
            dir: companies_dir.join(ticker).join("data"),
        }
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub fn has(&self, file: &str) -> bool {
        self.path(file).is_file()
    }

    pub fn moex_events(&self) -> Result<Option<MoexEvents>, SourceError> {
        read_json(&self.path(MOEX_EVENTS_FILE))
    }

    pub fn sanctions(&self) -> Result<Option<SanctionsReport>, SourceError> {
        read_json(&self.path(SANCTIONS_FILE))
    }

    /// Payout ratio (percent) per year from the smart-lab export
    pub fn payout_ratios(&self) -> Result<BTreeMap<String, f64>, SourceError> {
        Ok(read_optional(&self.path(SMARTLAB_YEARLY_FILE))?
            .map(|text| parse_payout_ratios(&text))
            .unwrap_or_default())
    }

    pub fn price_history(&self) -> Result<Vec<PricePoint>, SourceError> {
        Ok(read_optional(&self.path(PRICE_HISTORY_FILE))?
            .map(|text| parse_price_history(&text))
            .unwrap_or_default())
    }
}

/// Read a file, mapping "not found" to `None`
pub fn read_optional(path: &Path) -> Result<Option<String>, SourceError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SourceError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, SourceError> {
    let Some(text) = read_optional(path)? else {
        return Ok(None);
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| SourceError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Extract payout ratios from a `;`-separated smart-lab yearly export
///
/// The first non-empty row holds the years. The first row whose label
/// mentions payout supplies the values; `,` decimals and `%` signs are
/// accepted, and only positive values are kept.
pub fn parse_payout_ratios(csv: &str) -> BTreeMap<String, f64> {
    let mut rows = csv
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split(';').map(str::trim).collect::<Vec<_>>());

    let Some(years) = rows.next() else {
        return BTreeMap::new();
    };

    let Some(payout_row) = rows.find(|row| {
        let label = row.first().map(|l| l.to_lowercase()).unwrap_or_default();
        label.contains("payout") || label.contains("дивиденд/прибыль") || label.contains("коэфф")
    }) else {
        return BTreeMap::new();
    };

    payout_row
        .iter()
        .zip(years.iter())
        .skip(1)
        .filter_map(|(value, year)| {
            let parsed: f64 = value.replace(',', ".").replace('%', "").trim().parse().ok()?;
            (parsed > 0.0).then(|| (year.to_string(), parsed))
        })
        .collect()
}

/// Parse `price_history.csv` (header row, comma separated), skipping bad rows
pub fn parse_price_history(csv: &str) -> Vec<PricePoint> {
    let mut lines = csv.lines().filter(|line| !line.trim().is_empty());
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let column = |name: &str| columns.iter().position(|c| *c == name);
    let (Some(date_col), Some(close_col)) = (column("date"), column("close")) else {
        return Vec::new();
    };
    let volume_col = column("volume_rub");
    let cap_col = column("market_cap_bln");

    let number = |cells: &[&str], col: Option<usize>| -> Option<f64> {
        match col.and_then(|c| cells.get(c)) {
            None => Some(0.0),
            Some(cell) if cell.is_empty() => Some(0.0),
            Some(cell) => cell.parse().ok(),
        }
    };

    lines
        .filter_map(|line| {
            let cells: Vec<&str> = line.split(',').map(str::trim).collect();
            let date = cells.get(date_col)?.to_string();
            Some(PricePoint {
                date,
                close: number(&cells, Some(close_col))?,
                volume_rub: number(&cells, volume_col)? as i64,
                market_cap_bln: number(&cells, cap_col)?,
            })
        })
        .collect()
}

const RU_MONTHS: &[(&str, u32)] = &[
    ("января", 1),
    ("февраля", 2),
    ("марта", 3),
    ("апреля", 4),
    ("мая", 5),
    ("июня", 6),
    ("июля", 7),
    ("августа", 8),
    ("сентября", 9),
    ("октября", 10),
    ("ноября", 11),
    ("декабря", 12),
];

static CB_SECTION_REGEX: OnceLock<Regex> = OnceLock::new();
static RU_DATE_REGEX: OnceLock<Regex> = OnceLock::new();

fn cb_section_regex() -> &'static Regex {
    CB_SECTION_REGEX.get_or_init(|| {
        Regex::new(r"(?s)##\s*Ближайшие заседания ЦБ\s*\n(.*?)(?:\n##|\z)").unwrap()
    })
}

fn ru_date_regex() -> &'static Regex {
    RU_DATE_REGEX.get_or_init(|| Regex::new(r"(\d{1,2})\s+(\w+)\s+(\d{4})").unwrap())
}

/// Parse a date like `13 февраля 2026`
pub fn parse_ru_date(text: &str) -> Option<NaiveDate> {
    let caps = ru_date_regex().captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month_name = caps[2].to_lowercase();
    let month = RU_MONTHS
        .iter()
        .find(|(name, _)| *name == month_name)
        .map(|(_, m)| *m)?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Upcoming central bank meetings from the macro note, as `YYYY-MM-DD`
///
/// Reads the table under «Ближайшие заседания ЦБ»; the first cell of each
/// row holds the date. Dates before `today` are dropped.
pub fn parse_cb_meetings(markdown: &str, today: NaiveDate) -> Vec<String> {
    let Some(section) = cb_section_regex().captures(markdown) else {
        return Vec::new();
    };

    section[1]
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('|') && !line.contains("---") && !line.contains("Дата"))
        .filter_map(|line| line.split('|').nth(1).and_then(parse_ru_date))
        .filter(|date| *date >= today)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .collect()
}

/// Read the central bank schedule; a missing note yields no meetings
pub fn read_cb_meetings(macro_file: &Path, today: NaiveDate) -> Result<Vec<String>, SourceError> {
    Ok(read_optional(macro_file)?
        .map(|text| parse_cb_meetings(&text, today))
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_moex_events_shape() {
        let json = r#"{
            "dividends": [
                {"registryclosedate": "2024-07-11", "value": 33.3, "currencyid": "RUB"},
                {"registryclosedate": "2023-05-11", "value": null}
            ],
            "ir_events": [
                {"event_date": "2025-03-01", "event_type": "Публикация отчетности"}
            ]
        }"#;
        let events: MoexEvents = serde_json::from_str(json).unwrap();
        assert_eq!(events.dividends.len(), 2);
        assert_eq!(events.dividends[1].amount(), 0.0);
        assert_eq!(events.dividends[1].currencyid, "RUB");
        assert_eq!(events.ir_events[0].title(), "Публикация отчетности");
    }

    #[test]
    fn test_ticker_data_missing_files() {
        let dir = tempdir().unwrap();
        let data = TickerData::new(dir.path(), "SBER");
        assert_eq!(data.moex_events().unwrap(), None);
        assert_eq!(data.sanctions().unwrap(), None);
        assert!(data.payout_ratios().unwrap().is_empty());
        assert!(data.price_history().unwrap().is_empty());
        assert!(!data.has(MOEX_EVENTS_FILE));
    }

    #[test]
    fn test_ticker_data_invalid_json() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("SBER").join("data");
        fs::create_dir_all(&data_dir).unwrap();
        fs::write(data_dir.join(SANCTIONS_FILE), "{not json").unwrap();

        let data = TickerData::new(dir.path(), "SBER");
        assert!(matches!(data.sanctions(), Err(SourceError::Json { .. })));
    }

    #[test]
    fn test_parse_payout_ratios() {
        let csv = "Показатель;2022;2023;2024\nВыручка;1;2;3\nPayout ratio, %;50,0%;0;55\n";
        let payout = parse_payout_ratios(csv);
        assert_eq!(payout.get("2022"), Some(&50.0));
        assert_eq!(payout.get("2023"), None);
        assert_eq!(payout.get("2024"), Some(&55.0));
    }

    #[test]
    fn test_parse_payout_ratios_without_row() {
        assert!(parse_payout_ratios("Показатель;2024\nВыручка;1\n").is_empty());
        assert!(parse_payout_ratios("").is_empty());
    }

    #[test]
    fn test_parse_price_history() {
        let csv = "date,close,volume_rub,market_cap_bln\n2025-01-10,280.5,1500000000,6000\nbad,row,x,y\n2025-01-13,282,,\n";
        let history = parse_price_history(csv);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].volume_rub, 1_500_000_000);
        assert_eq!(history[1].close, 282.0);
        assert_eq!(history[1].market_cap_bln, 0.0);
    }

    #[test]
    fn test_parse_ru_date() {
        assert_eq!(parse_ru_date(" 13 февраля 2026 "), Some(date(2026, 2, 13)));
        assert_eq!(parse_ru_date("31 февраля 2026"), None);
        assert_eq!(parse_ru_date("13 Smarch 2026"), None);
    }

    #[test]
    fn test_parse_cb_meetings() {
        let md = "# Макро\n\n## Ближайшие заседания ЦБ\n\n| Дата | Комментарий |\n|------|-------------|\n| 13 декабря 2024 | прошло |\n| 14 февраля 2025 | ожидаем снижение |\n\n## Инфляция\n| 1 марта 2025 | не заседание |\n";
        let meetings = parse_cb_meetings(md, date(2025, 1, 1));
        assert_eq!(meetings, vec!["2025-02-14".to_string()]);
    }

    #[test]
    fn test_read_cb_meetings_missing_file() {
        let dir = tempdir().unwrap();
        let meetings = read_cb_meetings(&dir.path().join("macro.md"), date(2025, 1, 1)).unwrap();
        assert!(meetings.is_empty());
    }
}
