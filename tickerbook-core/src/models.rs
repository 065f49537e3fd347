//! Content model structs for company cards, sectors and diagnostics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

/// A non-fatal problem found while processing a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable machine-readable code, e.g. "markdown.unterminated-comment"
    pub code: String,
    pub message: String,
    pub severity: DiagnosticSeverity,

    /// 1-based line in the source body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
}

impl Diagnostic {
    pub fn new(
        severity: DiagnosticSeverity,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity,
            line: None,
            source_path: None,
        }
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Warning, code, message)
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn in_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.source_path, self.line) {
            (Some(path), Some(line)) => write!(f, "{}:{}: {}", path.display(), line, self.message),
            (Some(path), None) => write!(f, "{}: {}", path.display(), self.message),
            (None, Some(line)) => write!(f, "line {}: {}", line, self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

/// Key-value metadata from the top of a markdown card
///
/// Scalars are kept as strings (numbers and booleans are stringified), so
/// callers never care whether `p_e: 5.2` was written quoted or not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    pub fields: BTreeMap<String, FrontmatterValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrontmatterValue {
    Text(String),
    List(Vec<String>),
}

impl Frontmatter {
    /// Non-empty scalar value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FrontmatterValue::Text(value)) if !value.trim().is_empty() => Some(value.trim()),
            _ => None,
        }
    }

    /// Scalar value for `key`, or the empty string
    pub fn get_or_empty(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    pub fn list(&self, key: &str) -> &[String] {
        match self.fields.get(key) {
            Some(FrontmatterValue::List(items)) => items,
            _ => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A company card (`companies/{TICKER}/_index.md`) as seen by the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct Company {
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub sentiment: String,
    pub position: String,
    pub current_price: String,
    pub fair_value: String,
    pub upside: String,
    pub p_e: String,
    pub dividend_yield: String,
    pub roe: String,
    pub market_cap: String,
    pub updated: String,

    /// Cards without a sentiment are placeholders awaiting analysis
    pub is_stub: bool,

    /// Markdown body after the frontmatter
    pub body: String,

    pub meta: Frontmatter,
    pub source_path: PathBuf,
}

impl Company {
    /// Build a company from its parsed frontmatter, falling back to the
    /// directory name for the ticker and display name
    pub fn from_card(dir_name: &str, meta: Frontmatter, body: String, source_path: PathBuf) -> Self {
        let ticker = meta.get("ticker").unwrap_or(dir_name).to_string();
        let name = meta
            .get("name")
            .or_else(|| meta.get("company"))
            .unwrap_or(dir_name)
            .to_string();

        Self {
            ticker,
            name,
            sector: meta.get_or_empty("sector"),
            sentiment: meta.get_or_empty("sentiment"),
            position: meta.get_or_empty("position"),
            current_price: meta.get_or_empty("current_price"),
            fair_value: meta.get_or_empty("my_fair_value"),
            upside: meta.get_or_empty("upside"),
            p_e: meta.get_or_empty("p_e"),
            dividend_yield: meta.get_or_empty("dividend_yield"),
            roe: meta.get_or_empty("roe"),
            market_cap: meta.get_or_empty("market_cap_rub"),
            updated: meta.get_or_empty("updated"),
            is_stub: meta.get("sentiment").is_none(),
            body,
            meta,
            source_path,
        }
    }

    /// Upside as a fraction (0.64 for "64%")
    pub fn upside_fraction(&self) -> Option<f64> {
        parse_upside(&self.upside)
    }

    /// Labelled headline metrics, in display order, skipping empty values
    pub fn metrics(&self) -> Vec<(&'static str, String)> {
        let mut metrics = Vec::new();
        let mut push = |label: &'static str, value: &str| {
            if !value.is_empty() {
                metrics.push((label, value.to_string()));
            }
        };

        push("Цена", &self.current_price);
        push("Цель", &self.fair_value);
        if let Some(upside) = self.upside_fraction() {
            let sign = if upside > 0.0 { "+" } else { "" };
            push("Upside", &format!("{}{}%", sign, (upside * 100.0).round()));
        }
        push("P/E", &self.p_e);
        push("Див. дох.", &self.dividend_yield);
        push("ROE", &self.roe);
        push("Капитализация", &self.market_cap);

        for (key, label) in [
            ("p_bv", "P/BV"),
            ("ev_ebitda", "EV/EBITDA"),
            ("net_debt_ebitda", "NetDebt/EBITDA"),
        ] {
            if let Some(value) = self.meta.get(key) {
                push(label, value);
            }
        }

        metrics
    }

    /// Tickers end up in output file names, so only plain ASCII alphanumerics are accepted
    pub fn has_safe_ticker(&self) -> bool {
        !self.ticker.is_empty() && self.ticker.chars().all(|c| c.is_ascii_alphanumeric())
    }
}

/// A sector card (`sectors/{slug}/_index.md`)
#[derive(Debug, Clone, Serialize)]
pub struct Sector {
    pub slug: String,
    pub name: String,
    pub sentiment: String,
}

/// Parse an upside figure into a fraction
///
/// Accepts `64%`, `+25%`, `-10%`, bare percentages (`64`) and fractions (`0.3`).
///
/// ```
/// use tickerbook_core::models::parse_upside;
///
/// assert_eq!(parse_upside("64%"), Some(0.64));
/// assert_eq!(parse_upside("0.3"), Some(0.3));
/// assert_eq!(parse_upside("n/a"), None);
/// ```
pub fn parse_upside(value: &str) -> Option<f64> {
    if value.trim().is_empty() {
        return None;
    }
    let has_percent = value.contains('%');
    let cleaned = value.replace(['%', '+'], "");
    let number: f64 = cleaned.trim().parse().ok()?;

    if has_percent || number.abs() > 1.0 {
        Some(number / 100.0)
    } else {
        Some(number)
    }
}

/// Parse a human-entered number ("5,2", "12%")
pub fn parse_number(value: &str) -> Option<f64> {
    let cleaned = value.replace('%', "").replace(',', ".");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}
