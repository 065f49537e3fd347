//! Askama template definitions.

use askama::Template;
use tickerbook_core::{Forecast, IndexStats};

/// A sentiment or position badge; an empty value renders as a dash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub value: String,
}

impl Badge {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// One tile of the company metrics grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

/// An `<option>` of a filter drop-down
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

/// Dashboard index page
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub site_title: String,
    pub lang: String,
    pub updated: String,

    pub stats: IndexStats,

    // Filter drop-downs
    pub sector_options: Vec<FilterOption>,
    pub sentiment_options: Vec<String>,
    pub position_options: Vec<String>,

    /// Table rows as JSON, already safe for a `<script>` element
    pub data_json: String,
}

/// Per-company page
#[derive(Template)]
#[template(path = "company.html")]
pub struct CompanyTemplate {
    pub site_title: String,
    pub lang: String,

    pub name: String,
    pub ticker: String,
    /// Empty when the company has no sector
    pub sector_name: String,
    pub badges: Vec<Badge>,
    pub metrics: Vec<Metric>,
    pub is_stub: bool,
    pub forecast: Option<Forecast>,

    /// Price history as JSON for the chart script, if there is any
    pub price_json: Option<String>,

    /// Card body rendered by the markdown renderer
    pub body_html: String,
}
