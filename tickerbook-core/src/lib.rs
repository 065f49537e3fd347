//! # tickerbook-core
//!
//! Core library for the tickerbook investment knowledge base.
//!
//! The knowledge base is a tree of markdown cards, one directory per ticker.
//! This crate reads the data files downloaded next to those cards, regenerates
//! the generated cards while keeping their hand-written sections, and renders
//! card bodies to HTML for the static dashboard.

pub mod cards;
pub mod config;
pub mod dashboard;
pub mod frontmatter;
pub mod markdown;
pub mod models;
pub mod sections;
pub mod sources;

pub use cards::{discover_tickers, resolve_tickers, CardError, FillOutcome, ManualSection};
pub use config::Config;
pub use dashboard::{DashboardData, DashboardError, Forecast, IndexRow, IndexStats};
pub use markdown::{MarkdownRenderer, RenderOutput};
pub use models::{Company, Diagnostic, DiagnosticSeverity, Frontmatter, Sector};
pub use sections::{extract_sections, read_sections, ManualSections};
pub use sources::{PricePoint, SourceError, TickerData, Trend};
