//! # tickerbook-render
//!
//! Dashboard page rendering for tickerbook.
//!
//! This crate turns loaded dashboard content into static HTML pages using
//! Askama templates.

pub mod pages;
pub mod templates;

pub use pages::{render_company, render_index, script_json, RenderError, RenderedPage};
pub use templates::{Badge, CompanyTemplate, FilterOption, IndexTemplate, Metric};
