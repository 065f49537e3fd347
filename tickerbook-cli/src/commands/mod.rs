//! CLI command implementations.

pub mod dashboard;
pub mod fill;
pub mod render;

pub use dashboard::build_dashboard;
pub use fill::{fill_events, fill_governance};
pub use render::render_markdown;

use anyhow::{Context, Result};
use std::path::Path;
use tickerbook_core::Config;

pub(crate) fn load_config(config_path: &Path) -> Result<Config> {
    tracing::debug!("Loading config from {:?}", config_path);
    Config::load_or_default(config_path).context("Failed to load configuration")
}
