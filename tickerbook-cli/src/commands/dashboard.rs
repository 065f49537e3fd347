//! Dashboard command implementation.

use super::load_config;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tickerbook_core::{Company, Config, DashboardData, TickerData};
use tickerbook_render::{render_company, render_index};

/// Build `index.html` and one page per company into the output directory
pub fn build_dashboard(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    tracing::info!("Building dashboard: {}", config.site.title);

    let data = DashboardData::load(&config).context("Failed to load companies")?;
    tracing::info!(
        "Loaded {} companies, {} sectors, {} trends",
        data.companies.len(),
        data.sectors.len(),
        data.trends.len()
    );

    let output_dir = config.output_dir();
    let pages_dir = output_dir.join("companies");
    fs::create_dir_all(&pages_dir).context("Failed to create output directory")?;

    let updated = chrono::Local::now().format("%d.%m.%Y %H:%M").to_string();
    let index = render_index(&data, &config.site, &updated).context("Failed to render index")?;
    let index_path = output_dir.join("index.html");
    fs::write(&index_path, index).with_context(|| format!("Failed to write {:?}", index_path))?;

    let mut written = 0;
    let mut failed = 0;
    for company in &data.companies {
        if !company.has_safe_ticker() {
            tracing::warn!(
                "Skipping page for {:?}: ticker must be ASCII letters and digits",
                company.ticker
            );
            continue;
        }

        match write_company_page(&config, &data, company, &pages_dir) {
            Ok(()) => written += 1,
            Err(e) => {
                failed += 1;
                tracing::error!("{}: {:#}", company.ticker, e);
            }
        }
    }

    tracing::info!(
        "Dashboard written to {:?} ({} company pages, {} failed)",
        output_dir,
        written,
        failed
    );

    if failed > 0 {
        bail!("{} company pages failed", failed);
    }
    Ok(())
}

fn write_company_page(
    config: &Config,
    data: &DashboardData,
    company: &Company,
    pages_dir: &Path,
) -> Result<()> {
    let history = TickerData::new(&config.companies_dir(), &company.ticker)
        .price_history()
        .unwrap_or_else(|e| {
            tracing::warn!("{}: {}; page built without price history", company.ticker, e);
            Vec::new()
        });

    let page = render_company(company, data, &history, &config.site)
        .context("Failed to render page")?;
    for diagnostic in &page.diagnostics {
        tracing::warn!("{}", diagnostic);
    }

    let path = pages_dir.join(format!("{}.html", company.ticker));
    fs::write(&path, page.html).with_context(|| format!("Failed to write {:?}", path))?;
    tracing::debug!("Wrote {:?}", path);
    Ok(())
}
