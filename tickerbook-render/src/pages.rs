//! Page builders: turn loaded dashboard content into finished HTML.

use crate::templates::{Badge, CompanyTemplate, FilterOption, IndexTemplate, Metric};
use askama::Template;
use serde::Serialize;
use thiserror::Error;
use tickerbook_core::config::SiteConfig;
use tickerbook_core::{Company, DashboardData, Diagnostic, MarkdownRenderer, PricePoint};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Failed to serialize page data: {0}")]
    Json(#[from] serde_json::Error),
}

/// A rendered page plus the markdown diagnostics collected on the way
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Serialize `value` for embedding inside a `<script>` element
///
/// `</` is escaped so that string data cannot close the element early.
pub fn script_json<T: Serialize>(value: &T) -> Result<String, RenderError> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

/// Price chart sample in the compact shape the chart script reads
#[derive(Debug, Serialize)]
struct ChartPoint<'a> {
    d: &'a str,
    c: f64,
    v: i64,
}

fn price_json(history: &[PricePoint]) -> Result<Option<String>, RenderError> {
    if !history.iter().any(|p| p.close > 0.0) {
        return Ok(None);
    }
    let points: Vec<ChartPoint> = history
        .iter()
        .map(|p| ChartPoint {
            d: &p.date,
            c: p.close,
            v: p.volume_rub,
        })
        .collect();
    script_json(&points).map(Some)
}

/// Render `index.html`
pub fn render_index(
    data: &DashboardData,
    site: &SiteConfig,
    updated: &str,
) -> Result<String, RenderError> {
    let (sectors, sentiments, positions) = data.filter_values();
    let template = IndexTemplate {
        site_title: site.title.clone(),
        lang: site.lang.clone(),
        updated: updated.to_string(),
        stats: data.stats(),
        sector_options: sectors
            .into_iter()
            .map(|slug| FilterOption {
                label: data.sector_name(&slug),
                value: slug,
            })
            .collect(),
        sentiment_options: sentiments,
        position_options: positions,
        data_json: script_json(&data.index_rows())?,
    };
    Ok(template.render()?)
}

/// Render `companies/{TICKER}.html`
pub fn render_company(
    company: &Company,
    data: &DashboardData,
    history: &[PricePoint],
    site: &SiteConfig,
) -> Result<RenderedPage, RenderError> {
    let output = MarkdownRenderer::new().render(&company.body);
    let diagnostics = output
        .diagnostics
        .into_iter()
        .map(|d| d.in_file(&company.source_path))
        .collect();

    let template = CompanyTemplate {
        site_title: site.title.clone(),
        lang: site.lang.clone(),
        name: company.name.clone(),
        ticker: company.ticker.clone(),
        sector_name: if company.sector.is_empty() {
            String::new()
        } else {
            data.sector_name(&company.sector)
        },
        badges: vec![Badge::new(&company.sentiment), Badge::new(&company.position)],
        metrics: company
            .metrics()
            .into_iter()
            .map(|(label, value)| Metric {
                label: label.to_string(),
                value,
            })
            .collect(),
        is_stub: company.is_stub,
        forecast: data.forecast(&company.ticker),
        price_json: price_json(history)?,
        body_html: output.html,
    };

    Ok(RenderedPage {
        html: template.render()?,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tickerbook_core::frontmatter::parse_frontmatter;
    use tickerbook_core::{Sector, Trend};

    fn company(card: &str) -> Company {
        let (meta, body) = parse_frontmatter(card).unwrap();
        Company::from_card("SBER", meta, body, PathBuf::from("companies/SBER/_index.md"))
    }

    fn data_with(company: Company) -> DashboardData {
        let mut data = DashboardData {
            companies: vec![company],
            ..Default::default()
        };
        data.sectors.insert(
            "banks".to_string(),
            Sector {
                slug: "banks".to_string(),
                name: "Банки".to_string(),
                sentiment: String::new(),
            },
        );
        data.trends.insert(
            "SBER".to_string(),
            Trend {
                ticker: Some("SBER".to_string()),
                growth_probability: 0.6,
                decline_probability: 0.1,
            },
        );
        data
    }

    #[test]
    fn test_script_json_escapes_closing_tags() {
        let json = script_json(&vec!["</script><script>alert(1)</script>"]).unwrap();
        insta::assert_snapshot!(json, @r#"["<\/script><script>alert(1)<\/script>"]"#);
    }

    #[test]
    fn test_render_company_page() {
        let sber = company(
            "---\nname: Сбербанк\nsector: banks\nsentiment: bullish\nposition: buy\ncurrent_price: \"300\"\nupside: 20%\n---\n## Тезисы\n\n<script>alert(1)</script>\n",
        );
        let data = data_with(sber.clone());
        let history = vec![PricePoint {
            date: "2025-01-10".to_string(),
            close: 280.5,
            volume_rub: 1000,
            market_cap_bln: 6000.0,
        }];

        let page = render_company(&sber, &data, &history, &SiteConfig::default()).unwrap();
        assert!(page.diagnostics.is_empty());
        assert!(page.html.contains("<h2>Тезисы</h2>"));
        assert!(page.html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!page.html.contains("<script>alert(1)"));
        assert!(page.html.contains("Банки"));
        assert!(page.html.contains(r#"class="badge badge-bullish""#));
        assert!(page.html.contains("+20%"));
        assert!(page.html.contains("width:60%"));
        assert!(page.html.contains(r#"{"d":"2025-01-10","c":280.5,"v":1000}"#));
        assert!(!page.html.contains(r#"class="stub-banner""#));
    }

    #[test]
    fn test_render_stub_company() {
        let stub = company("---\nname: Сбербанк\n---\ntext <!-- draft");
        let data = DashboardData {
            companies: vec![stub.clone()],
            ..Default::default()
        };

        let page = render_company(&stub, &data, &[], &SiteConfig::default()).unwrap();
        assert!(page.html.contains(r#"class="stub-banner""#));
        assert!(!page.html.contains(r#"class="price-history""#));
        assert!(!page.html.contains(r#"class="forecast-bar""#));
        assert_eq!(page.diagnostics.len(), 1);
        assert_eq!(
            page.diagnostics[0].source_path,
            Some(PathBuf::from("companies/SBER/_index.md"))
        );
    }

    #[test]
    fn test_render_index_page() {
        let sber = company("---\nname: \"Сбер </script>\"\nsector: banks\nsentiment: bullish\n---\n");
        let data = data_with(sber);

        let html = render_index(&data, &SiteConfig::default(), "2025-03-01").unwrap();
        assert!(html.contains("<title>Инвестиционный дашборд</title>"));
        assert!(html.contains("Обновлено: 2025-03-01"));
        assert!(html.contains(r#"<option value="banks">Банки</option>"#));
        assert!(html.contains(r#""name":"Сбер <\/script>""#));
        assert!(!html.contains("Сбер </script>"));
    }
}
