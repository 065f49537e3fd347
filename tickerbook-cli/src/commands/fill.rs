//! Card fill commands.

use super::load_config;
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::path::Path;
use tickerbook_core::cards::{events, governance};
use tickerbook_core::{resolve_tickers, CardError, Config, FillOutcome};

#[derive(Debug, Default)]
struct Summary {
    ok: usize,
    skipped: usize,
    failed: usize,
}

/// Run `fill` for each ticker, logging progress and a final summary
///
/// Per-ticker failures are logged and do not stop the batch; the command
/// fails at the end if any ticker failed.
fn run_batch<S>(
    label: &str,
    tickers: &[String],
    mut fill: impl FnMut(&str) -> Result<FillOutcome<S>, CardError>,
    describe: impl Fn(&S) -> String,
) -> Result<()> {
    let total = tickers.len();
    tracing::info!("{}: {} tickers", label, total);

    let mut summary = Summary::default();
    for (i, ticker) in tickers.iter().enumerate() {
        match fill(ticker) {
            Ok(FillOutcome::Written { path, stats }) => {
                summary.ok += 1;
                tracing::info!("[{}/{}] {}: OK ({})", i + 1, total, ticker, describe(&stats));
                tracing::debug!("Wrote {:?}", path);
            }
            Ok(FillOutcome::Skipped { reason }) => {
                summary.skipped += 1;
                tracing::warn!("[{}/{}] {}: skipped, {}", i + 1, total, ticker, reason);
            }
            Err(e) => {
                summary.failed += 1;
                tracing::error!("[{}/{}] {}: {}", i + 1, total, ticker, e);
            }
        }
    }

    tracing::info!(
        "{} done: {} ok, {} skipped, {} failed",
        label,
        summary.ok,
        summary.skipped,
        summary.failed
    );

    if summary.failed > 0 {
        bail!("{} of {} tickers failed", summary.failed, total);
    }
    Ok(())
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn tickers_for(config: &Config, requested: &[String]) -> Result<Vec<String>> {
    resolve_tickers(&config.companies_dir(), requested).context("Failed to select tickers")
}

/// Regenerate governance.md for the requested tickers (all when empty)
pub fn fill_governance(config_path: &Path, requested: &[String]) -> Result<()> {
    let config = load_config(config_path)?;
    let tickers = tickers_for(&config, requested)?;
    let today = today();

    run_batch(
        "fill-governance",
        &tickers,
        |ticker| governance::fill_governance(&config, ticker, today),
        |stats| {
            let sanctions = if stats.sanctioned {
                "sanctions matches"
            } else {
                "no sanctions matches"
            };
            format!("{} dividends, {}", stats.dividends, sanctions)
        },
    )
}

/// Regenerate events.md for the requested tickers (all when empty)
pub fn fill_events(config_path: &Path, requested: &[String]) -> Result<()> {
    let config = load_config(config_path)?;
    let tickers = tickers_for(&config, requested)?;
    let today = today();

    let cb_meetings = events::load_cb_meetings(&config, today);
    tracing::debug!("{} upcoming central bank meetings", cb_meetings.len());

    run_batch(
        "fill-events",
        &tickers,
        |ticker| events::fill_events(&config, ticker, &cb_meetings, today),
        |stats| format!("{} past, {} upcoming", stats.past, stats.upcoming),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn tickers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_batch_counts_outcomes_and_fails_on_error() {
        let result = run_batch(
            "test",
            &tickers(&["A", "B", "C"]),
            |ticker| match ticker {
                "A" => Ok(FillOutcome::Written {
                    path: PathBuf::from("a.md"),
                    stats: 1usize,
                }),
                "B" => Ok(FillOutcome::Skipped {
                    reason: "no data".to_string(),
                }),
                _ => Err(CardError::CompaniesDirMissing(PathBuf::from("companies"))),
            },
            |n| n.to_string(),
        );
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "1 of 3 tickers failed");
    }

    #[test]
    fn test_batch_skips_are_not_failures() {
        let result = run_batch(
            "test",
            &tickers(&["A"]),
            |_| {
                Ok(FillOutcome::<usize>::Skipped {
                    reason: "no data".to_string(),
                })
            },
            |n| n.to_string(),
        );
        assert!(result.is_ok());
    }
}
