use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_company(root: &Path, ticker: &str, moex_events: &str) -> Result<(), Box<dyn std::error::Error>> {
    let dir = root.join("companies").join(ticker);
    fs::create_dir_all(dir.join("data"))?;
    fs::write(
        dir.join("_index.md"),
        format!("---\nticker: {ticker}\nname: Сбербанк\nsector: banks\n---\n\n# Сбербанк\n"),
    )?;
    fs::write(dir.join("data").join("moex_events.json"), moex_events)?;
    Ok(())
}

#[test]
fn fill_governance_keeps_manual_sections() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_company(
        dir.path(),
        "SBER",
        r#"{"dividends": [{"registryclosedate": "2024-07-11", "value": 33.3, "currencyid": "RUB"}], "ir_events": []}"#,
    )?;
    let card = dir.path().join("companies/SBER/governance.md");
    fs::write(
        &card,
        "---\nticker: SBER\n---\n\n# old\n\n## Менеджмент\n\nCEO: Греф, с 2007 года\n\n## Дивидендная история\n\nстарые данные\n",
    )?;

    #[allow(deprecated)]
    Command::cargo_bin("tickerbook")?
        .current_dir(dir.path())
        .args(["fill-governance", "sber"])
        .assert()
        .success()
        .stderr(predicate::str::contains("1 ok, 0 skipped, 0 failed"));

    let content = fs::read_to_string(&card)?;
    assert!(content.contains("ticker: SBER"));
    assert!(content.contains("## Менеджмент\n\nCEO: Греф, с 2007 года"));
    assert!(content.contains("## Дивидендная история"));
    assert!(content.contains("2024"));
    assert!(!content.contains("старые данные"));
    // Untouched manual sections get their templates
    assert!(content.contains("## Структура акционеров"));
    assert!(content.contains("(заполняет аналитик на основе данных выше)"));

    Ok(())
}

#[test]
fn fill_governance_rejects_unknown_ticker() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_company(dir.path(), "SBER", r#"{"dividends": [], "ir_events": []}"#)?;

    #[allow(deprecated)]
    Command::cargo_bin("tickerbook")?
        .current_dir(dir.path())
        .args(["fill-governance", "SBER", "NOPE"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown ticker NOPE"));

    // Nothing is processed when the selection is invalid
    assert!(!dir.path().join("companies/SBER/governance.md").exists());

    Ok(())
}

#[test]
fn fill_events_writes_upcoming_catalysts() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_company(
        dir.path(),
        "SBER",
        r#"{"dividends": [], "ir_events": [{"event_date": "2099-03-01", "event_type": "Годовое собрание", "description": "ГОСА 2099"}]}"#,
    )?;
    write_company(dir.path(), "GAZP", "{}")?;
    fs::remove_file(dir.path().join("companies/GAZP/data/moex_events.json"))?;

    #[allow(deprecated)]
    Command::cargo_bin("tickerbook")?
        .current_dir(dir.path())
        .arg("fill-events")
        .assert()
        .success()
        .stderr(predicate::str::contains("1 ok, 1 skipped, 0 failed"));

    let content = fs::read_to_string(dir.path().join("companies/SBER/events.md"))?;
    assert!(content.contains("| 2099-03-01 | ГОСА 2099 |"));
    assert!(content.contains("## Guidance менеджмента"));
    assert!(!dir.path().join("companies/GAZP/events.md").exists());

    Ok(())
}

#[test]
fn fill_events_fails_on_malformed_data() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_company(dir.path(), "SBER", "{ not json")?;

    #[allow(deprecated)]
    Command::cargo_bin("tickerbook")?
        .current_dir(dir.path())
        .arg("fill-events")
        .assert()
        .failure()
        .stderr(predicate::str::contains("0 ok, 0 skipped, 1 failed"));

    Ok(())
}
