//! `governance.md`: dividend history, sanctions screening and the manual
//! corporate governance notes used for the GOD discount.

use super::{
    company_name, manual_titles, table_cell, warn_duplicates, write_card, CardDocument, CardError,
    FillOutcome, ManualSection,
};
use crate::config::{Config, GovernanceConfig};
use crate::sections::{read_sections, ManualSections};
use crate::sources::{
    Dividend, SanctionsReport, SourceError, TickerData, MOEX_EVENTS_FILE, SANCTIONS_FILE,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const FILE_NAME: &str = "governance.md";

const SHAREHOLDERS: ManualSection = ManualSection {
    title: "Структура акционеров",
    default_body: r#"
| Акционер | Доля, % | Тип |
|----------|---------|-----|
| | | Государство / Частный / Менеджмент / Free-float |
| | | |
| | | |
| Free-float | | |

**Доля государства (прямая + косвенная):** X%
**Казначейские акции:** X% (есть ли план по гашению?)
"#,
};

const DIVIDEND_POLICY: ManualSection = ManualSection {
    title: "Дивидендная политика",
    default_body: r#"
**Текст политики:** (скопировать из устава / решения совета директоров)

> "Цитата из дивидендной политики компании"

| Параметр | Значение |
|----------|----------|
| Payout ratio (цель) | X% от ЧП МСФО/РСБУ |
| Дата ГОСА (обычно) | месяц |
| Реестр (обычно) | через X дней после ГОСА |
"#,
};

const BUYBACK: ManualSection = ManualSection {
    title: "Программа buyback",
    default_body: r#"
| Параметр | Значение |
|----------|----------|
| Объявлена | да/нет |
| Объём | X млрд ₽ / X% капитализации |
| Срок | до 20XX |
| Выкуплено к дате | X млрд ₽ |
| Цель | гашение / казначейский пакет / мотивация менеджмента |
"#,
};

const MANAGEMENT: ManualSection = ManualSection {
    title: "Менеджмент",
    default_body: r#"
| Должность | Имя | С какого года | Комментарий |
|-----------|-----|---------------|-------------|
| CEO | | | |
| CFO | | | |
| Председатель СД | | | |

**KPI менеджмента привязаны к капитализации?** да/нет
**Менеджмент владеет акциями?** да (X%) / нет
"#,
};

const RISKS: ManualSection = ManualSection {
    title: "Риски корпоративного управления",
    default_body: r#"
- [ ] Допэмиссии за последние 5 лет (размытие)
- [ ] Сделки с аффилированными лицами
- [ ] Смена аудитора
- [ ] Задержка публикации отчётности
- [ ] Казначейские акции > 10% без плана гашения
"#,
};

const GOD_DISCOUNT: ManualSection = ManualSection {
    title: "Расчёт GOD-дисконта",
    default_body: r#"
(заполняет аналитик на основе данных выше)

| Фактор | Значение | Дисконт |
|--------|----------|---------|
| Гос. владение > 50%? | да/нет | |
| Payout | X% | базовый: X% |
| Казначейские > 20%? | да/нет | X% |
| Рост дивидендов > 3 лет? | да/нет | X% |
| Менеджмент-чиновники? | да/нет | X% |
| **Итого GOD** | | **X%** |
"#,
};

/// Manual sections in document order
pub const MANUAL_SECTIONS: &[ManualSection] = &[
    SHAREHOLDERS,
    DIVIDEND_POLICY,
    BUYBACK,
    MANAGEMENT,
    RISKS,
    GOD_DISCOUNT,
];

const DIVIDEND_HISTORY_TITLE: &str = "Дивидендная история";
const SANCTIONS_TITLE: &str = "Санкционный скрининг";

/// Downloaded inputs for one company
#[derive(Debug, Clone, Default)]
pub struct GovernanceData {
    pub dividends: Vec<Dividend>,
    /// Payout ratio in percent, keyed by year
    pub payout: BTreeMap<String, f64>,
    pub sanctions: Option<SanctionsReport>,
}

/// What the progress log reports for a written card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GovernanceStats {
    pub dividends: usize,
    pub sanctioned: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub date: String,
    pub value: f64,
    pub currency: String,
}

/// Dividend payments grouped by record-date year
#[derive(Debug, Clone, PartialEq)]
pub struct DividendAnalysis {
    pub by_year: BTreeMap<String, Vec<Payment>>,
    /// Years in a row with payments, counted back from the latest paying year
    pub consecutive_years: usize,
    pub total_years: usize,
    pub frequency: &'static str,
    pub first_year: String,
    pub last_year: String,
}

impl Default for DividendAnalysis {
    fn default() -> Self {
        Self {
            by_year: BTreeMap::new(),
            consecutive_years: 0,
            total_years: 0,
            frequency: "—",
            first_year: "—".to_string(),
            last_year: "—".to_string(),
        }
    }
}

impl DividendAnalysis {
    pub fn year_total(&self, year: &str) -> f64 {
        self.by_year
            .get(year)
            .map_or(0.0, |payments| payments.iter().map(|p| p.value).sum())
    }
}

/// Group positive payments by year and derive payout regularity
pub fn analyze_dividends(dividends: &[Dividend]) -> DividendAnalysis {
    let mut by_year: BTreeMap<String, Vec<Payment>> = BTreeMap::new();
    for dividend in dividends {
        let Some(year) = dividend.registryclosedate.get(..4) else {
            continue;
        };
        if !year.chars().all(|c| c.is_ascii_digit()) || dividend.amount() <= 0.0 {
            continue;
        }
        by_year.entry(year.to_string()).or_default().push(Payment {
            date: dividend.registryclosedate.clone(),
            value: dividend.amount(),
            currency: dividend.currencyid.clone(),
        });
    }

    let (Some(first), Some(last)) = (by_year.keys().next(), by_year.keys().next_back()) else {
        return DividendAnalysis::default();
    };
    let first_year = first.clone();
    let last_year = last.clone();

    let mut consecutive_years = 0;
    if let Ok(last) = last_year.parse::<i32>() {
        let mut year = last;
        while by_year.contains_key(&year.to_string()) {
            consecutive_years += 1;
            year -= 1;
        }
    }

    let payments: usize = by_year.values().map(Vec::len).sum();
    let average = payments as f64 / by_year.len() as f64;
    let frequency = if average >= 3.5 {
        "4 раза в год"
    } else if average >= 1.5 {
        "2 раза в год"
    } else {
        "1 раз в год"
    };

    DividendAnalysis {
        total_years: by_year.len(),
        by_year,
        consecutive_years,
        frequency,
        first_year,
        last_year,
    }
}

/// Body of the «Дивидендная история» section
pub fn format_dividend_history(
    ticker: &str,
    dividends: &[Dividend],
    payout: &BTreeMap<String, f64>,
    recent_payments: usize,
) -> String {
    if dividends.is_empty() {
        return format!(
            "*Нет данных о дивидендах. Скачайте: `make download-events TICKER={ticker}`*"
        );
    }

    let analysis = analyze_dividends(dividends);
    let mut lines = vec![
        format!("**Периодичность:** {}", analysis.frequency),
        format!(
            "**Стабильность выплат:** платили {} лет подряд (всего {} лет с {})",
            analysis.consecutive_years, analysis.total_years, analysis.first_year
        ),
        String::new(),
        "| Год | Дивиденд на акцию | Выплат в году | Payout ratio |".to_string(),
        "|-----|-------------------|---------------|--------------|".to_string(),
    ];

    for (year, payments) in analysis.by_year.iter().rev() {
        let currency = payments.first().map_or("RUB", |p| p.currency.as_str());
        let payout = payout
            .get(year)
            .map_or_else(|| "—".to_string(), |p| format!("{p:.0}%"));
        lines.push(format!(
            "| {year} | {:.2} {currency} | {} | {payout} |",
            analysis.year_total(year),
            payments.len()
        ));
    }

    let mut recent: Vec<&Dividend> = dividends.iter().collect();
    recent.sort_by(|a, b| b.registryclosedate.cmp(&a.registryclosedate));
    recent.truncate(recent_payments);

    if !recent.is_empty() {
        lines.push(String::new());
        lines.push("### Последние выплаты".to_string());
        lines.push(String::new());
        lines.push("| Дата закрытия реестра | Дивиденд | Валюта |".to_string());
        lines.push("|----------------------|----------|--------|".to_string());
        for dividend in recent {
            let date = if dividend.registryclosedate.is_empty() {
                "—"
            } else {
                &dividend.registryclosedate
            };
            lines.push(format!(
                "| {date} | {:.2} | {} |",
                dividend.amount(),
                dividend.currencyid
            ));
        }
    }

    lines.join("\n")
}

/// Body of the «Санкционный скрининг» section
pub fn format_sanctions(
    ticker: &str,
    report: Option<&SanctionsReport>,
    score_threshold: f64,
) -> String {
    let Some(report) = report else {
        return format!("*Нет данных. Скачайте: `make download-governance TICKER={ticker}`*");
    };

    let mut lines = vec![
        format!(
            "*Автоматический скрининг OpenSanctions (запрос: «{}», дата: {})*",
            report.query, report.date
        ),
        String::new(),
    ];

    if report.has_matches() {
        lines.push(format!(
            "**Результат: найдено {} совпадений**",
            report.relevant_matches
        ));
        lines.push(String::new());
        lines.push("| Имя | Тип | Датасеты | Score |".to_string());
        lines.push("|-----|-----|----------|-------|".to_string());
        for hit in report.results.iter().filter(|r| r.score > score_threshold) {
            let datasets = hit
                .datasets
                .iter()
                .take(5)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!(
                "| {} | {} | {} | {:.2} |",
                table_cell(hit.caption.as_deref().unwrap_or("—")),
                table_cell(hit.schema.as_deref().unwrap_or("—")),
                table_cell(&datasets),
                hit.score
            ));
        }
    } else {
        lines.push(format!(
            "**Результат: совпадений не найдено** (проверено {} записей)",
            report.total
        ));
    }

    lines.push(String::new());
    lines.push("*Проверьте вручную для точности: SDN (OFAC), ЕС, UK списки.*".to_string());
    lines.join("\n")
}

/// Assemble the full `governance.md` text
pub fn generate_governance(
    ticker: &str,
    name: &str,
    data: &GovernanceData,
    manual: &ManualSections,
    settings: &GovernanceConfig,
    today: NaiveDate,
) -> String {
    let intro = format!(
        "Данные для расчёта GOD-дисконта и оценки рисков корпоративного управления.\n\
         Автоматические секции обновляются: `tickerbook fill-governance {ticker}`."
    );
    let mut doc = CardDocument::new(
        ticker,
        today,
        &format!("Корпоративное управление: {name} ({ticker})"),
        &intro,
    );

    doc.manual_section(&SHAREHOLDERS, manual);
    doc.manual_section(&DIVIDEND_POLICY, manual);
    doc.auto_section(
        DIVIDEND_HISTORY_TITLE,
        &format_dividend_history(ticker, &data.dividends, &data.payout, settings.recent_payments),
    );
    doc.manual_section(&BUYBACK, manual);
    doc.manual_section(&MANAGEMENT, manual);
    doc.auto_section(
        SANCTIONS_TITLE,
        &format_sanctions(ticker, data.sanctions.as_ref(), settings.sanctions_score_threshold),
    );
    doc.manual_section(&RISKS, manual);
    doc.manual_section(&GOD_DISCOUNT, manual);

    doc.finish()
}

/// Regenerate `companies/{ticker}/governance.md`
///
/// Skipped when neither `moex_events.json` nor `sanctions.json` exists.
/// Unreadable data files are logged and treated as missing.
pub fn fill_governance(
    config: &Config,
    ticker: &str,
    today: NaiveDate,
) -> Result<FillOutcome<GovernanceStats>, CardError> {
    let companies_dir = config.companies_dir();
    let data_files = TickerData::new(&companies_dir, ticker);
    if !data_files.has(MOEX_EVENTS_FILE) && !data_files.has(SANCTIONS_FILE) {
        return Ok(FillOutcome::Skipped {
            reason: format!("no {MOEX_EVENTS_FILE} or {SANCTIONS_FILE}"),
        });
    }

    let data = GovernanceData {
        dividends: or_log(ticker, data_files.moex_events())
            .flatten()
            .map(|events| events.dividends)
            .unwrap_or_default(),
        payout: or_log(ticker, data_files.payout_ratios()).unwrap_or_default(),
        sanctions: or_log(ticker, data_files.sanctions()).flatten(),
    };

    let path = companies_dir.join(ticker).join(FILE_NAME);
    let manual = read_sections(&path, &manual_titles(MANUAL_SECTIONS));
    warn_duplicates(&path, &manual);

    let name = company_name(&companies_dir, ticker);
    let content = generate_governance(ticker, &name, &data, &manual, &config.governance, today);
    write_card(&path, &content)?;

    Ok(FillOutcome::Written {
        path,
        stats: GovernanceStats {
            dividends: data.dividends.len(),
            sanctioned: data.sanctions.as_ref().is_some_and(SanctionsReport::has_matches),
        },
    })
}

fn or_log<T>(ticker: &str, result: Result<T, SourceError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("{}: {}; continuing without it", ticker, e);
            None
        }
    }
}
