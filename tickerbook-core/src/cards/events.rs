//! `events.md`: recent corporate events, upcoming catalysts and the manual
//! notes on guidance, IR materials and sanctions status.

use super::{
    company_name, manual_titles, table_cell, warn_duplicates, write_card, CardDocument, CardError,
    FillOutcome, ManualSection,
};
use crate::config::Config;
use crate::sections::{read_sections, ManualSections};
use crate::sources::{read_cb_meetings, Dividend, MoexEvents, TickerData, MOEX_EVENTS_FILE};
use chrono::{Duration, NaiveDate};

pub const FILE_NAME: &str = "events.md";

const GUIDANCE: ManualSection = ManualSection {
    title: "Guidance менеджмента",
    default_body: r#"
Прогнозы менеджмента из последних конференц-звонков и презентаций.

| Параметр | Прогноз менеджмента | Источник | Дата |
|----------|---------------------|----------|------|
| Рост выручки 20XX | | | |
| Маржа EBITDA 20XX | | | |
| CAPEX 20XX | | | |
| Дивидендная политика | | | |
| Долговая стратегия | | | |
"#,
};

const IR_HIGHLIGHTS: ManualSection = ManualSection {
    title: "Ключевые выдержки из IR-презентаций",
    default_body: r#"
### Последняя презентация (дата, название)

Основные тезисы:
1.
2.
3.
"#,
};

const SANCTIONS_STATUS: ManualSection = ManualSection {
    title: "Санкционный статус",
    default_body: r#"
| Параметр | Значение |
|----------|----------|
| SDN (OFAC) | да/нет |
| ЕС sanctions | да/нет |
| UK sanctions | да/нет |
| Вторичные санкции | риск для контрагентов да/нет |
| Влияние на бизнес | описание |
"#,
};

pub const MANUAL_SECTIONS: &[ManualSection] = &[GUIDANCE, IR_HIGHLIGHTS, SANCTIONS_STATUS];

const UPCOMING_TITLE: &str = "Предстоящие катализаторы";

const SOURCE_MOEX: &str = "MOEX ISS";
const DIVIDEND_IMPACT: &str = "позитив";
const CB_MEETING: &str = "Заседание ЦБ (влияет на сектор)";
const CB_IMPACT: &str = "зависит от решения";

/// Expected price impact of an IR event type
pub fn event_impact(event_type: &str) -> &'static str {
    match event_type {
        "Публикация отчетности" => "зависит от результатов",
        "Выплаты по инструментам" => "позитив",
        _ => "нейтрально",
    }
}

/// One row of an events table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    /// `YYYY-MM-DD`
    pub date: String,
    pub title: String,
    pub impact: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventStats {
    pub past: usize,
    pub upcoming: usize,
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn dividend_row(dividend: &Dividend) -> EventRow {
    EventRow {
        date: dividend.registryclosedate.clone(),
        title: format!(
            "Дивидендная отсечка: {} {}",
            dividend.amount(),
            dividend.currencyid
        ),
        impact: DIVIDEND_IMPACT,
    }
}

/// All IR events and dividend record dates, unfiltered
fn all_rows(events: &MoexEvents) -> impl Iterator<Item = EventRow> + '_ {
    let ir = events.ir_events.iter().map(|event| EventRow {
        date: event.event_date.clone(),
        title: event.title().to_string(),
        impact: event_impact(&event.event_type),
    });
    ir.chain(events.dividends.iter().map(dividend_row))
}

fn ru_plural(n: i64, one: &'static str, few: &'static str, many: &'static str) -> &'static str {
    let (last, last_two) = (n % 10, n % 100);
    if last == 1 && last_two != 11 {
        one
    } else if (2..=4).contains(&last) && !(12..=14).contains(&last_two) {
        few
    } else {
        many
    }
}

/// Human wording of the lookback window: "6 месяцев" for 180 days,
/// "45 дней" when the window is not a whole number of months
pub fn lookback_label(lookback_days: i64) -> String {
    let days = lookback_days.max(0);
    if days >= 30 && days % 30 == 0 {
        let months = days / 30;
        format!("{months} {}", ru_plural(months, "месяц", "месяца", "месяцев"))
    } else {
        format!("{days} {}", ru_plural(days, "день", "дня", "дней"))
    }
}

fn past_title(lookback_days: i64) -> String {
    format!("Последние события ({})", lookback_label(lookback_days))
}

/// Events dated within `lookback_days` before `today`, newest first
///
/// Negative windows are empty; windows reaching past the calendar range
/// include every past event.
pub fn past_events(events: &MoexEvents, today: NaiveDate, lookback_days: i64) -> Vec<EventRow> {
    let today_iso = iso(today);
    let cutoff = Duration::try_days(lookback_days.max(0))
        .and_then(|window| today.checked_sub_signed(window))
        .map_or_else(|| iso(NaiveDate::MIN), iso);

    let mut rows: Vec<EventRow> = all_rows(events)
        .filter(|row| row.date >= cutoff && row.date < today_iso)
        .collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    rows
}

/// Events dated today or later plus central bank meetings, nearest first
pub fn upcoming_events(events: &MoexEvents, cb_meetings: &[String], today: NaiveDate) -> Vec<EventRow> {
    let today_iso = iso(today);

    let mut rows: Vec<EventRow> = all_rows(events)
        .filter(|row| row.date >= today_iso)
        .chain(cb_meetings.iter().map(|date| EventRow {
            date: date.clone(),
            title: CB_MEETING.to_string(),
            impact: CB_IMPACT,
        }))
        .collect();
    rows.sort_by(|a, b| a.date.cmp(&b.date));
    rows
}

pub fn format_past_table(rows: &[EventRow], lookback_days: i64) -> String {
    let mut lines = vec![
        "| Дата | Событие | Влияние | Источник |".to_string(),
        "|------|---------|---------|----------|".to_string(),
    ];
    if rows.is_empty() {
        let label = lookback_label(lookback_days);
        let recent = if label.ends_with("месяц") || label.ends_with("день") {
            "последний"
        } else {
            "последние"
        };
        lines.push(format!("| | Нет данных за {recent} {label} | | |"));
    }
    for row in rows {
        lines.push(format!(
            "| {} | {} | {} | {SOURCE_MOEX} |",
            row.date,
            table_cell(&row.title),
            row.impact
        ));
    }
    lines.join("\n")
}

pub fn format_upcoming_table(rows: &[EventRow]) -> String {
    let mut lines = vec![
        "| Дата (ожид.) | Событие | Ожидаемое влияние |".to_string(),
        "|--------------|---------|-------------------|".to_string(),
    ];
    if rows.is_empty() {
        lines.push("| | Нет предстоящих событий | |".to_string());
    }
    for row in rows {
        lines.push(format!(
            "| {} | {} | {} |",
            row.date,
            table_cell(&row.title),
            row.impact
        ));
    }
    lines.join("\n")
}

/// Assemble the full `events.md` text
pub fn generate_events(
    ticker: &str,
    name: &str,
    past: &[EventRow],
    upcoming: &[EventRow],
    manual: &ManualSections,
    lookback_days: i64,
    today: NaiveDate,
) -> String {
    let intro = format!(
        "IR-материалы, пресс-релизы и предстоящие катализаторы.\n\
         Таблицы событий обновляются автоматически: `tickerbook fill-events {ticker}`."
    );
    let mut doc = CardDocument::new(
        ticker,
        today,
        &format!("Корпоративные события: {name} ({ticker})"),
        &intro,
    );

    doc.auto_section(&past_title(lookback_days), &format_past_table(past, lookback_days));
    doc.auto_section(UPCOMING_TITLE, &format_upcoming_table(upcoming));
    for section in MANUAL_SECTIONS {
        doc.manual_section(section, manual);
    }

    doc.finish()
}

/// Regenerate `companies/{ticker}/events.md`
///
/// `cb_meetings` is read once per batch with [`read_cb_meetings`]. Skipped
/// when `moex_events.json` is missing; a malformed file is an error.
pub fn fill_events(
    config: &Config,
    ticker: &str,
    cb_meetings: &[String],
    today: NaiveDate,
) -> Result<FillOutcome<EventStats>, CardError> {
    let companies_dir = config.companies_dir();
    let Some(events) = TickerData::new(&companies_dir, ticker).moex_events()? else {
        return Ok(FillOutcome::Skipped {
            reason: format!("no {MOEX_EVENTS_FILE}"),
        });
    };

    let past = past_events(&events, today, config.events.lookback_days);
    let upcoming = upcoming_events(&events, cb_meetings, today);

    let path = companies_dir.join(ticker).join(FILE_NAME);
    let manual = read_sections(&path, &manual_titles(MANUAL_SECTIONS));
    warn_duplicates(&path, &manual);

    let name = company_name(&companies_dir, ticker);
    let lookback_days = config.events.lookback_days;
    let content = generate_events(ticker, &name, &past, &upcoming, &manual, lookback_days, today);
    write_card(&path, &content)?;

    Ok(FillOutcome::Written {
        path,
        stats: EventStats {
            past: past.len(),
            upcoming: upcoming.len(),
        },
    })
}

/// Upcoming central bank meetings for a batch, logged and dropped on error
pub fn load_cb_meetings(config: &Config, today: NaiveDate) -> Vec<String> {
    match read_cb_meetings(&config.macro_file(), today) {
        Ok(meetings) => meetings,
        Err(e) => {
            tracing::warn!("Central bank schedule unavailable: {}", e);
            Vec::new()
        }
    }
}
