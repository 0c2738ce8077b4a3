//! Tiered extraction of ticket rows from the search result markup.
//!
//! The result page's exact structure is not guaranteed, so three strategies
//! are tried in order, each assuming less than the previous one:
//!
//! | Tier | Strategy | Assumes |
//! |------|----------|---------|
//! | [`Tier::StructuredRows`] | `tr[data-ri]` data-table rows, fixed cell positions | PrimeFaces data table |
//! | [`Tier::GenericTables`] | any table row with two clock-time cells | some table |
//! | [`Tier::FreeText`] | consecutive clock times anywhere in the text | nothing |
//!
//! The first tier that yields a record wins; later tiers never run. Each tier
//! is a pure function of the markup. A tier that fails internally is logged
//! and counts as having found nothing.

use crate::error::ExtractionError;
use crate::models::TicketRecord;
use crate::scrapers::partial::renderable_markup;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};

/// Row-based tiers keep a row only when this many fields were recovered.
pub const MIN_POPULATED_FIELDS: usize = 3;

pub const UNKNOWN_DURATION: &str = "Unknown";

static TRAIN_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{5}\b").expect("static regex"));
static STOP_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s+stop").expect("static regex"));
static CLOCK_TIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{1,2}:\d{2}\b").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    StructuredRows,
    GenericTables,
    FreeText,
}

type TierFn = fn(&Html) -> Result<Vec<TicketRecord>, ExtractionError>;

/// Tiers in the order they are tried.
const TIERS: [(Tier, TierFn); 3] = [
    (Tier::StructuredRows, structured_rows),
    (Tier::GenericTables, generic_tables),
    (Tier::FreeText, free_text),
];

/// Outcome of one tier.
#[derive(Debug, PartialEq, Eq)]
pub enum TierOutcome {
    Found(Vec<TicketRecord>),
    Empty,
}

impl TierOutcome {
    fn from_result(tier: Tier, result: Result<Vec<TicketRecord>, ExtractionError>) -> Self {
        match result {
            Ok(records) if !records.is_empty() => TierOutcome::Found(records),
            Ok(_) => TierOutcome::Empty,
            Err(e) => {
                warn!(?tier, error = %e, "Extraction tier failed; falling through");
                TierOutcome::Empty
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Extraction {
    /// Tier that produced the records; `None` when every tier came up empty.
    pub tier: Option<Tier>,
    pub records: Vec<TicketRecord>,
    /// Tiers that ran, in order.
    pub attempted: Vec<Tier>,
}

/// Recover ticket records from a raw search response.
///
/// JSF partial-response envelopes are unwrapped first so the tiers see the
/// re-rendered markup rather than XML.
#[instrument(level = "info", skip_all, fields(bytes = raw.len()))]
pub fn extract_tickets(raw: &str) -> Extraction {
    let markup = renderable_markup(raw);
    let document = Html::parse_document(&markup);
    run_tiers(&document, &TIERS)
}

fn run_tiers(document: &Html, tiers: &[(Tier, TierFn)]) -> Extraction {
    let mut attempted = Vec::with_capacity(tiers.len());
    for &(tier, strategy) in tiers {
        attempted.push(tier);
        match TierOutcome::from_result(tier, strategy(document)) {
            TierOutcome::Found(records) => {
                info!(?tier, count = records.len(), "Tickets extracted");
                return Extraction {
                    tier: Some(tier),
                    records,
                    attempted,
                };
            }
            TierOutcome::Empty => debug!(?tier, "Tier found nothing"),
        }
    }
    info!("No tickets found by any tier");
    Extraction {
        tier: None,
        records: Vec::new(),
        attempted,
    }
}

fn selector(css: &'static str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::Selector {
        selector: css,
        reason: e.to_string(),
    })
}

/// Text content of a cell with whitespace-only fragments dropped.
fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn train_number(text: &str) -> Option<String> {
    TRAIN_NUMBER.find(text).map(|m| m.as_str().to_string())
}

/// Classify the stop count of a train-info cell.
pub fn stops_description(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    if lower.contains("non-stop") {
        return Some("Non-stop".to_string());
    }
    STOP_COUNT
        .captures(&lower)
        .map(|caps| format!("{} Stop", &caps[1]))
}

/// Fields recovered from one row before it becomes a record.
#[derive(Debug, Default)]
struct RowFields {
    departure: Option<String>,
    arrival: Option<String>,
    duration: Option<String>,
    train_number: Option<String>,
    stops: Option<String>,
}

impl RowFields {
    fn populated(&self) -> usize {
        [
            &self.departure,
            &self.arrival,
            &self.duration,
            &self.train_number,
            &self.stops,
        ]
        .iter()
        .filter(|f| f.is_some())
        .count()
    }

    /// A record needs both clock times and at least three fields overall.
    fn into_record(self) -> Option<TicketRecord> {
        if self.populated() < MIN_POPULATED_FIELDS {
            return None;
        }
        Some(TicketRecord {
            departure_time: self.departure?,
            arrival_time: self.arrival?,
            duration: self.duration,
            train_number: self.train_number,
            stops_description: self.stops,
        })
    }
}

/// Tier A: PrimeFaces data-table rows.
///
/// Cells: `[_, departure, arrival, duration, train info, ..]`. Each cell is
/// validated on its own shape; a bad cell drops that field, not the row.
fn structured_rows(document: &Html) -> Result<Vec<TicketRecord>, ExtractionError> {
    let row_sel = selector("tr[data-ri]")?;
    let cell_sel = selector(r#"td[role="gridcell"]"#)?;

    let mut records = Vec::new();
    let mut rows = 0usize;
    for row in document.select(&row_sel) {
        rows += 1;
        let cells: Vec<String> = row.select(&cell_sel).map(|c| cell_text(&c)).collect();
        if cells.len() < 5 {
            continue;
        }

        let info = &cells[4];
        let fields = RowFields {
            departure: Some(&cells[1]).filter(|t| t.contains(':')).cloned(),
            arrival: Some(&cells[2]).filter(|t| t.contains(':')).cloned(),
            duration: Some(&cells[3])
                .filter(|t| t.contains('h') || t.contains("min"))
                .cloned(),
            train_number: train_number(info),
            stops: stops_description(info),
        };
        if let Some(record) = fields.into_record() {
            records.push(record);
        }
    }
    debug!(rows, records = records.len(), "Structured rows scanned");
    Ok(records)
}

/// Tier B: any table, first row treated as header.
fn generic_tables(document: &Html) -> Result<Vec<TicketRecord>, ExtractionError> {
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td, th")?;

    let mut records = Vec::new();
    for table in document.select(&table_sel) {
        for row in table.select(&row_sel).skip(1) {
            let cells: Vec<String> = row.select(&cell_sel).map(|c| cell_text(&c)).collect();
            if cells.len() < 4 {
                continue;
            }

            let times: Vec<&String> = cells
                .iter()
                .filter(|t| t.contains(':') && t.chars().count() <= 6)
                .collect();
            if times.len() < 2 {
                continue;
            }

            let fields = RowFields {
                departure: Some(times[0].clone()),
                arrival: Some(times[1].clone()),
                duration: Some(times.get(2).map_or(UNKNOWN_DURATION, |t| t.as_str()).to_string()),
                train_number: cells.iter().find_map(|t| train_number(t)),
                stops: None,
            };
            if let Some(record) = fields.into_record() {
                records.push(record);
            }
        }
    }
    Ok(records)
}

/// Tier C: pair up every clock time in the page text.
///
/// No structural validation at all; false positives are expected.
fn free_text(document: &Html) -> Result<Vec<TicketRecord>, ExtractionError> {
    let text = document.root_element().text().collect::<Vec<_>>().join(" ");
    Ok(pair_times(&text))
}

/// Pair consecutive clock times as (departure, arrival); a trailing odd
/// time is dropped.
pub fn pair_times(text: &str) -> Vec<TicketRecord> {
    let times: Vec<&str> = CLOCK_TIME.find_iter(text).map(|m| m.as_str()).collect();
    times
        .chunks_exact(2)
        .map(|pair| TicketRecord {
            departure_time: pair[0].to_string(),
            arrival_time: pair[1].to_string(),
            duration: Some(UNKNOWN_DURATION.to_string()),
            train_number: None,
            stops_description: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn gridrow(cells: [&str; 5]) -> String {
        let tds: String = cells
            .iter()
            .map(|c| format!(r#"<td role="gridcell">{c}</td>"#))
            .collect();
        format!(r#"<tr data-ri="0">{tds}</tr>"#)
    }

    fn page(body: &str) -> String {
        format!("<html><body>{body}</body></html>")
    }

    #[test]
    fn test_structured_row_full_record() {
        let html = page(&format!(
            "<table><tbody>{}</tbody></table>",
            gridrow(["1", "08:30", "11:45", "3h 15min", "<span>Train 12345</span><span>Non-stop</span>"])
        ));
        let extraction = extract_tickets(&html);

        assert_eq!(extraction.tier, Some(Tier::StructuredRows));
        assert_eq!(extraction.attempted, vec![Tier::StructuredRows]);
        assert_eq!(
            extraction.records,
            vec![TicketRecord {
                departure_time: "08:30".to_string(),
                arrival_time: "11:45".to_string(),
                duration: Some("3h 15min".to_string()),
                train_number: Some("12345".to_string()),
                stops_description: Some("Non-stop".to_string()),
            }]
        );
    }

    #[test]
    fn test_non_stop_is_case_insensitive_with_fixed_output() {
        assert_eq!(stops_description("NON-STOP service").as_deref(), Some("Non-stop"));
        assert_eq!(stops_description("non-stop").as_deref(), Some("Non-stop"));
        assert_eq!(stops_description("Train 12345 - 2 Stops").as_deref(), Some("2 Stop"));
        assert_eq!(stops_description("Express"), None);
    }

    #[test]
    fn test_structured_row_rejects_non_colon_departure() {
        // Departure is dropped as a field; the row still has arrival,
        // duration, train number and stops, but no departure time.
        let html = page(&format!(
            "<table>{}</table>",
            gridrow(["1", "0830", "11:45", "3h 15min", "12345 Non-stop"])
        ));
        let document = Html::parse_document(&html);
        assert!(structured_rows(&document).unwrap().is_empty());
    }

    #[test]
    fn test_structured_row_with_two_fields_is_dropped() {
        let html = page(&format!(
            "<table>{}</table>",
            gridrow(["1", "08:30", "11:45", "--", "Express"])
        ));
        let document = Html::parse_document(&html);
        assert!(structured_rows(&document).unwrap().is_empty());
    }

    #[test]
    fn test_structured_row_with_three_fields_is_kept() {
        let html = page(&format!(
            "<table>{}</table>",
            gridrow(["1", "08:30", "11:45", "--", "Train 54321"])
        ));
        let document = Html::parse_document(&html);
        let records = structured_rows(&document).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].duration, None);
        assert_eq!(records[0].train_number.as_deref(), Some("54321"));
    }

    #[test]
    fn test_structured_row_needs_five_cells() {
        let html = page(
            r#"<table><tr data-ri="0"><td role="gridcell">1</td><td role="gridcell">08:30</td><td role="gridcell">11:45</td><td role="gridcell">2h</td></tr></table>"#,
        );
        let document = Html::parse_document(&html);
        assert!(structured_rows(&document).unwrap().is_empty());
    }

    #[test]
    fn test_generic_tables_skip_header_and_read_times() {
        let html = page(
            r#"<table>
                <tr><th>Dep</th><th>Arr</th><th>Dur</th><th>Train</th></tr>
                <tr><td>08:30</td><td>11:45</td><td>3:15</td><td>Train 12345</td></tr>
                <tr><td>09:00</td><td>12:00</td><td>n/a</td><td>Express</td></tr>
                <tr><td>13:00</td><td>16:10</td><td>n/a</td><td>Train 67890</td></tr>
            </table>"#,
        );
        let extraction = extract_tickets(&html);

        assert_eq!(extraction.tier, Some(Tier::GenericTables));
        assert_eq!(extraction.attempted, vec![Tier::StructuredRows, Tier::GenericTables]);
        assert_eq!(extraction.records.len(), 3);
        assert_eq!(extraction.records[0].duration.as_deref(), Some("3:15"));
        assert_eq!(extraction.records[0].train_number.as_deref(), Some("12345"));
        assert_eq!(extraction.records[1].departure_time, "09:00");
        assert_eq!(extraction.records[1].duration.as_deref(), Some(UNKNOWN_DURATION));
        assert_eq!(extraction.records[1].train_number, None);
        assert_eq!(extraction.records[2].departure_time, "13:00");
        assert_eq!(extraction.records[2].duration.as_deref(), Some(UNKNOWN_DURATION));
    }

    #[test]
    fn test_generic_table_without_durations_beats_page_text() {
        let html = page(
            r#"<p>Updated 07:00</p>
            <table>
                <tr><th>Departure</th><th>Arrival</th><th>Class</th><th>Fare</th></tr>
                <tr><td>08:30</td><td>11:45</td><td>Economy</td><td>SAR 120</td></tr>
                <tr><td>13:00</td><td>16:10</td><td>Business</td><td>SAR 310</td></tr>
            </table>"#,
        );
        let extraction = extract_tickets(&html);

        assert_eq!(extraction.tier, Some(Tier::GenericTables));
        let rows: Vec<_> = extraction
            .records
            .iter()
            .map(|r| (r.departure_time.as_str(), r.arrival_time.as_str(), r.duration.as_deref()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("08:30", "11:45", Some(UNKNOWN_DURATION)),
                ("13:00", "16:10", Some(UNKNOWN_DURATION)),
            ]
        );
    }

    #[test]
    fn test_generic_tables_ignore_long_colon_text() {
        let html = page(
            r#"<table>
                <tr><th>a</th><th>b</th><th>c</th><th>d</th></tr>
                <tr><td>Departs: 08:30</td><td>11:45</td><td>14:00</td><td>No. 24680</td></tr>
            </table>"#,
        );
        let document = Html::parse_document(&html);
        let records = generic_tables(&document).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].departure_time, "11:45");
        assert_eq!(records[0].arrival_time, "14:00");
        assert_eq!(records[0].train_number.as_deref(), Some("24680"));
    }

    #[test]
    fn test_free_text_fallback_single_pair() {
        let extraction = extract_tickets(&page("<p>08:30 ... 11:45</p>"));

        assert_eq!(extraction.tier, Some(Tier::FreeText));
        assert_eq!(
            extraction.attempted,
            vec![Tier::StructuredRows, Tier::GenericTables, Tier::FreeText]
        );
        assert_eq!(
            extraction.records,
            vec![TicketRecord {
                departure_time: "08:30".to_string(),
                arrival_time: "11:45".to_string(),
                duration: Some("Unknown".to_string()),
                train_number: None,
                stops_description: None,
            }]
        );
    }

    #[test]
    fn test_free_text_pairs_strictly_consecutive() {
        let records = pair_times("06:00 then 07:15 then 21:40");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].departure_time, "06:00");
        assert_eq!(records[0].arrival_time, "07:15");

        let records = pair_times("1:05 2:10 3:15 4:20");
        let pairs: Vec<_> = records
            .iter()
            .map(|r| (r.departure_time.as_str(), r.arrival_time.as_str()))
            .collect();
        assert_eq!(pairs, vec![("1:05", "2:10"), ("3:15", "4:20")]);
    }

    #[test]
    fn test_nothing_found() {
        let extraction = extract_tickets(&page("<p>No trains available</p>"));
        assert_eq!(extraction.tier, None);
        assert!(extraction.records.is_empty());
        assert_eq!(extraction.attempted.len(), 3);
    }

    #[test]
    fn test_empty_and_malformed_input() {
        assert!(extract_tickets("").records.is_empty());
        assert!(extract_tickets("<table><tr data-ri><td role=gridcell>").records.is_empty());
    }

    #[test]
    fn test_partial_response_is_unwrapped() {
        let raw = format!(
            r#"<?xml version='1.0' encoding='UTF-8'?><partial-response><changes><update id="f"><![CDATA[<table>{}</table>]]></update><update id="j_id1:javax.faces.ViewState:0"><![CDATA[12:34]]></update></changes></partial-response>"#,
            gridrow(["1", "07:00", "09:30", "2h 30min", "Train 11111 1 stop"])
        );
        let extraction = extract_tickets(&raw);

        assert_eq!(extraction.tier, Some(Tier::StructuredRows));
        assert_eq!(extraction.records[0].stops_description.as_deref(), Some("1 Stop"));
    }

    thread_local! {
        static CALLS: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
    }

    fn failing(_: &Html) -> Result<Vec<TicketRecord>, ExtractionError> {
        CALLS.with(|c| c.borrow_mut().push("failing"));
        Err(ExtractionError::Selector {
            selector: "tr[",
            reason: "unexpected end".to_string(),
        })
    }

    fn found(_: &Html) -> Result<Vec<TicketRecord>, ExtractionError> {
        CALLS.with(|c| c.borrow_mut().push("found"));
        Ok(pair_times("10:00 12:00"))
    }

    fn never(_: &Html) -> Result<Vec<TicketRecord>, ExtractionError> {
        CALLS.with(|c| c.borrow_mut().push("never"));
        Ok(Vec::new())
    }

    #[test]
    fn test_failing_tier_falls_through_and_later_tiers_short_circuit() {
        let document = Html::parse_document("");
        let tiers: [(Tier, TierFn); 3] = [
            (Tier::StructuredRows, failing),
            (Tier::GenericTables, found),
            (Tier::FreeText, never),
        ];

        let extraction = run_tiers(&document, &tiers);

        assert_eq!(extraction.tier, Some(Tier::GenericTables));
        assert_eq!(extraction.records.len(), 1);
        CALLS.with(|c| assert_eq!(*c.borrow(), vec!["failing", "found"]));
    }

    #[test]
    fn test_tier_outcome_from_result() {
        assert_eq!(TierOutcome::from_result(Tier::FreeText, Ok(Vec::new())), TierOutcome::Empty);
        let err = ExtractionError::Selector {
            selector: "x",
            reason: "bad".to_string(),
        };
        assert_eq!(TierOutcome::from_result(Tier::FreeText, Err(err)), TierOutcome::Empty);
    }
}
