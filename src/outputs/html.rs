//! Static HTML flight report.
//!
//! The report is a single self-contained file: inline CSS, no scripts, one
//! `<section>` per non-empty flight category with its options sorted by
//! ascending price. Options without a price sort last.

use crate::models::{FlightLeg, FlightOption, FlightResults};
use crate::utils::{ensure_writable_parent, escape_html, fmt_timestamp, mins_to_hhmm};
use itertools::Itertools;
use std::error::Error;
use std::fmt::{self, Write};
use tokio::fs;
use tracing::{info, instrument};

const STYLE: &str = r#"
    :root { --bg:#f6f8fb; --card:#fff; --border:#e5e7eb; --text:#111827; --muted:#6b7280; --accent:#2563eb; --chip:#eef2ff; }
    body { font-family: ui-sans-serif,system-ui,-apple-system,Segoe UI,Roboto; margin: 24px; background: var(--bg); color: var(--text); }
    header { display:flex; align-items:center; justify-content:space-between; margin-bottom:24px; }
    h1 { font-size: 22px; margin: 0; }
    .pill { background: var(--chip); padding:4px 10px; border-radius:999px; color: var(--accent); font-size:12px; }
    section { margin: 28px 0; }
    h2 { font-size: 18px; margin: 8px 0 16px; color:#0f172a; }
    .cards { display:grid; grid-template-columns: repeat(auto-fill, minmax(320px, 1fr)); gap:16px; }
    .card { background: var(--card); border:1px solid var(--border); border-radius:14px; padding:14px; box-shadow: 0 1px 2px rgb(0 0 0 / 0.04); }
    .logo { height:20px; float:right; }
    .head { display:flex; flex-direction:column; gap:6px; margin-bottom:8px; }
    .price { font-weight: 700; font-size: 18px; }
    .meta { color: var(--muted); font-size: 12px; }
    .legs { display:grid; grid-template-columns: 1fr 1fr; gap:12px; }
    .legcol h3 { font-size: 14px; margin: 8px 0; }
    ul { list-style:none; padding:0; margin:0; }
    li { padding:8px; border:1px dashed var(--border); border-radius:10px; margin-bottom:8px; background:#fafafa; }
    @media (max-width: 720px) { .legs { grid-template-columns: 1fr; } }
    footer { margin-top: 28px; color: var(--muted); font-size: 12px; }
"#;

/// Header information for a report.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub title: String,
    pub outbound_date: String,
    pub return_date: String,
    /// Airport the outbound journey ends at; used to split return legs.
    pub arrival_id: String,
    pub currency_symbol: String,
    pub generated_at: String,
}

/// Render the full report document.
pub fn build_report(results: &FlightResults, meta: &ReportMeta) -> Result<String, fmt::Error> {
    let mut html = String::new();
    writeln!(html, "<!DOCTYPE html>\n<html lang=\"en\">\n<head>")?;
    writeln!(html, "  <meta charset=\"utf-8\">")?;
    writeln!(html, "  <title>{}</title>", escape_html(&meta.title))?;
    writeln!(html, "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">")?;
    writeln!(html, "  <style>{STYLE}  </style>\n</head>\n<body>")?;
    writeln!(
        html,
        "<header>\n  <h1>{}</h1>\n  <span class=\"pill\">{} → {}</span>\n</header>",
        escape_html(&meta.title),
        escape_html(&meta.outbound_date),
        escape_html(&meta.return_date)
    )?;

    let categories = results.categories();
    if categories.is_empty() {
        writeln!(html, "<p><i>No flights found.</i></p>")?;
    }
    for (title, items) in categories {
        render_category(&mut html, title, items, meta)?;
    }

    writeln!(
        html,
        "<footer>\n  Source: SerpApi → Google Flights. Generated {}. Prices and availability may differ at booking time.\n</footer>\n</body>\n</html>",
        escape_html(&meta.generated_at)
    )?;
    Ok(html)
}

#[instrument(level = "info", skip_all, fields(%path, bytes = html.len()))]
pub async fn write_report(html: &str, path: &str) -> Result<(), Box<dyn Error>> {
    ensure_writable_parent(path).await?;
    fs::write(path, html).await?;
    info!(%path, "Wrote HTML report");
    Ok(())
}

/// Options ordered by ascending price, unpriced last.
pub fn sorted_by_price(items: &[FlightOption]) -> Vec<&FlightOption> {
    items
        .iter()
        .sorted_by_key(|f| f.price.unwrap_or(u64::MAX))
        .collect()
}

fn render_category(html: &mut String, title: &str, items: &[FlightOption], meta: &ReportMeta) -> fmt::Result {
    writeln!(html, "<section><h2>{}</h2>", escape_html(title))?;
    writeln!(html, "<div class=\"cards\">")?;
    for option in sorted_by_price(items) {
        render_card(html, option, meta)?;
    }
    writeln!(html, "</div></section>")
}

fn render_card(html: &mut String, option: &FlightOption, meta: &ReportMeta) -> fmt::Result {
    let price = option
        .price
        .map(|p| format!("{}{p}", meta.currency_symbol))
        .unwrap_or_else(|| "Unknown".to_string());
    let total = option
        .total_duration
        .map(mins_to_hhmm)
        .unwrap_or_else(|| "Unknown".to_string());
    let (outbound, inbound) = split_outbound_return(&option.flights, &meta.arrival_id);

    write!(html, "<article class=\"card\">")?;
    if let Some(logo) = option.airline_logo.as_deref().filter(|l| !l.is_empty()) {
        write!(html, "<img class=\"logo\" src=\"{}\" alt=\"logo\">", escape_html(logo))?;
    }
    write!(
        html,
        "<div class=\"head\"><span class=\"price\">{}</span><span class=\"meta\">{} • Total duration: {} • {}</span>{}</div>",
        escape_html(&price),
        escape_html(option.trip_type.as_deref().unwrap_or_default()),
        total,
        escape_html(&describe_layovers(option)),
        co2_badge(option)
    )?;
    write!(html, "<div class=\"legs\">")?;
    render_leg_column(html, "Outbound", &outbound, "Not found")?;
    render_leg_column(
        html,
        "Return",
        &inbound,
        "Not found (the API sometimes only returns the outbound journey)",
    )?;
    writeln!(html, "</div></article>")
}

fn render_leg_column(html: &mut String, heading: &str, legs: &[&FlightLeg], empty: &str) -> fmt::Result {
    write!(html, "<div class=\"legcol\"><h3>{heading}</h3>")?;
    if legs.is_empty() {
        write!(html, "<p><i>{}</i></p>", escape_html(empty))?;
    } else {
        write!(html, "<ul>")?;
        for leg in legs {
            write!(html, "{}", render_leg(leg))?;
        }
        write!(html, "</ul>")?;
    }
    write!(html, "</div>")
}

fn render_leg(leg: &FlightLeg) -> String {
    let text = |v: &Option<String>, fallback: &str| escape_html(v.as_deref().unwrap_or(fallback));
    let when = |v: &Option<String>| v.as_deref().map(fmt_timestamp).unwrap_or_else(|| "?".to_string());
    format!(
        "<li><b>{}</b> {}<br>{} {} → {} {}<br>Duration: {} • Aircraft: {} • Class: {} • Legroom: {}</li>",
        text(&leg.airline, "?"),
        text(&leg.flight_number, "?"),
        text(&leg.departure_airport.id, "?"),
        escape_html(&when(&leg.departure_airport.time)),
        text(&leg.arrival_airport.id, "?"),
        escape_html(&when(&leg.arrival_airport.time)),
        leg.duration.map(mins_to_hhmm).unwrap_or_else(|| "?".to_string()),
        text(&leg.airplane, "-"),
        text(&leg.travel_class, "-"),
        text(&leg.legroom, "-"),
    )
}

/// Split legs into outbound and return at the first leg departing from
/// `arrival_id`. When no leg departs from there, everything is outbound.
pub fn split_outbound_return<'a>(legs: &'a [FlightLeg], arrival_id: &str) -> (Vec<&'a FlightLeg>, Vec<&'a FlightLeg>) {
    let split = legs
        .iter()
        .position(|leg| {
            leg.departure_airport
                .id
                .as_deref()
                .is_some_and(|id| id.eq_ignore_ascii_case(arrival_id))
        })
        .unwrap_or(legs.len());
    (legs[..split].iter().collect(), legs[split..].iter().collect())
}

/// Human description of the stops of an itinerary.
pub fn describe_layovers(option: &FlightOption) -> String {
    if option.layovers.is_empty() {
        return match option.flights.len() {
            0 | 1 => "Non-stop".to_string(),
            n => format!("{} stop(s)", n - 1),
        };
    }
    let names = option
        .layovers
        .iter()
        .map(|l| {
            let name = l.name.as_deref().or(l.id.as_deref()).unwrap_or("Unknown");
            match l.duration {
                Some(d) => format!("{name} ({})", mins_to_hhmm(d)),
                None => name.to_string(),
            }
        })
        .join(", ");
    format!("{} stop(s): {names}", option.layovers.len())
}

/// Colored CO₂ comparison badge, or nothing when the payload has no figure.
pub fn co2_badge(option: &FlightOption) -> String {
    let Some(diff) = option.carbon_emissions.as_ref().and_then(|c| c.difference_percent) else {
        return String::new();
    };
    let color = if diff < 0 {
        "#2ecc71"
    } else if diff < 20 {
        "#e67e22"
    } else {
        "#c0392b"
    };
    let sign = if diff > 0 { "+" } else { "" };
    format!(
        "<span style=\"display:inline-block;padding:2px 6px;border-radius:6px;background:{color};color:#fff;font-size:12px;\">CO₂ {sign}{diff}% vs avg</span>"
    )
}
