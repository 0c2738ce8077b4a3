//! Human-readable console summaries.

use crate::models::{FlightResults, TicketRecord};
use crate::outputs::html::sorted_by_price;
use crate::utils::mins_to_hhmm;
use std::fmt::Write;

const NOT_AVAILABLE: &str = "N/A";

/// Numbered list of tickets, one block per ticket.
pub fn tickets_summary(tickets: &[TicketRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Found {} available train tickets:", tickets.len());
    let _ = writeln!(out, "{}", "=".repeat(50));
    for (i, t) in tickets.iter().enumerate() {
        let field = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let _ = writeln!(out, "\n{}. Train {}", i + 1, field(&t.train_number));
        let _ = writeln!(out, "   Departure: {}", t.departure_time);
        let _ = writeln!(out, "   Arrival: {}", t.arrival_time);
        let _ = writeln!(out, "   Duration: {}", field(&t.duration));
        let _ = writeln!(out, "   Stops: {}", field(&t.stops_description));
    }
    out
}

/// One line per non-empty category with its cheapest option.
pub fn flights_summary(results: &FlightResults, currency_symbol: &str) -> Vec<String> {
    results
        .categories()
        .into_iter()
        .filter_map(|(title, items)| {
            let cheapest = sorted_by_price(items).into_iter().next()?;
            let price = cheapest
                .price
                .map(|p| format!("{currency_symbol}{p}"))
                .unwrap_or_else(|| "unknown".to_string());
            let duration = cheapest
                .total_duration
                .map(mins_to_hhmm)
                .unwrap_or_else(|| "unknown".to_string());
            Some(format!("- {title}: lowest price {price} (total duration: {duration})"))
        })
        .collect()
}
