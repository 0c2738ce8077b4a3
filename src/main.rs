//! # Rail Scout
//!
//! Two small travel-search pipelines behind one CLI:
//!
//! - **tickets**: replays the multi-step, session-based search form of the
//!   Saudi Arabia Railways booking site and recovers ticket rows from the
//!   result markup with a tiered extractor.
//! - **flights**: fetches flight offers from SerpApi's Google Flights engine
//!   and renders them into a static HTML report.
//!
//! ## Usage
//!
//! ```sh
//! rail_scout tickets --from 3 --to 5 --date 26/09/2025
//! rail_scout flights --from CMN --to MED
//! ```
//!
//! ## Architecture
//!
//! The ticket pipeline is strictly sequential:
//! 1. **Session**: GET the booking page, read the view-state, start a cookie jar
//! 2. **Form replay**: select origin, select destination, submit search
//! 3. **Extraction**: structured rows → generic tables → free text
//! 4. **Output**: JSON file and console summary
//!
//! Failures never crash the process: they are logged, a short message is
//! printed, and the run ends normally.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod error;
mod extract;
mod models;
mod outputs;
mod scrapers;
mod session;
mod utils;

use cli::{Cli, Command, FlightArgs, TicketArgs};
use config::Config;
use outputs::html::{build_report, write_report, ReportMeta};
use outputs::{json, summary};
use scrapers::flights::{fetch_flights, FlightQuery, SerpApiClient};
use scrapers::sar::scrape_tickets;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("rail_scout starting up");

    let args = Cli::parse();

    let outcome = match args.command {
        Command::Tickets(ticket_args) => {
            debug!(config = ?ticket_args.config, "Running ticket search");
            run_tickets(ticket_args).await
        }
        Command::Flights(flight_args) => {
            debug!(from = %flight_args.from, to = %flight_args.to, "Running flight search");
            run_flights(flight_args).await
        }
    };

    if let Err(e) = outcome {
        error!(error = %e, "Run failed");
        println!("❌ {e}");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run_tickets(args: TicketArgs) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);

    println!("=== SAR Train Ticket Scraper ===");
    let tickets = scrape_tickets(&config).await;

    if tickets.is_empty() {
        println!("❌ No train tickets found or an error occurred");
        if let Some(dump) = &config.output.response_dump {
            println!("Check {dump} for debugging info");
        }
        return Ok(());
    }

    println!("{}", summary::tickets_summary(&tickets));
    json::write_tickets(&tickets, &config.output.tickets_json).await?;
    println!("💾 Results saved to {}", config.output.tickets_json);
    Ok(())
}

#[instrument(level = "info", skip_all, fields(from = %args.from, to = %args.to))]
async fn run_flights(args: FlightArgs) -> Result<(), Box<dyn Error>> {
    let Some(api_key) = args.api_key.clone().filter(|k| !k.is_empty()) else {
        warn!("No SerpApi key configured");
        return Err("missing API key: pass --api-key or set SERPAPI_KEY".into());
    };

    println!("=== Flight search → JSON + HTML ===");
    let query = FlightQuery {
        departure_id: args.from.trim().to_string(),
        arrival_id: args.to.trim().to_string(),
        outbound_date: args.outbound_date.clone(),
        return_date: args.return_date.clone(),
        currency: args.currency.clone(),
        adults: args.adults,
        country: args.country.clone(),
    };

    let client = SerpApiClient::new(api_key, Duration::from_secs(args.timeout_secs))?;
    let (payload, results) = fetch_flights(&client, &query).await?;

    json::write_pretty(&payload, &args.json_output).await?;
    println!("✅ JSON saved to {}", args.json_output);

    let symbol = currency_symbol(&args.currency);
    let meta = ReportMeta {
        title: format!("Flights {} → {}", query.departure_id, query.arrival_id),
        outbound_date: query.outbound_date.clone(),
        return_date: query.return_date.clone(),
        arrival_id: query.arrival_id.to_uppercase(),
        currency_symbol: symbol.clone(),
        generated_at: Local::now().format("%Y-%m-%d %H:%M").to_string(),
    };
    let html = build_report(&results, &meta)?;
    write_report(&html, &args.html_output).await?;
    println!("✅ HTML report saved to {}", args.html_output);

    for line in summary::flights_summary(&results, &symbol) {
        println!("{line}");
    }
    Ok(())
}

fn currency_symbol(code: &str) -> String {
    match code.to_ascii_uppercase().as_str() {
        "EUR" => "€".to_string(),
        "USD" => "$".to_string(),
        "GBP" => "£".to_string(),
        other => format!("{other} "),
    }
}
