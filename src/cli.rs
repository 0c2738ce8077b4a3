//! Command-line interface definitions for Rail Scout.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Ticket search flags override values from the optional YAML config file.

use crate::config::Config;
use clap::{Args, Parser, Subcommand};

/// Command-line arguments for the Rail Scout application.
///
/// # Examples
///
/// ```sh
/// # Train tickets with the default route and date
/// rail_scout tickets
///
/// # Another date, results to a custom file
/// rail_scout tickets --date 01/10/2025 --adults 1 -o ./out/tickets.json
///
/// # Flight report
/// SERPAPI_KEY=... rail_scout flights --from CMN --to MED
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search available train tickets on the booking site
    Tickets(TicketArgs),
    /// Fetch flight offers and render them into an HTML report
    Flights(FlightArgs),
}

#[derive(Args, Debug)]
pub struct TicketArgs {
    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Origin station id
    #[arg(long)]
    pub from: Option<String>,

    /// Destination station id
    #[arg(long)]
    pub to: Option<String>,

    /// Travel date as dd/mm/yyyy
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub adults: Option<u32>,

    #[arg(long)]
    pub children: Option<u32>,

    #[arg(long)]
    pub infants: Option<u32>,

    /// Output path for the tickets JSON file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Save the raw search response to this path
    #[arg(long)]
    pub dump_response: Option<String>,

    /// Do not save the raw search response
    #[arg(long, conflicts_with = "dump_response")]
    pub no_dump: bool,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl TicketArgs {
    /// Apply command-line overrides on top of a loaded config.
    pub fn apply(&self, config: &mut Config) {
        let criteria = &mut config.criteria;
        if let Some(from) = &self.from {
            criteria.origin_station_id = from.clone();
        }
        if let Some(to) = &self.to {
            criteria.destination_station_id = to.clone();
        }
        if let Some(date) = &self.date {
            criteria.travel_date = date.clone();
        }
        if let Some(n) = self.adults {
            criteria.adults = n;
        }
        if let Some(n) = self.children {
            criteria.children = n;
        }
        if let Some(n) = self.infants {
            criteria.infants = n;
        }
        if let Some(output) = &self.output {
            config.output.tickets_json = output.clone();
        }
        if let Some(dump) = &self.dump_response {
            config.output.response_dump = Some(dump.clone());
        }
        if self.no_dump {
            config.output.response_dump = None;
        }
        if let Some(secs) = self.timeout_secs {
            config.http.timeout_secs = secs;
        }
    }
}

#[derive(Args, Debug)]
pub struct FlightArgs {
    /// Departure airport (IATA code or city name)
    #[arg(long, default_value = "CMN")]
    pub from: String,

    /// Arrival airport (IATA code or city name)
    #[arg(long, default_value = "MED")]
    pub to: String,

    #[arg(long, default_value_t = 2)]
    pub adults: u32,

    /// Outbound date as YYYY-MM-DD
    #[arg(long, default_value = "2025-09-10")]
    pub outbound_date: String,

    /// Return date as YYYY-MM-DD
    #[arg(long, default_value = "2025-09-20")]
    pub return_date: String,

    #[arg(long, default_value = "EUR")]
    pub currency: String,

    /// Market country code
    #[arg(long, default_value = "nl")]
    pub country: String,

    /// SerpApi key
    #[arg(long, env = "SERPAPI_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output path for the raw JSON payload
    #[arg(long, default_value = "flights.json")]
    pub json_output: String,

    /// Output path for the HTML report
    #[arg(long, default_value = "flights.html")]
    pub html_output: String,

    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}
