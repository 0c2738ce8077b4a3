//! Data models for train searches, recovered tickets and flight results.
//!
//! This module defines the core data structures used throughout the application:
//! - [`SearchCriteria`]: Immutable input of one train search run
//! - [`TicketRecord`]: A ticket row recovered by the tiered extractor
//! - [`FlightResults`] and friends: Typed view of a flight search payload
//!
//! Flight models default every field because the upstream payload is not
//! validated; a missing key renders as "unknown" rather than failing the run.

use serde::{Deserialize, Serialize};

/// Input of a single train search.
///
/// Station ids are the values of the site's origin/destination combo boxes
/// and the travel date uses the site's `dd/mm/yyyy` calendar format.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchCriteria {
    /// Origin station id (e.g. `"3"` for Jeddah Airport).
    pub origin_station_id: String,
    /// Destination station id (e.g. `"5"` for Madinah).
    pub destination_station_id: String,
    /// Travel date as `dd/mm/yyyy`.
    pub travel_date: String,
    pub adults: u32,
    pub children: u32,
    pub infants: u32,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            origin_station_id: "3".to_string(),
            destination_station_id: "5".to_string(),
            travel_date: "26/09/2025".to_string(),
            adults: 2,
            children: 0,
            infants: 0,
        }
    }
}

/// A ticket row recovered from the search result page.
///
/// Serialized with the short keys used in the persisted JSON file
/// (`departure`, `arrival`, `duration`, `train_number`, `stops`). Optional
/// fields that were not recovered are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TicketRecord {
    /// Departure clock time, `HH:MM`.
    #[serde(rename = "departure")]
    pub departure_time: String,
    /// Arrival clock time, `HH:MM`.
    #[serde(rename = "arrival")]
    pub arrival_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_number: Option<String>,
    /// `"Non-stop"` or `"<N> Stop"`.
    #[serde(rename = "stops", default, skip_serializing_if = "Option::is_none")]
    pub stops_description: Option<String>,
}

/// Typed view of a flight search payload.
///
/// Only the three result categories rendered in the report are decoded; the
/// raw payload is persisted separately and untouched.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FlightResults {
    pub best_flights: Vec<FlightOption>,
    pub other_flights: Vec<FlightOption>,
    pub cheapest_flights: Vec<FlightOption>,
}

impl FlightResults {
    /// Non-empty categories in report order, with their display titles.
    pub fn categories(&self) -> Vec<(&'static str, &[FlightOption])> {
        [
            ("Cheapest Flights", self.cheapest_flights.as_slice()),
            ("Best Flights", self.best_flights.as_slice()),
            ("Other Flights", self.other_flights.as_slice()),
        ]
        .into_iter()
        .filter(|(_, items)| !items.is_empty())
        .collect()
    }
}

/// One bookable itinerary (possibly several legs).
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FlightOption {
    pub price: Option<u64>,
    /// Total travel time in minutes.
    pub total_duration: Option<u64>,
    pub airline_logo: Option<String>,
    #[serde(rename = "type")]
    pub trip_type: Option<String>,
    pub flights: Vec<FlightLeg>,
    pub layovers: Vec<Layover>,
    pub carbon_emissions: Option<CarbonEmissions>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FlightLeg {
    pub airline: Option<String>,
    pub flight_number: Option<String>,
    pub departure_airport: Airport,
    pub arrival_airport: Airport,
    /// Leg duration in minutes.
    pub duration: Option<u64>,
    pub airplane: Option<String>,
    pub travel_class: Option<String>,
    pub legroom: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Airport {
    /// IATA code.
    pub id: Option<String>,
    pub name: Option<String>,
    /// Local time as `YYYY-MM-DD HH:MM`.
    pub time: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Layover {
    pub id: Option<String>,
    pub name: Option<String>,
    /// Connection time in minutes.
    pub duration: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CarbonEmissions {
    /// Emissions relative to the route average, in percent.
    pub difference_percent: Option<i64>,
}
