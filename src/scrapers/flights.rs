//! Flight search through SerpApi's Google Flights engine.
//!
//! The flight API is an opaque request/response collaborator. [`FlightSource`]
//! is the seam; [`SerpApiClient`] is the only real implementation. The raw
//! payload is returned untouched so it can be persisted verbatim, and decoded
//! into [`FlightResults`] separately.
//!
//! # Query defaults
//!
//! - Round trip (`type=1`), sorted by price (`sort_by=2`)
//! - English results (`hl=en`), Dutch market (`gl=nl`)

use crate::error::Error;
use crate::models::FlightResults;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, instrument};

pub const SERPAPI_ENDPOINT: &str = "https://serpapi.com/search.json";

/// Parameters of one flight search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightQuery {
    /// IATA code or city name.
    pub departure_id: String,
    pub arrival_id: String,
    /// `YYYY-MM-DD`.
    pub outbound_date: String,
    pub return_date: String,
    pub currency: String,
    pub adults: u32,
    pub country: String,
}

impl FlightQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("engine", "google_flights".to_string()),
            ("hl", "en".to_string()),
            ("gl", self.country.clone()),
            ("departure_id", self.departure_id.clone()),
            ("arrival_id", self.arrival_id.clone()),
            ("outbound_date", self.outbound_date.clone()),
            ("return_date", self.return_date.clone()),
            ("currency", self.currency.clone()),
            ("adults", self.adults.to_string()),
            ("type", "1".to_string()),
            ("sort_by", "2".to_string()),
        ]
    }
}

/// Anything that can answer a flight search with a JSON payload.
pub trait FlightSource {
    async fn search(&self, query: &FlightQuery) -> Result<serde_json::Value, Error>;
}

pub struct SerpApiClient {
    http: Client,
    api_key: String,
    endpoint: String,
}

impl std::fmt::Debug for SerpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerpApiClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl SerpApiClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            endpoint: SERPAPI_ENDPOINT.to_string(),
        })
    }
}

impl FlightSource for SerpApiClient {
    #[instrument(level = "info", skip_all, fields(from = %query.departure_id, to = %query.arrival_id))]
    async fn search(&self, query: &FlightQuery) -> Result<serde_json::Value, Error> {
        let mut params = query.params();
        params.push(("api_key", self.api_key.clone()));

        let payload: serde_json::Value = self
            .http
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await?
            .json()
            .await?;
        info!("Flight search completed");
        Ok(payload)
    }
}

/// Search and decode in one go; returns the raw payload alongside its typed view.
pub async fn fetch_flights<S: FlightSource>(
    source: &S,
    query: &FlightQuery,
) -> Result<(serde_json::Value, FlightResults), Error> {
    let payload = source.search(query).await?;
    let results: FlightResults = serde_json::from_value(payload.clone())?;
    info!(
        best = results.best_flights.len(),
        other = results.other_flights.len(),
        cheapest = results.cheapest_flights.len(),
        "Decoded flight results"
    );
    Ok((payload, results))
}
