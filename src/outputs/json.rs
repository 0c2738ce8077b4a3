//! JSON and raw-response file output.
//!
//! Ticket records and flight payloads are written pretty-printed so the files
//! can be read and diffed by hand.

use crate::models::TicketRecord;
use crate::utils::ensure_writable_parent;
use serde::Serialize;
use std::error::Error;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write any serializable value as pretty-printed JSON.
#[instrument(level = "info", skip_all, fields(%path))]
pub async fn write_pretty<T: Serialize + ?Sized>(value: &T, path: &str) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(value)?;

    if let Err(e) = ensure_writable_parent(path).await {
        error!(%path, error = %e, "Output directory is not writable");
        return Err(e);
    }

    fs::write(path, json).await?;
    info!(%path, "Wrote JSON file");
    Ok(())
}

/// Persist the extracted tickets as a JSON array.
pub async fn write_tickets(tickets: &[TicketRecord], path: &str) -> Result<(), Box<dyn Error>> {
    write_pretty(tickets, path).await
}

/// Save the raw search response for debugging markup changes.
#[instrument(level = "info", skip_all, fields(%path, bytes = raw.len()))]
pub async fn write_raw_response(path: &str, raw: &str) -> Result<(), Box<dyn Error>> {
    ensure_writable_parent(path).await?;
    fs::write(path, raw).await?;
    info!(%path, "Saved search response");
    Ok(())
}
