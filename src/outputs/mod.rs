//! Output generation for ticket and flight runs.
//!
//! # Submodules
//!
//! - [`json`]: Pretty-printed JSON files and raw response dumps
//! - [`html`]: Static, inline-styled flight report
//! - [`summary`]: Human-readable console summaries
//!
//! # Output Files
//!
//! ```text
//! available_tickets.json        # TicketRecord array
//! ticket_search_response.html   # raw search response, for debugging
//! flights.json                  # raw flight API payload
//! flights.html                  # flight report
//! ```

pub mod html;
pub mod json;
pub mod summary;
