//! Remote sources the application talks to.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Saudi Arabia Railways booking | [`sar`] | Stateful JSF form replay | Cookie jar + view-state round-trip |
//! | SerpApi Google Flights | [`flights`] | JSON API | Requires API key |
//!
//! Supporting modules:
//! - [`transport`]: HTTP seam for the form replay, with the real `reqwest` transport
//! - [`partial`]: Decoding of JSF partial-response envelopes

pub mod flights;
pub mod partial;
pub mod sar;
pub mod transport;
