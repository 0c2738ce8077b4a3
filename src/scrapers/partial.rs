//! Decoding of JSF `<partial-response>` envelopes.
//!
//! AJAX posts are answered with an XML envelope whose `<update>` elements carry
//! re-rendered component markup in CDATA sections. One of the updates is the
//! rotated view-state token:
//!
//! ```text
//! <partial-response>
//!   <changes>
//!     <update id="..:formSearchTravel"><![CDATA[<form>…</form>]]></update>
//!     <update id="j_id1:javax.faces.ViewState:0"><![CDATA[-123:456]]></update>
//!   </changes>
//! </partial-response>
//! ```

use quick_xml::Reader;
use quick_xml::events::Event;
use scraper::{Html, Selector};
use tracing::debug;

pub const VIEW_STATE_FIELD: &str = "javax.faces.ViewState";

/// One `<update>` element of a partial response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PartialResponse {
    pub updates: Vec<Update>,
}

impl PartialResponse {
    /// Parse `body` as a partial-response envelope.
    ///
    /// Returns `None` when the body is not such an envelope or the XML is
    /// malformed, in which case callers treat it as plain HTML.
    pub fn parse(body: &str) -> Option<Self> {
        if !looks_like_partial(body) {
            return None;
        }

        let mut reader = Reader::from_str(body);
        let mut updates = Vec::new();
        let mut current: Option<Update> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) if e.name().as_ref() == b"update" => {
                    let id = e
                        .try_get_attribute("id")
                        .ok()
                        .flatten()
                        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
                        .unwrap_or_default();
                    current = Some(Update {
                        id,
                        content: String::new(),
                    });
                }
                Ok(Event::CData(t)) => {
                    if let Some(update) = current.as_mut() {
                        update.content.push_str(&String::from_utf8_lossy(&t));
                    }
                }
                Ok(Event::Text(t)) => {
                    if let Some(update) = current.as_mut() {
                        update.content.push_str(&String::from_utf8_lossy(&t));
                    }
                }
                Ok(Event::End(e)) if e.name().as_ref() == b"update" => {
                    if let Some(update) = current.take() {
                        updates.push(update);
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, position = reader.buffer_position(), "Malformed partial response");
                    return None;
                }
            }
        }

        Some(Self { updates })
    }

    /// The rotated view-state token, if the server issued one.
    pub fn view_state(&self) -> Option<&str> {
        self.updates
            .iter()
            .find(|u| u.id.contains(VIEW_STATE_FIELD))
            .map(|u| u.content.trim())
            .filter(|token| !token.is_empty())
    }

    /// Concatenated markup of every non-view-state update.
    pub fn markup(&self) -> String {
        self.updates
            .iter()
            .filter(|u| !u.id.contains(VIEW_STATE_FIELD))
            .map(|u| u.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn looks_like_partial(body: &str) -> bool {
    let head = body.trim_start();
    head.starts_with("<partial-response")
        || (head.starts_with("<?xml") && body.contains("<partial-response"))
}

/// Read the view-state hidden input from a full HTML document.
pub fn hidden_view_state(html: &str) -> Option<String> {
    let input = Selector::parse(r#"input[name="javax.faces.ViewState"]"#).ok()?;
    let document = Html::parse_document(html);
    document
        .select(&input)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
        .filter(|token| !token.is_empty())
}

/// View-state carried by any server response, partial or full page.
pub fn view_state_of(body: &str) -> Option<String> {
    match PartialResponse::parse(body) {
        Some(partial) => partial.view_state().map(str::to_string),
        None => hidden_view_state(body),
    }
}

/// Markup to hand to the extractor: the unwrapped updates of a partial
/// response, or the body itself.
pub fn renderable_markup(body: &str) -> String {
    match PartialResponse::parse(body) {
        Some(partial) if !partial.updates.is_empty() => partial.markup(),
        _ => body.to_string(),
    }
}
