//! Saudi Arabia Railways booking search scraper.
//!
//! The booking page is a JSF form inside a Liferay portlet. There is no API;
//! the only way to get results is to replay what a browser does:
//!
//! 1. GET the home page and read the `javax.faces.ViewState` hidden input
//! 2. POST a partial update selecting the origin station
//! 3. POST a partial update selecting the destination station
//! 4. POST the search button and take the re-rendered form
//!
//! Every POST echoes the latest view-state. The server rotates it in the
//! partial-response envelope, so it is re-read after each step.

use crate::config::{Config, SiteConfig};
use crate::error::Error;
use crate::extract::extract_tickets;
use crate::models::{SearchCriteria, TicketRecord};
use crate::outputs::json::write_raw_response;
use crate::scrapers::partial::{self, VIEW_STATE_FIELD};
use crate::scrapers::transport::{FormTransport, HttpTransport};
use crate::session::{FileCookieJar, SessionState};
use crate::utils::truncate_for_log;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use url::form_urlencoded;

/// Replays the search form over a [`FormTransport`].
///
/// Consumed by [`FormClient::run`]; dropping it releases the cookie jar and
/// with it the jar's temporary file.
#[derive(Debug)]
pub struct FormClient<T> {
    transport: T,
    site: SiteConfig,
    cookies: Arc<FileCookieJar>,
}

/// Which combo box triggered a partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interaction {
    Origin,
    Destination,
}

impl<T: FormTransport> FormClient<T> {
    pub fn new(transport: T, site: SiteConfig, cookies: Arc<FileCookieJar>) -> Self {
        Self {
            transport,
            site,
            cookies,
        }
    }

    pub fn cookies(&self) -> &FileCookieJar {
        &self.cookies
    }

    /// Open a session and read the initial view-state.
    #[instrument(level = "info", skip_all)]
    pub async fn load_entry_page(&self) -> Result<SessionState, Error> {
        let home = self.site.home_url();
        let html = self
            .transport
            .get(&home)
            .await
            .map_err(|e| reattribute(e, "load_entry_page"))?;

        let Some(view_state) = partial::hidden_view_state(&html) else {
            warn!(bytes = html.len(), preview = %truncate_for_log(&html, 300), "Entry page has no view-state");
            return Err(Error::structural(format!("{VIEW_STATE_FIELD} input absent from {home}")));
        };

        info!(view_state = %truncate_for_log(&view_state, 50), cookies = self.cookies.count(), "Session opened");
        Ok(SessionState::new(Arc::clone(&self.cookies), view_state))
    }

    #[instrument(level = "info", skip_all, fields(origin = %criteria.origin_station_id))]
    pub async fn select_origin(&self, session: SessionState, criteria: &SearchCriteria) -> Result<SessionState, Error> {
        self.interact(session, criteria, Interaction::Origin).await
    }

    #[instrument(level = "info", skip_all, fields(destination = %criteria.destination_station_id))]
    pub async fn select_destination(
        &self,
        session: SessionState,
        criteria: &SearchCriteria,
    ) -> Result<SessionState, Error> {
        self.interact(session, criteria, Interaction::Destination).await
    }

    /// Press the search button; returns the raw response body.
    #[instrument(level = "info", skip_all, fields(date = %criteria.travel_date))]
    pub async fn submit_search(&self, session: SessionState, criteria: &SearchCriteria) -> Result<String, Error> {
        let body = self.search_body(&session, criteria);
        let raw = self
            .transport
            .post_partial(&self.site.ajax_url(), body)
            .await
            .map_err(|e| reattribute(e, "submit_search"))?;
        info!(bytes = raw.len(), "Search response received");
        Ok(raw)
    }

    /// Run the whole sequence and return the search response.
    pub async fn run(self, criteria: &SearchCriteria) -> Result<String, Error> {
        let session = self.load_entry_page().await?;
        let session = self.select_origin(session, criteria).await?;
        let session = self.select_destination(session, criteria).await?;
        self.submit_search(session, criteria).await
    }

    async fn interact(
        &self,
        session: SessionState,
        criteria: &SearchCriteria,
        interaction: Interaction,
    ) -> Result<SessionState, Error> {
        let step = match interaction {
            Interaction::Origin => "select_origin",
            Interaction::Destination => "select_destination",
        };
        let body = self.selection_body(&session, criteria, interaction);
        let resp = self
            .transport
            .post_partial(&self.site.ajax_url(), body)
            .await
            .map_err(|e| reattribute(e, step))?;
        debug!(bytes = resp.len(), cookies = session.cookies.count(), "Partial update received");
        Ok(session.refresh(partial::view_state_of(&resp)))
    }

    fn selection_body(&self, session: &SessionState, criteria: &SearchCriteria, interaction: Interaction) -> String {
        let site = &self.site;
        let (source, render, destination) = match interaction {
            Interaction::Origin => (
                site.field("comboStationFrom"),
                ["comboStationTo", "yourSearch", "tableResult", "botoneraSearch"]
                    .map(|f| site.field(f))
                    .join(" "),
                "",
            ),
            Interaction::Destination => (
                site.field("comboStationTo"),
                ["yourSearch", "tableResult", "botoneraSearch"]
                    .map(|f| site.field(f))
                    .join(" "),
                criteria.destination_station_id.as_str(),
            ),
        };

        let mut form = form_urlencoded::Serializer::new(String::new());
        form.append_pair("javax.faces.partial.ajax", "true")
            .append_pair("javax.faces.source", &source)
            .append_pair("javax.faces.partial.execute", &source)
            .append_pair("javax.faces.partial.render", &render)
            .append_pair(&site.field("comboStationFrom"), &criteria.origin_station_id)
            .append_pair(&site.field("comboStationTo"), destination)
            .append_pair(&site.field("choiceTravel"), "true");
        self.append_travel_fields(&mut form, criteria);
        form.append_pair(VIEW_STATE_FIELD, &session.view_state);
        form.finish()
    }

    fn search_body(&self, session: &SessionState, criteria: &SearchCriteria) -> String {
        let site = &self.site;
        let search = site.field("search");
        let form_id = site.form();

        let mut form = form_urlencoded::Serializer::new(String::new());
        form.append_pair("javax.faces.partial.ajax", "true")
            .append_pair("javax.faces.source", &search)
            .append_pair("javax.faces.partial.execute", "@all")
            .append_pair(
                "javax.faces.partial.render",
                &format!("{form_id} {}", site.dialog("dialogPromotionalCode")),
            )
            .append_pair(&search, &search)
            .append_pair(&form_id, &form_id)
            .append_pair("javax.faces.encodedURL", &site.ajax_url())
            .append_pair(&site.field("choiceTravel"), "true")
            .append_pair(&site.field("comboStationFrom"), &criteria.origin_station_id)
            .append_pair(&site.field("comboStationTo"), &criteria.destination_station_id);
        self.append_travel_fields(&mut form, criteria);
        form.append_pair(&site.field("selectedTariff"), "")
            .append_pair(&site.field("selectedTariffReturn"), "")
            .append_pair(VIEW_STATE_FIELD, &session.view_state);
        form.finish()
    }

    fn append_travel_fields(&self, form: &mut form_urlencoded::Serializer<'_, String>, criteria: &SearchCriteria) {
        let site = &self.site;
        form.append_pair(&site.field("selectCalendar"), "gregorian")
            .append_pair(&site.field("calendar"), &criteria.travel_date)
            .append_pair(&site.field("adults"), &criteria.adults.to_string())
            .append_pair(&site.field("children"), &criteria.children.to_string())
            .append_pair(&site.field("infants"), &criteria.infants.to_string());
    }
}

/// Name the form step in transport errors.
fn reattribute(err: Error, step: &'static str) -> Error {
    match err {
        Error::Connectivity { reason, .. } => Error::Connectivity { step, reason },
        other => other,
    }
}

/// Replay the search and extract tickets.
///
/// Any connectivity or structural failure is logged and yields an empty list;
/// nothing is retried.
pub async fn collect_tickets<T: FormTransport>(
    client: FormClient<T>,
    criteria: &SearchCriteria,
    response_dump: Option<&str>,
) -> Vec<TicketRecord> {
    let raw = match client.run(criteria).await {
        Ok(raw) => raw,
        // Site and network failures are expected; anything else is a local fault.
        Err(e) if e.aborts_run() => {
            warn!(error = %e, "Ticket search aborted");
            return Vec::new();
        }
        Err(e) => {
            error!(error = ?e, "Ticket search failed");
            return Vec::new();
        }
    };

    if let Some(path) = response_dump {
        if let Err(e) = write_raw_response(path, &raw).await {
            warn!(%path, error = %e, "Failed to save search response");
        }
    }

    let extraction = extract_tickets(&raw);
    info!(
        tier = ?extraction.tier,
        tiers_tried = extraction.attempted.len(),
        count = extraction.records.len(),
        "Extraction finished"
    );
    extraction.records
}

/// Run one ticket search against the live site.
#[instrument(
    level = "info",
    skip_all,
    fields(
        from = %config.criteria.origin_station_id,
        to = %config.criteria.destination_station_id,
        date = %config.criteria.travel_date,
    )
)]
pub async fn scrape_tickets(config: &Config) -> Vec<TicketRecord> {
    let cookies = match FileCookieJar::create() {
        Ok(jar) => Arc::new(jar),
        Err(e) => {
            error!(error = %e, "Could not create cookie jar");
            return Vec::new();
        }
    };
    let transport = match HttpTransport::new(&config.http, &config.site, Arc::clone(&cookies)) {
        Ok(transport) => transport,
        Err(e) => {
            error!(error = %e, "Could not build HTTP client");
            return Vec::new();
        }
    };

    let client = FormClient::new(transport, config.site.clone(), cookies);
    debug!(cookie_jar = %client.cookies().path().display(), "Starting form replay");
    collect_tickets(client, &config.criteria, config.output.response_dump.as_deref()).await
}
