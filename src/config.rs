//! Runtime configuration for the ticket scraper.
//!
//! Every value the booking site needs (endpoint, portlet namespace, JSF
//! component ids) lives in [`SiteConfig`] rather than in module literals, so a
//! markup change on the site is a config edit. A YAML file can override any
//! subset of fields; command-line flags are applied on top by `main`.
//!
//! ```yaml
//! http:
//!   timeout_secs: 20
//! criteria:
//!   origin_station_id: "3"
//!   destination_station_id: "5"
//!   travel_date: "26/09/2025"
//! ```

use crate::error::Error;
use crate::models::SearchCriteria;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub http: HttpConfig,
    pub criteria: SearchCriteria,
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a YAML file, or defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self, Error> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(Path::new(path))?;
        let config: Config = serde_yaml::from_str(&raw)?;
        info!(%path, "Loaded configuration");
        Ok(config)
    }
}

/// Where and how to talk to the booking site.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    pub home_path: String,
    /// Liferay portlet namespace prefixed to every JSF component id.
    pub portlet_namespace: String,
    pub form_id: String,
    /// JSF view backing the AJAX endpoint.
    pub faces_view_resource: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sar.hhr.sa".to_string(),
            home_path: "/web/booking/home".to_string(),
            portlet_namespace: "_ossportlet_WAR_ossliferay_".to_string(),
            form_id: "formSearchTravel".to_string(),
            faces_view_resource: "/WEB-INF/views/searchTravelResult.xhtml".to_string(),
        }
    }
}

impl SiteConfig {
    pub fn home_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.home_path)
    }

    /// Portlet resource URL that accepts the partial-update posts.
    pub fn ajax_url(&self) -> String {
        let portlet_id = self.portlet_namespace.trim_matches('_');
        format!(
            "{home}?p_p_id={portlet_id}&p_p_lifecycle=2&p_p_state=normal&p_p_mode=view\
             &p_p_cacheability=cacheLevelPage&p_p_col_id=column-2&p_p_col_count=1\
             &{ns}_jsfBridgeAjax=true&{ns}_facesViewIdResource={view}",
            home = self.home_url(),
            ns = self.portlet_namespace,
            view = urlencoding::encode(&self.faces_view_resource),
        )
    }

    /// Fully qualified id of the search form.
    pub fn form(&self) -> String {
        format!("{}:{}", self.portlet_namespace, self.form_id)
    }

    /// Fully qualified id of a component inside the search form.
    pub fn field(&self, name: &str) -> String {
        format!("{}:{}", self.form(), name)
    }

    pub fn dialog(&self, name: &str) -> String {
        format!("{}:{}", self.portlet_namespace, name)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Skip TLS certificate verification; the booking site has historically
    /// required it.
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_invalid_certs: true,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub tickets_json: String,
    /// Raw search response is written here when set.
    pub response_dump: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            tickets_json: "available_tickets.json".to_string(),
            response_dump: Some("ticket_search_response.html".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_without_path_uses_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.site.home_url(), "https://sar.hhr.sa/web/booking/home");
    }

    #[test]
    fn test_load_partial_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "http:\n  timeout_secs: 5\ncriteria:\n  travel_date: \"01/10/2025\"\n",
        )
        .unwrap();

        let config = Config::load(path.to_str()).unwrap();
        assert_eq!(config.http.timeout(), Duration::from_secs(5));
        assert_eq!(config.criteria.travel_date, "01/10/2025");
        assert_eq!(config.criteria.origin_station_id, "3");
        assert!(config.http.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_load_rejects_malformed_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "http: [not, a, map]\n").unwrap();

        let err = Config::load(path.to_str()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_component_ids() {
        let site = SiteConfig::default();
        assert_eq!(
            site.field("comboStationFrom"),
            "_ossportlet_WAR_ossliferay_:formSearchTravel:comboStationFrom"
        );
        assert_eq!(
            site.dialog("dialogPromotionalCode"),
            "_ossportlet_WAR_ossliferay_:dialogPromotionalCode"
        );
    }

    #[test]
    fn test_ajax_url_encodes_view_resource() {
        let url = SiteConfig::default().ajax_url();
        assert!(url.starts_with("https://sar.hhr.sa/web/booking/home?p_p_id=ossportlet_WAR_ossliferay&"));
        assert!(url.contains("_ossportlet_WAR_ossliferay__jsfBridgeAjax=true"));
        assert!(url.ends_with(
            "_ossportlet_WAR_ossliferay__facesViewIdResource=%2FWEB-INF%2Fviews%2FsearchTravelResult.xhtml"
        ));
    }
}
