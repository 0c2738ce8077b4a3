//! HTTP transport seam for the stateful form client.
//!
//! [`FormTransport`] is the only thing the form client knows about the
//! network, which lets tests script server responses. [`HttpTransport`] is the
//! real implementation: one `reqwest` client per run, wired to the run's
//! file-backed cookie jar and sending the browser and partial-update headers
//! the booking site insists on.

use crate::config::{HttpConfig, SiteConfig};
use crate::error::Error;
use crate::session::FileCookieJar;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, redirect};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Request/response exchanges with the booking site: page loads and
/// partial-update posts, each returning the response body.
///
/// Implementations must return the body for any completed exchange, whatever
/// the HTTP status; only transport failures become errors.
pub trait FormTransport {
    /// Navigate to a page like a browser would.
    async fn get(&self, url: &str) -> Result<String, Error>;

    /// Post an urlencoded body as a JSF partial-update request.
    async fn post_partial(&self, url: &str, body: String) -> Result<String, Error>;
}

#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    origin: String,
    referer: String,
}

impl HttpTransport {
    pub fn new(http: &HttpConfig, site: &SiteConfig, cookies: Arc<FileCookieJar>) -> Result<Self, Error> {
        let client = Client::builder()
            .cookie_provider(cookies)
            .user_agent(http.user_agent.as_str())
            .timeout(http.timeout())
            .redirect(redirect::Policy::limited(10))
            .danger_accept_invalid_certs(http.accept_invalid_certs)
            .build()?;
        Ok(Self {
            client,
            origin: site.base_url.trim_end_matches('/').to_string(),
            referer: site.home_url(),
        })
    }

    fn page_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
        );
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
        headers
    }

    fn partial_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/xml, text/xml, */*; q=0.01"),
        );
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=UTF-8"),
        );
        headers.insert("faces-request", HeaderValue::from_static("partial/ajax"));
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(
            header::ORIGIN,
            HeaderValue::from_str(&self.origin).map_err(|e| Error::structural(format!("origin header: {e}")))?,
        );
        headers.insert(
            header::REFERER,
            HeaderValue::from_str(&self.referer).map_err(|e| Error::structural(format!("referer header: {e}")))?,
        );
        Ok(headers)
    }
}

impl FormTransport for HttpTransport {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<String, Error> {
        let resp = self
            .client
            .get(url)
            .headers(Self::page_headers())
            .send()
            .await
            .map_err(|e| Error::connectivity("GET", e))?;
        debug!(status = %resp.status(), "GET completed");
        resp.text().await.map_err(|e| Error::connectivity("GET body", e))
    }

    #[instrument(level = "debug", skip(self, body), fields(bytes = body.len()))]
    async fn post_partial(&self, url: &str, body: String) -> Result<String, Error> {
        let resp = self
            .client
            .post(url)
            .headers(self.partial_headers()?)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::connectivity("POST", e))?;
        debug!(status = %resp.status(), "POST completed");
        resp.text().await.map_err(|e| Error::connectivity("POST body", e))
    }
}
