//! Per-run session store: a file-backed cookie jar and the JSF view-state.
//!
//! Cookie semantics (domain, path, `Max-Age`, `Expires`) come from
//! [`cookie_store`], the same store behind reqwest's own jar. Every change is
//! mirrored into a temporary file owned by a [`tempfile::NamedTempFile`], so
//! the file disappears when the last handle to the jar is dropped, on success
//! and failure alike.

use cookie_store::RawCookie;
use reqwest::Url;
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Cookie jar for a single scrape run, persisted to an ephemeral file.
#[derive(Debug)]
pub struct FileCookieJar {
    file: Mutex<NamedTempFile>,
    path: PathBuf,
    store: Mutex<cookie_store::CookieStore>,
}

impl FileCookieJar {
    pub fn create() -> std::io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("rail_scout_cookies_")
            .suffix(".txt")
            .tempfile()?;
        let path = file.path().to_path_buf();
        debug!(path = %path.display(), "Created cookie jar");
        Ok(Self {
            file: Mutex::new(file),
            path,
            store: Mutex::new(cookie_store::CookieStore::default()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of unexpired cookies held.
    pub fn count(&self) -> usize {
        lock(&self.store).iter_unexpired().count()
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<String> {
        lock(&self.store)
            .iter_unexpired()
            .find(|c| c.name() == name)
            .map(|c| c.value().to_string())
    }

    /// Rewrite the mirror file as sorted `name<TAB>value` lines.
    fn persist(&self, store: &cookie_store::CookieStore) -> std::io::Result<()> {
        let mut lines: Vec<(&str, &str)> = store.iter_unexpired().map(|c| (c.name(), c.value())).collect();
        lines.sort_unstable();

        let mut guard = lock(&self.file);
        let file = guard.as_file_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        for (name, value) in lines {
            writeln!(file, "{name}\t{value}")?;
        }
        file.flush()
    }
}

impl CookieStore for FileCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let parsed: Vec<RawCookie<'static>> = cookie_headers
            .filter_map(|header| header.to_str().ok())
            .filter_map(|raw| match RawCookie::parse(raw) {
                Ok(cookie) => Some(cookie.into_owned()),
                Err(e) => {
                    debug!(error = %e, "Ignoring malformed Set-Cookie");
                    None
                }
            })
            .collect();
        if parsed.is_empty() {
            return;
        }

        let mut store = lock(&self.store);
        store.store_response_cookies(parsed.into_iter(), url);
        debug!(
            host = url.host_str().unwrap_or_default(),
            count = store.iter_unexpired().count(),
            "Stored cookies"
        );
        if let Err(e) = self.persist(&store) {
            warn!(error = %e, path = %self.path.display(), "Failed to persist cookie jar");
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let header = lock(&self.store)
            .get_request_values(url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Server-side UI continuity for one run.
///
/// Threaded by value through each form interaction so only one instance is
/// ever live and every request sees the latest view-state.
#[derive(Debug)]
pub struct SessionState {
    pub cookies: Arc<FileCookieJar>,
    pub view_state: String,
}

impl SessionState {
    pub fn new(cookies: Arc<FileCookieJar>, view_state: String) -> Self {
        Self {
            cookies,
            view_state,
        }
    }

    /// Adopt a newer view-state when the server issued one.
    pub fn refresh(mut self, view_state: Option<String>) -> Self {
        match view_state {
            Some(token) if token != self.view_state => {
                debug!("View-state rotated");
                self.view_state = token;
            }
            Some(_) => {}
            None => debug!("Response carried no view-state; keeping previous token"),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://sar.hhr.sa/web/booking/home").unwrap()
    }

    fn set(jar: &FileCookieJar, headers: &[&str]) {
        let values: Vec<HeaderValue> = headers.iter().map(|h| HeaderValue::from_str(h).unwrap()).collect();
        jar.set_cookies(&mut values.iter(), &url());
    }

    fn header_pairs(jar: &FileCookieJar) -> Vec<String> {
        let mut pairs: Vec<String> = jar
            .cookies(&url())
            .map(|h| h.to_str().unwrap().split("; ").map(str::to_string).collect())
            .unwrap_or_default();
        pairs.sort();
        pairs
    }

    #[test]
    fn test_cookies_round_trip_through_header() {
        let jar = FileCookieJar::create().unwrap();
        assert!(jar.cookies(&url()).is_none());

        set(&jar, &["JSESSIONID=abc123; Path=/; Secure; HttpOnly", "GUEST_LANGUAGE_ID=en_US; Path=/"]);

        assert_eq!(jar.count(), 2);
        assert_eq!(jar.get("JSESSIONID").as_deref(), Some("abc123"));
        assert_eq!(header_pairs(&jar), vec!["GUEST_LANGUAGE_ID=en_US", "JSESSIONID=abc123"]);
    }

    #[test]
    fn test_later_cookie_overrides_and_max_age_zero_deletes() {
        let jar = FileCookieJar::create().unwrap();
        set(&jar, &["JSESSIONID=first; Path=/", "COOKIE_SUPPORT=true; Path=/"]);
        set(&jar, &["JSESSIONID=second; Path=/", "COOKIE_SUPPORT=; Path=/; Max-Age=0"]);

        assert_eq!(jar.get("JSESSIONID").as_deref(), Some("second"));
        assert!(jar.get("COOKIE_SUPPORT").is_none());
    }

    #[test]
    fn test_past_expires_deletes_cookie() {
        let jar = FileCookieJar::create().unwrap();
        set(&jar, &["LFR_SESSION_STATE=abc; Path=/", "JSESSIONID=abc123; Path=/"]);
        set(&jar, &["LFR_SESSION_STATE=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT"]);

        assert!(jar.get("LFR_SESSION_STATE").is_none());
        assert_eq!(jar.count(), 1);
        assert_eq!(header_pairs(&jar), vec!["JSESSIONID=abc123"]);
        let contents = std::fs::read_to_string(jar.path()).unwrap();
        assert_eq!(contents, "JSESSIONID\tabc123\n");
    }

    #[test]
    fn test_cookie_for_other_domain_is_rejected() {
        let jar = FileCookieJar::create().unwrap();
        set(&jar, &["TRACKER=1; Domain=example.com; Path=/"]);

        assert_eq!(jar.count(), 0);
        assert!(jar.cookies(&url()).is_none());
    }

    #[test]
    fn test_jar_is_mirrored_to_file() {
        let jar = FileCookieJar::create().unwrap();
        set(&jar, &["JSESSIONID=abc123; Path=/"]);

        let contents = std::fs::read_to_string(jar.path()).unwrap();
        assert_eq!(contents, "JSESSIONID\tabc123\n");
    }

    #[test]
    fn test_file_removed_on_drop() {
        let jar = FileCookieJar::create().unwrap();
        let path = jar.path().to_path_buf();
        assert!(path.exists());
        drop(jar);
        assert!(!path.exists());
    }

    #[test]
    fn test_refresh_keeps_token_when_absent() {
        let jar = Arc::new(FileCookieJar::create().unwrap());
        let session = SessionState::new(jar, "vs-1".to_string());

        let session = session.refresh(None);
        assert_eq!(session.view_state, "vs-1");

        let session = session.refresh(Some("vs-2".to_string()));
        assert_eq!(session.view_state, "vs-2");
    }
}
