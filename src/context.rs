//! Ready-made world for the built-in REST and SQL step libraries: the
//! request builder, the last response/result, the variable scope and the
//! plugged-in transports.

use std::{convert::Infallible, fs, mem, path::Path, path::PathBuf};

use derive_more::Display;
use linked_hash_map::LinkedHashMap;
use once_cell::sync::OnceCell;
use tracing::warn;

use crate::{
    env::VarScope,
    transport::{Browser, HttpTransport, Response, SqlRows, SqlTransport},
    world::World,
};

/// URL scheme of the target application.
#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
pub enum Protocol {
    #[default]
    #[display(fmt = "http")]
    Http,
    #[display(fmt = "https")]
    Https,
}

impl Protocol {
    /// Default port of the scheme.
    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

/// Accumulating request builder.
///
/// Headers, cookies and query parameters persist across requests of one
/// scenario until explicitly cleared; setting an already-set key replaces
/// its value. Clearing one of the three maps reconstructs the builder from
/// the base target and reapplies the two surviving maps, so the base
/// target, and only it, survives every clear.
#[derive(Clone, Debug, Default)]
pub struct RequestSpec {
    protocol: Protocol,
    host: String,
    port: u16,
    auth: Option<(String, String)>,
    body: Option<String>,
    headers: LinkedHashMap<String, String>,
    cookies: LinkedHashMap<String, String>,
    query: LinkedHashMap<String, String>,
}

impl RequestSpec {
    /// Points the builder at `host`, dropping all accumulated state.
    ///
    /// `port` falls back to the scheme default (80/443).
    pub fn setup(&mut self, protocol: Protocol, host: &str, port: Option<u16>) {
        *self = Self {
            protocol,
            host: host.to_owned(),
            port: port.unwrap_or_else(|| protocol.default_port()),
            ..Self::default()
        };
    }

    /// Base URL of the target, e.g. `https://example.com:8443`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    /// Target host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Sets basic-auth credentials for subsequent requests.
    pub fn set_auth(&mut self, user: &str, password: &str) {
        self.auth = Some((user.to_owned(), password.to_owned()));
    }

    /// Basic-auth credentials, if set.
    #[must_use]
    pub fn auth(&self) -> Option<(&str, &str)> {
        self.auth.as_ref().map(|(u, p)| (u.as_str(), p.as_str()))
    }

    /// Sets the body of the next request.
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = Some(body.into());
    }

    /// Clears the pending body.
    pub fn take_body(&mut self) -> Option<String> {
        self.body.take()
    }

    /// Pending request body.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Merges `pairs` into the persistent headers (replace, not append).
    pub fn set_headers(&mut self, pairs: LinkedHashMap<String, String>) {
        self.headers.extend(pairs);
    }

    /// Merges `pairs` into the persistent cookies.
    pub fn set_cookies(&mut self, pairs: LinkedHashMap<String, String>) {
        self.cookies.extend(pairs);
    }

    /// Merges `pairs` into the persistent query parameters.
    pub fn set_query_params(&mut self, pairs: LinkedHashMap<String, String>) {
        self.query.extend(pairs);
    }

    /// Persistent headers.
    #[must_use]
    pub fn headers(&self) -> &LinkedHashMap<String, String> {
        &self.headers
    }

    /// Persistent cookies.
    #[must_use]
    pub fn cookies(&self) -> &LinkedHashMap<String, String> {
        &self.cookies
    }

    /// Persistent query parameters.
    #[must_use]
    pub fn query_params(&self) -> &LinkedHashMap<String, String> {
        &self.query
    }

    /// Drops all persistent headers, keeping cookies and query parameters.
    pub fn clear_headers(&mut self) {
        let cookies = mem::take(&mut self.cookies);
        let query = mem::take(&mut self.query);
        self.rebuild();
        self.cookies = cookies;
        self.query = query;
    }

    /// Drops all persistent cookies, keeping headers and query parameters.
    pub fn clear_cookies(&mut self) {
        let headers = mem::take(&mut self.headers);
        let query = mem::take(&mut self.query);
        self.rebuild();
        self.headers = headers;
        self.query = query;
    }

    /// Drops all persistent query parameters, keeping headers and cookies.
    pub fn clear_query_params(&mut self) {
        let headers = mem::take(&mut self.headers);
        let cookies = mem::take(&mut self.cookies);
        self.rebuild();
        self.headers = headers;
        self.cookies = cookies;
    }

    /// Reconstructs the builder from the base target alone.
    fn rebuild(&mut self) {
        *self = Self {
            protocol: self.protocol,
            host: mem::take(&mut self.host),
            port: self.port,
            ..Self::default()
        };
    }
}

type HttpFactory = dyn Fn() -> Box<dyn HttpTransport> + Send + Sync;
type SqlFactory = dyn Fn() -> Box<dyn SqlTransport> + Send + Sync;
type BrowserFactory = dyn Fn() -> Box<dyn Browser> + Send + Sync;

/// Process-global factories producing one transport per scenario.
#[derive(Default)]
pub struct Transports {
    http: Option<Box<HttpFactory>>,
    sql: Option<Box<SqlFactory>>,
    browser: Option<Box<BrowserFactory>>,
}

static TRANSPORTS: OnceCell<Transports> = OnceCell::new();

impl Transports {
    /// Creates an empty set of factories.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the HTTP driver factory.
    #[must_use]
    pub fn http<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn HttpTransport> + Send + Sync + 'static,
    {
        self.http = Some(Box::new(factory));
        self
    }

    /// Registers the SQL driver factory.
    #[must_use]
    pub fn sql<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn SqlTransport> + Send + Sync + 'static,
    {
        self.sql = Some(Box::new(factory));
        self
    }

    /// Registers the browser factory.
    #[must_use]
    pub fn browser<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Browser> + Send + Sync + 'static,
    {
        self.browser = Some(Box::new(factory));
        self
    }

    /// Installs these factories for the whole process. Later installs are
    /// ignored, so the first test binary setup wins.
    pub fn install(self) {
        let _ = TRANSPORTS.set(self);
    }
}

/// World backing the built-in step libraries.
pub struct ScenarioContext {
    /// Accumulating request builder.
    pub request: RequestSpec,

    /// Response of the most recent request.
    pub response: Option<Response>,

    /// Rows of the most recent SQL query.
    pub sql_result: Option<SqlRows>,

    /// Scenario-scoped saved variables.
    pub vars: VarScope,

    /// HTTP driver, if installed.
    pub http: Option<Box<dyn HttpTransport>>,

    /// SQL driver, if installed.
    pub sql: Option<Box<dyn SqlTransport>>,

    /// Browser session, if installed.
    pub browser: Option<Box<dyn Browser>>,
}

impl ScenarioContext {
    /// Replaces the transports with explicitly supplied ones, bypassing the
    /// installed factories. Meant for tests driving steps directly.
    pub fn with_http(mut self, http: Box<dyn HttpTransport>) -> Self {
        self.http = Some(http);
        self
    }
}

impl World for ScenarioContext {
    type Error = Infallible;

    fn new() -> Result<Self, Self::Error> {
        let factories = TRANSPORTS.get();
        Ok(Self {
            request: RequestSpec::default(),
            response: None,
            sql_result: None,
            vars: VarScope::new(),
            http: factories.and_then(|t| t.http.as_ref()).map(|f| f()),
            sql: factories.and_then(|t| t.sql.as_ref()).map(|f| f()),
            browser: factories.and_then(|t| t.browser.as_ref()).map(|f| f()),
        })
    }

    fn teardown(&mut self) {
        if let Some(sql) = &mut self.sql {
            if sql.connected() {
                if let Err(e) = sql.disconnect() {
                    warn!("failed to close SQL connection at teardown: {e}");
                }
            }
        }
    }

    fn capture_evidence(&mut self, dir: &Path) -> Vec<PathBuf> {
        let Some(browser) = &mut self.browser else {
            return Vec::new();
        };

        let mut written = Vec::new();
        match browser.page_source() {
            Ok(source) => {
                let path = dir.join("page.html");
                match fs::write(&path, source) {
                    Ok(()) => written.push(path),
                    Err(e) => warn!("failed to write page source: {e}"),
                }
            }
            Err(e) => warn!("failed to read page source: {e}"),
        }
        match browser.screenshot() {
            Ok(image) => {
                let path = dir.join("screenshot.png");
                match fs::write(&path, image) {
                    Ok(()) => written.push(path),
                    Err(e) => warn!("failed to write screenshot: {e}"),
                }
            }
            Err(e) => warn!("failed to take screenshot: {e}"),
        }
        written
    }
}
