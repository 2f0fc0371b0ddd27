//! Seams to the external collaborators: HTTP client, SQL driver and
//! browser.
//!
//! The engine never talks wire protocols itself. Embedders plug real
//! drivers in behind these traits; the [`mock`] implementations back the
//! crate's own tests and are handy for testing step libraries without a
//! network.

use std::str::FromStr;

use derive_more::Display;
use linked_hash_map::LinkedHashMap;

use crate::{context::RequestSpec, error::TransportError};

/// HTTP verb accepted by the request-sending steps.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Method {
    #[display(fmt = "GET")]
    Get,
    #[display(fmt = "POST")]
    Post,
    #[display(fmt = "PUT")]
    Put,
    #[display(fmt = "PATCH")]
    Patch,
    #[display(fmt = "DELETE")]
    Delete,
    #[display(fmt = "HEAD")]
    Head,
}

impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            "HEAD" => Self::Head,
            _ => return Err(()),
        })
    }
}

/// Response of a sent request, as the assertion steps see it.
#[derive(Clone, Debug, Default)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,

    /// Response headers, in arrival order.
    pub headers: LinkedHashMap<String, String>,

    /// Cookies set by the response.
    pub cookies: LinkedHashMap<String, String>,

    /// Response body as text.
    pub body: String,
}

impl Response {
    /// Looks a header up case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Driver sending a fully specified request and returning its response.
pub trait HttpTransport: Send {
    /// Sends `method endpoint` with everything accumulated in `spec`
    /// (base URL, headers, cookies, query parameters, auth, body).
    ///
    /// # Errors
    ///
    /// If the request cannot be delivered or the response not read. A
    /// delivered response with a non-2xx status is not an error; status
    /// checks are assertions.
    fn send(
        &mut self,
        spec: &RequestSpec,
        method: Method,
        endpoint: &str,
    ) -> Result<Response, TransportError>;
}

/// Tabular result of an SQL query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SqlRows {
    /// Column names, in select order.
    pub columns: Vec<String>,

    /// Row values, stringified by the driver.
    pub rows: Vec<Vec<String>>,
}

impl SqlRows {
    /// Renders the result as a data table with the column names as the
    /// first row, the shape the comparison steps expect.
    #[must_use]
    pub fn as_table(&self) -> Vec<Vec<String>> {
        std::iter::once(self.columns.clone())
            .chain(self.rows.iter().cloned())
            .collect()
    }
}

/// Driver executing SQL against one database connection.
pub trait SqlTransport: Send {
    /// Opens the connection described by `url`.
    ///
    /// # Errors
    ///
    /// If the database is unreachable or rejects the credentials.
    fn connect(&mut self, url: &str) -> Result<(), TransportError>;

    /// Whether a connection is currently open.
    fn connected(&self) -> bool;

    /// Runs a statement that returns no rows.
    ///
    /// # Errors
    ///
    /// If no connection is open or the statement fails.
    fn execute_update(&mut self, sql: &str) -> Result<u64, TransportError>;

    /// Runs a query and returns its rows.
    ///
    /// # Errors
    ///
    /// If no connection is open or the query fails.
    fn query(&mut self, sql: &str) -> Result<SqlRows, TransportError>;

    /// Whether the table `name` exists in the connected database.
    ///
    /// # Errors
    ///
    /// If no connection is open or the catalog lookup fails.
    fn table_exists(&mut self, name: &str) -> Result<bool, TransportError>;

    /// Closes the connection. Closing an already closed connection is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// If the driver fails to shut the connection down.
    fn disconnect(&mut self) -> Result<(), TransportError>;
}

/// Handle to a live browser session, used only for evidence capture.
pub trait Browser: Send {
    /// Current page source.
    ///
    /// # Errors
    ///
    /// If the session is gone.
    fn page_source(&mut self) -> Result<String, TransportError>;

    /// PNG screenshot of the current page.
    ///
    /// # Errors
    ///
    /// If the session is gone.
    fn screenshot(&mut self) -> Result<Vec<u8>, TransportError>;
}

pub mod mock {
    //! In-memory transports for tests.

    use std::collections::{HashMap, VecDeque};

    use super::{
        HttpTransport, LinkedHashMap, Method, RequestSpec, Response, SqlRows,
        SqlTransport, TransportError,
    };

    /// One request a [`Http`] mock observed.
    #[derive(Clone, Debug)]
    pub struct SentRequest {
        pub method: Method,
        pub endpoint: String,
        pub headers: LinkedHashMap<String, String>,
        pub cookies: LinkedHashMap<String, String>,
        pub query: LinkedHashMap<String, String>,
        pub body: Option<String>,
    }

    /// Scripted HTTP transport: replies with queued responses in order and
    /// records every request it sees.
    #[derive(Debug, Default)]
    pub struct Http {
        replies: VecDeque<Result<Response, TransportError>>,
        pub sent: Vec<SentRequest>,
    }

    impl Http {
        /// Queues a successful reply.
        pub fn reply(&mut self, response: Response) -> &mut Self {
            self.replies.push_back(Ok(response));
            self
        }

        /// Queues a reply with just a status code.
        pub fn reply_status(&mut self, status: u16) -> &mut Self {
            self.reply(Response { status, ..Response::default() })
        }

        /// Queues a transport failure.
        pub fn fail(&mut self, message: &str) -> &mut Self {
            self.replies.push_back(Err(TransportError::http(message)));
            self
        }
    }

    impl HttpTransport for Http {
        fn send(
            &mut self,
            spec: &RequestSpec,
            method: Method,
            endpoint: &str,
        ) -> Result<Response, TransportError> {
            self.sent.push(SentRequest {
                method,
                endpoint: endpoint.to_owned(),
                headers: spec.headers().clone(),
                cookies: spec.cookies().clone(),
                query: spec.query_params().clone(),
                body: spec.body().map(ToOwned::to_owned),
            });
            self.replies.pop_front().unwrap_or_else(|| {
                Err(TransportError::http("no scripted reply left"))
            })
        }
    }

    /// In-memory SQL transport holding named tables.
    #[derive(Debug, Default)]
    pub struct Sql {
        connected: bool,
        pub tables: HashMap<String, SqlRows>,
        pub updates: Vec<String>,
    }

    impl Sql {
        fn require_connection(&self) -> Result<(), TransportError> {
            if self.connected {
                Ok(())
            } else {
                Err(TransportError::sql("no open connection"))
            }
        }
    }

    impl SqlTransport for Sql {
        fn connect(&mut self, _url: &str) -> Result<(), TransportError> {
            self.connected = true;
            Ok(())
        }

        fn connected(&self) -> bool {
            self.connected
        }

        fn execute_update(
            &mut self,
            sql: &str,
        ) -> Result<u64, TransportError> {
            self.require_connection()?;
            self.updates.push(sql.to_owned());
            Ok(1)
        }

        fn query(&mut self, sql: &str) -> Result<SqlRows, TransportError> {
            self.require_connection()?;
            // Queries are looked up verbatim as table names; enough for a
            // fake.
            self.tables.get(sql).cloned().ok_or_else(|| {
                TransportError::sql(format!("unknown query `{sql}`"))
            })
        }

        fn table_exists(
            &mut self,
            name: &str,
        ) -> Result<bool, TransportError> {
            self.require_connection()?;
            Ok(self.tables.contains_key(name))
        }

        fn disconnect(&mut self) -> Result<(), TransportError> {
            self.connected = false;
            Ok(())
        }
    }

    /// Browser stub serving a fixed page and screenshot.
    #[derive(Debug)]
    pub struct Browser {
        pub page: String,
        pub image: Vec<u8>,
    }

    impl Default for Browser {
        fn default() -> Self {
            Self {
                page: "<html></html>".into(),
                image: vec![0x89, b'P', b'N', b'G'],
            }
        }
    }

    impl super::Browser for Browser {
        fn page_source(&mut self) -> Result<String, TransportError> {
            Ok(self.page.clone())
        }

        fn screenshot(&mut self) -> Result<Vec<u8>, TransportError> {
            Ok(self.image.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_the_step_vocabulary() {
        for (s, m) in [
            ("GET", Method::Get),
            ("POST", Method::Post),
            ("PUT", Method::Put),
            ("PATCH", Method::Patch),
            ("DELETE", Method::Delete),
            ("HEAD", Method::Head),
        ] {
            assert_eq!(s.parse::<Method>(), Ok(m));
        }
        assert!("get".parse::<Method>().is_err());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = LinkedHashMap::new();
        let _ = headers.insert("Content-Type".to_owned(), "json".to_owned());
        let resp = Response { headers, ..Response::default() };
        assert_eq!(resp.header("content-type"), Some("json"));
        assert_eq!(resp.header("X-Nope"), None);
    }

    #[test]
    fn sql_rows_prepend_columns_in_table_form() {
        let rows = SqlRows {
            columns: vec!["id".into(), "name".into()],
            rows: vec![vec!["1".into(), "ada".into()]],
        };
        assert_eq!(
            rows.as_table(),
            vec![
                vec!["id".to_owned(), "name".to_owned()],
                vec!["1".to_owned(), "ada".to_owned()],
            ],
        );
    }

    #[test]
    fn mock_sql_rejects_use_before_connect() {
        let mut sql = mock::Sql::default();
        assert!(sql.execute_update("DELETE FROM t").is_err());
        sql.connect("db://local").unwrap();
        assert_eq!(sql.execute_update("DELETE FROM t").unwrap(), 1);
    }
}
