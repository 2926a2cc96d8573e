//! Remote SPARQL 1.1 protocol endpoints.

#[cfg(not(feature = "http-client"))]
mod dummy;
#[cfg(feature = "http-client")]
mod simple;

#[cfg(not(feature = "http-client"))]
use dummy::Client;
#[cfg(feature = "http-client")]
use simple::Client;

use crate::endpoint::{Endpoint, solutions_to_table};
use crate::error::EndpointError;
use crate::table::Table;
use oxrdf::{Graph, NamedNodeRef};
use sparesults::{QueryResultsFormat, QueryResultsParser, ReaderQueryResultsParserOutput};
use std::time::Duration;
use std::{error, fmt, io};

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1500);
const REDIRECTION_LIMIT: usize = 10;

/// An [`Endpoint`] talking to a SPARQL endpoint over HTTP.
///
/// Queries are POSTed as `application/sparql-query` and answered in the SPARQL JSON results
/// format. Updates are POSTed as `application/sparql-update` to the update URL.
/// Requests failing with a connection error, a server error or `429 Too Many Requests` are retried.
///
/// Requires the `http-client` feature.
#[derive(Debug, Clone)]
#[must_use]
pub struct HttpEndpoint {
    query_url: String,
    update_url: Option<String>,
    credentials: Option<(String, String)>,
    timeout: Duration,
    max_retries: usize,
}

impl HttpEndpoint {
    pub fn new(query_url: impl Into<String>) -> Self {
        Self {
            query_url: query_url.into(),
            update_url: None,
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: 2,
        }
    }

    /// Sets the URL updates are sent to. Without it [`Endpoint::insert`] fails.
    pub fn with_update_url(mut self, update_url: impl Into<String>) -> Self {
        self.update_url = Some(update_url.into());
        self
    }

    /// Authenticates with HTTP Basic authentication.
    pub fn with_basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((user.into(), password.into()));
        self
    }

    /// Sets the timeout of each request. Defaults to 1.5s.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how many times a request failing with a transient error is retried.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn post<T>(
        &self,
        url: &str,
        payload: &str,
        content_type: &'static str,
        accept: &'static str,
        read: impl Fn(Box<dyn io::Read>) -> Result<T, EndpointError>,
    ) -> Result<T, EndpointError> {
        let client = Client::new(
            Some(self.timeout),
            REDIRECTION_LIMIT,
            self.credentials
                .as_ref()
                .map(|(user, password)| (user.as_str(), password.as_str())),
        )?;
        let mut attempt = 0;
        loop {
            match client.post(url, payload.as_bytes().to_vec(), content_type, accept) {
                Ok(body) => return read(Box::new(body)),
                Err(error) if attempt < self.max_retries && is_transient(&error) => {
                    attempt += 1;
                    tracing::warn!("Request to {url} failed ({error}), retrying ({attempt})");
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
}

/// A non-success HTTP status returned by the endpoint.
#[cfg_attr(not(feature = "http-client"), allow(dead_code))]
#[derive(Debug)]
struct StatusError {
    status: u16,
    message: String,
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {} {}", self.status, self.message)
    }
}

impl error::Error for StatusError {}

fn is_transient(error: &io::Error) -> bool {
    if let Some(status) = error
        .get_ref()
        .and_then(|e| e.downcast_ref::<StatusError>())
        .map(|e| e.status)
    {
        return status == 429 || (500..600).contains(&status);
    }
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::TimedOut
            | io::ErrorKind::Interrupted
            | io::ErrorKind::UnexpectedEof
    )
}

impl Endpoint for HttpEndpoint {
    fn query(&self, query: &str) -> Result<Table, EndpointError> {
        tracing::debug!("Sending query to {}:\n{query}", self.query_url);
        self.post(
            &self.query_url,
            query,
            "application/sparql-query",
            "application/sparql-results+json",
            |body| {
                match QueryResultsParser::from_format(QueryResultsFormat::Json)
                    .for_reader(body)
                    .map_err(|e| EndpointError::Results(e.to_string()))?
                {
                    ReaderQueryResultsParserOutput::Solutions(solutions) => {
                        let variables = solutions.variables().to_vec();
                        solutions_to_table(&variables, solutions)
                    }
                    ReaderQueryResultsParserOutput::Boolean(_) => Err(EndpointError::NotSolutions),
                }
            },
        )
    }

    fn insert(&self, graph: &Graph, graph_name: NamedNodeRef<'_>) -> Result<(), EndpointError> {
        let update_url = self.update_url.as_deref().ok_or(EndpointError::ReadOnly)?;
        let triples = graph
            .iter()
            .map(|triple| format!("{triple} ."))
            .collect::<Vec<_>>();
        let update = format!(
            "INSERT DATA {{ GRAPH {graph_name} {{\n{}\n}} }}",
            triples.join("\n")
        );
        self.post(
            update_url,
            &update,
            "application/sparql-update",
            "*/*",
            |_| Ok(()),
        )
    }
}
