use std::io::{Empty, Error, ErrorKind, Result};
use std::time::Duration;

pub struct Client;

impl Client {
    #[allow(clippy::unnecessary_wraps)]
    pub fn new(
        _timeout: Option<Duration>,
        _redirection_limit: usize,
        _credentials: Option<(&str, &str)>,
    ) -> Result<Self> {
        Ok(Self)
    }

    #[allow(clippy::unused_self, clippy::needless_pass_by_value)]
    pub fn post(
        &self,
        _url: &str,
        _payload: Vec<u8>,
        _content_type: &'static str,
        _accept: &'static str,
    ) -> Result<Empty> {
        Err(Error::new(
            ErrorKind::Unsupported,
            "HTTP client is not available. Enable the feature 'http-client'",
        ))
    }
}
