//! Page fetching over HTTP.
//!
//! One blocking client is built per scrape pass so every request reuses the
//! same connection pool. Each URL gets a single attempt with a fixed
//! timeout; failures are returned per URL and never abort the batch.

use std::io::Read;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;
use tracing::debug;

const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("response from {url} too large: {size} bytes")]
    TooLarge { url: String, size: u64 },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read body from {url}: {source}")]
    Read {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Anything that can hand back the markup behind a URL.
///
/// The pipeline is generic over this so it can run against canned pages.
pub trait PageSource {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;

    /// Pause inserted between successive fetches in `fetch_many`.
    fn delay(&self) -> Duration {
        Duration::ZERO
    }

    /// Fetch every URL in order, one at a time, sleeping `delay()` between
    /// requests. Results line up with the input.
    fn fetch_many(&self, urls: &[String]) -> Vec<(String, Result<String, FetchError>)> {
        let delay = self.delay();
        let mut results = Vec::with_capacity(urls.len());

        for (i, url) in urls.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                thread::sleep(delay);
            }
            results.push((url.clone(), self.fetch(url)));
        }

        results
    }
}

pub struct Fetcher {
    client: Client,
    delay: Duration,
}

impl Fetcher {
    pub fn new(timeout: Duration, delay: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Fetcher { client, delay })
    }
}

impl PageSource for Fetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let request_error = |source| FetchError::Request { url: url.to_string(), source };

        debug!(url, "fetching");
        let response = self.client.get(url).send().map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(FetchError::TooLarge { url: url.to_string(), size: len });
            }
        }

        // no length header: read one byte past the cap to detect overflow
        let mut body = Vec::new();
        response
            .take(MAX_RESPONSE_SIZE + 1)
            .read_to_end(&mut body)
            .map_err(|source| FetchError::Read { url: url.to_string(), source })?;
        if body.len() as u64 > MAX_RESPONSE_SIZE {
            return Err(FetchError::TooLarge { url: url.to_string(), size: body.len() as u64 });
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    fn delay(&self) -> Duration {
        self.delay
    }
}
