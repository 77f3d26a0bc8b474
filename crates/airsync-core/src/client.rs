//! HTTP client for the remote sensor store.
//!
//! The store exposes a Supabase-style REST interface: filtered, ordered,
//! limited range queries over a single readings table, authenticated with an
//! API key sent both as `apikey` and as a bearer token. All requests are
//! GET-only and therefore idempotent and safely retryable.
//!
//! # Example
//!
//! ```no_run
//! use airsync_core::{Config, StoreClient, client::ReadingStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     base_url: "https://xyz.supabase.co".to_string(),
//!     api_key: "anon-key".to_string(),
//!     ..Config::default()
//! };
//! let client = StoreClient::new(&config)?;
//!
//! if let Some(row) = client.query_latest().await? {
//!     println!("latest: {}", row.measure_time);
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use time::OffsetDateTime;
use tracing::debug;

use airsync_types::{ParseError, RawReading, timecodec};

use crate::config::Config;
use crate::error::{Error, Result};

/// Request timeout for store queries.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Read access to the remote sensor store.
///
/// Implemented by [`StoreClient`] for the real REST endpoint and by
/// [`crate::mock::MockStore`] for tests, so the pagination engine and the
/// scheduler can run against either.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Query rows with `time_column` in `[start, end]`, ordered ascending by
    /// `(time_column, ID)`, at most `limit` rows.
    async fn query_range(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        limit: usize,
    ) -> Result<Vec<RawReading>>;

    /// Query the single newest row, or `None` when the table is empty.
    async fn query_latest(&self) -> Result<Option<RawReading>>;
}

/// HTTP client for the remote store's REST API.
#[derive(Debug, Clone)]
pub struct StoreClient {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
    time_column: String,
}

impl StoreClient {
    /// Create a new store client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::InvalidConfig(format!(
                "base URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            table: config.table.clone(),
            time_column: config.time_column.clone(),
        })
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(config: &Config, client: Client) -> Result<Self> {
        let mut this = Self::new(config)?;
        this.client = client;
        Ok(this)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn range_url(&self, start: OffsetDateTime, end: OffsetDateTime, limit: usize) -> String {
        // Secondary ID order makes page order total, so cursor advancement
        // cannot loop or drop rows when readings share one timestamp.
        format!(
            "{}?select=*&{col}=gte.{}&{col}=lte.{}&order={col}.asc,ID.asc&limit={}",
            self.table_url(),
            timecodec::format_wire(start),
            timecodec::format_wire(end),
            limit,
            col = self.time_column,
        )
    }

    fn latest_url(&self) -> String {
        format!(
            "{}?select=*&order={}.desc&limit=1",
            self.table_url(),
            self.time_column,
        )
    }

    async fn get_rows(&self, url: &str) -> Result<Vec<RawReading>> {
        debug!(url, "store request");

        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(Error::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(Error::Auth {
                    status: status.as_u16(),
                });
            }
            let message = response
                .text()
                .await
                .ok()
                .filter(|body| !body.is_empty())
                .unwrap_or_else(|| status.to_string());
            return Err(Error::Server {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await.map_err(Error::from_transport)?;
        decode_rows(status.as_u16(), &body)
    }
}

/// Decode a success response body into rows.
///
/// An absent body on a success status is a server fault and retryable; a
/// present body that is not the expected row array is a parse failure.
fn decode_rows(status: u16, body: &str) -> Result<Vec<RawReading>> {
    if body.trim().is_empty() {
        return Err(Error::Server {
            status,
            message: "empty response body".to_string(),
        });
    }
    serde_json::from_str(body).map_err(|e| Error::Parse(ParseError::InvalidData(e.to_string())))
}

#[async_trait]
impl ReadingStore for StoreClient {
    async fn query_range(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        limit: usize,
    ) -> Result<Vec<RawReading>> {
        self.get_rows(&self.range_url(start, end, limit)).await
    }

    async fn query_latest(&self) -> Result<Option<RawReading>> {
        let mut rows = self.get_rows(&self.latest_url()).await?;
        Ok(rows.drain(..).next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> Config {
        Config {
            base_url: base_url.to_string(),
            api_key: "anon-key".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_client_creation() {
        let client = StoreClient::new(&config("https://xyz.supabase.co"));
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url(), "https://xyz.supabase.co");
    }

    #[test]
    fn test_client_normalizes_url() {
        let client = StoreClient::new(&config("https://xyz.supabase.co/")).unwrap();
        assert_eq!(client.base_url(), "https://xyz.supabase.co");
    }

    #[test]
    fn test_client_invalid_url() {
        let result = StoreClient::new(&config("xyz.supabase.co"));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_range_url_shape() {
        use time::macros::datetime;

        let client = StoreClient::new(&config("https://xyz.supabase.co")).unwrap();
        let url = client.range_url(
            datetime!(2024-03-01 00:00:00 UTC),
            datetime!(2024-03-02 23:59:59 UTC),
            1000,
        );
        assert_eq!(
            url,
            "https://xyz.supabase.co/rest/v1/PMSensor?select=*\
             &Measure_time=gte.2024-03-01T00:00:00&Measure_time=lte.2024-03-02T23:59:59\
             &order=Measure_time.asc,ID.asc&limit=1000"
        );
    }

    #[test]
    fn test_decode_empty_body_is_retryable_server_error() {
        let err = decode_rows(200, "").unwrap_err();
        assert!(matches!(err, Error::Server { status: 200, .. }));
        assert!(err.is_retryable());

        let err = decode_rows(200, "   \n").unwrap_err();
        assert!(matches!(err, Error::Server { .. }));
    }

    #[test]
    fn test_decode_malformed_body_is_parse_error() {
        let err = decode_rows(200, "{not json").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_decode_row_array() {
        assert!(decode_rows(200, "[]").unwrap().is_empty());

        let rows =
            decode_rows(200, r#"[{"PM25": 36.5, "Measure_time": "2024-03-01T10:00:00"}]"#)
                .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pm25, 36.5);
    }

    #[test]
    fn test_latest_url_shape() {
        let client = StoreClient::new(&config("https://xyz.supabase.co")).unwrap();
        assert_eq!(
            client.latest_url(),
            "https://xyz.supabase.co/rest/v1/PMSensor?select=*&order=Measure_time.desc&limit=1"
        );
    }
}
