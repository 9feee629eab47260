pub mod models;

use std::{future::Future, time::Duration};

use reqwest::{Client, Url};
use tracing::{debug, info};

use crate::{config::Config, error::TransportError};

use self::models::{FeedCredentials, RawRow};

/// Source of raw feed rows. `ThingSpeakClient` talks to the provider; tests
/// substitute an in-memory implementation.
pub trait FeedSource {
    /// Returns the data rows of `feed` (header stripped) in the provider's
    /// order, oldest first, at most `max_records` of them.
    fn fetch(
        &self,
        feed: &FeedCredentials,
        max_records: u32,
    ) -> impl Future<Output = Result<Vec<RawRow>, TransportError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ThingSpeakClient {
    http: Client,
    base_url: String,
}

impl ThingSpeakClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        Self::new(
            &config.thingspeak_base_url,
            Duration::from_secs(config.fetch_timeout_secs),
        )
    }

    /// `{base}/channels/{channel_id}/feeds.csv?api_key={key}&results={n}`,
    /// with every component percent-encoded.
    fn feed_url(&self, feed: &FeedCredentials, max_records: u32) -> Result<Url, TransportError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| TransportError::InvalidUrl(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(["channels", feed.channel_id.as_str(), "feeds.csv"]);
        url.query_pairs_mut()
            .append_pair("api_key", &feed.read_key)
            .append_pair("results", &max_records.to_string());
        Ok(url)
    }
}

impl FeedSource for ThingSpeakClient {
    async fn fetch(
        &self,
        feed: &FeedCredentials,
        max_records: u32,
    ) -> Result<Vec<RawRow>, TransportError> {
        let url = self.feed_url(feed, max_records)?;
        // The URL carries the read key, so only the channel is logged.
        debug!(channel_id = %feed.channel_id, max_records, "Requesting ThingSpeak feed");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.without_url()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                channel_id: feed.channel_id.clone(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Body(e.without_url()))?;

        let rows = parse_feed_csv(&body);
        info!(
            channel_id = %feed.channel_id,
            records = rows.len(),
            "Records retrieved from ThingSpeak"
        );
        Ok(rows)
    }
}

/// Split a `feeds.csv` body into rows: blank lines are dropped, the first
/// remaining line is the header and is dropped too, the rest split on `,`.
///
/// ThingSpeak never quotes numeric fields, so no CSV quoting is handled.
pub fn parse_feed_csv(body: &str) -> Vec<RawRow> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .skip(1)
        .map(RawRow::from_line)
        .collect()
}
