use anyhow::{bail, Result};
use reqwest::{Client, Response};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use types::{
    primitives::{FetchWindow, UnixSeconds},
    redacting_url::RedactingUrl,
    snapshots::TxRecord,
};

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum MissReportsApiError {
    #[error("bad request to miss reports API (response: {message})")]
    BadRequest { message: String },
    #[error("miss reports API internal error (response: {message})")]
    ApiInternalError { message: String },
    #[error("miss reports API pagination stalled at cursor {cursor}")]
    PaginationStalled { cursor: QueryBound },
    #[error("miss reports API cursor {cursor} has no leading timestamp")]
    MalformedCursor { cursor: QueryBound },
}

/// An opaque pagination cursor.
///
/// The API documents only that cursors are ordered and start with the Unix
/// timestamp of the position they refer to. Plain timestamps are themselves
/// valid cursors.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(transparent)]
pub struct QueryBound(String);

impl QueryBound {
    #[must_use]
    pub fn from_time(time: UnixSeconds) -> Self {
        Self(time.to_string())
    }

    pub fn timestamp(&self) -> Result<UnixSeconds> {
        let prefix = self.0.split(',').next().unwrap_or_default();

        prefix
            .parse()
            .map_err(|_| MissReportsApiError::MalformedCursor {
                cursor: self.clone(),
            }.into())
    }

    fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for QueryBound {
    fn fmt(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TxsQuery {
    pub window: FetchWindow,
    pub propagation_time: u64,
    pub min_num_misses: u64,
}

#[derive(Clone, Debug)]
pub struct MissReportsApiConfig {
    pub api_url: RedactingUrl,
}

pub struct Api {
    config: MissReportsApiConfig,
    client: Client,
}

impl Api {
    #[must_use]
    pub const fn new(config: MissReportsApiConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Fetches all reported transactions in the query window, following
    /// pagination until the API reports the response complete. `progress` is
    /// called after every page with the fraction of the window covered.
    pub async fn fetch_txs(
        &self,
        query: TxsQuery,
        mut progress: impl FnMut(f64),
    ) -> Result<Vec<TxRecord>> {
        let TxsQuery {
            window,
            propagation_time,
            min_num_misses,
        } = query;

        let mut from = QueryBound::from_time(window.from);
        let mut txs = vec![];

        loop {
            let page = self
                .fetch_txs_page(&from, window.to, propagation_time, min_num_misses)
                .await?;

            txs.extend(page.items);

            if page.complete {
                progress(1.0);
                break;
            }

            if page.to == from {
                bail!(MissReportsApiError::PaginationStalled { cursor: page.to });
            }

            progress(window_fraction(window, page.to.timestamp()?));

            from = page.to;
        }

        Ok(txs)
    }

    async fn fetch_txs_page(
        &self,
        from: &QueryBound,
        to: UnixSeconds,
        propagation_time: u64,
        min_num_misses: u64,
    ) -> Result<TxsPage> {
        let url = self.config.api_url.join("/v0/txs")?;

        debug!("fetching miss reports from cursor {from}");

        let response = self
            .client
            .get(url.into_url())
            .query(&[
                ("min_num_misses", min_num_misses.to_string()),
                ("propagation_time", propagation_time.to_string()),
                ("from", from.as_str().to_owned()),
                ("to", to.to_string()),
            ])
            .send()
            .await?;

        let response = handle_error(response).await?;

        Ok(response.json().await?)
    }
}

fn window_fraction(window: FetchWindow, cursor_time: UnixSeconds) -> f64 {
    if window.is_empty() {
        return 1.0;
    }

    let span = window.to - window.from;
    let remaining = window.to.saturating_sub(cursor_time);

    1.0 - remaining as f64 / span as f64
}

async fn handle_error(response: Response) -> Result<Response> {
    if response.status().is_client_error() {
        let message = response.text().await?;
        bail!(MissReportsApiError::BadRequest { message });
    }

    if response.status().is_server_error() {
        let message = response.text().await?;
        bail!(MissReportsApiError::ApiInternalError { message });
    }

    Ok(response)
}

#[derive(Deserialize)]
struct TxsPage {
    items: Vec<TxRecord>,
    complete: bool,
    to: QueryBound,
}

#[cfg(test)]
mod tests {
    use httpmock::{Method, MockServer};
    use serde_json::json;
    use types::primitives::H256;

    use super::*;

    fn api_for(server: &MockServer) -> Result<Api> {
        let config = MissReportsApiConfig {
            api_url: server.url("").parse()?,
        };

        Ok(Api::new(config, Client::new()))
    }

    fn tx_json(hash_byte: u8, proposal_time: UnixSeconds) -> serde_json::Value {
        json!({
            "tx_hash": H256::repeat_byte(hash_byte),
            "misses": [
                {
                    "block_hash": H256::repeat_byte(0xbb),
                    "slot": 7_909_000_u64,
                    "proposal_time": proposal_time,
                },
            ],
        })
    }

    #[tokio::test]
    async fn fetch_txs_follows_pagination_and_reports_progress() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::GET)
                .path("/v0/txs")
                .query_param("from", "1000")
                .query_param("to", "2000")
                .query_param("min_num_misses", "2")
                .query_param("propagation_time", "8");
            then.status(200).json_body(json!({
                "items": [tx_json(1, 1_100)],
                "complete": false,
                "to": "1500,0xdeadbeef",
            }));
        });

        server.mock(|when, then| {
            when.method(Method::GET)
                .path("/v0/txs")
                .query_param("from", "1500,0xdeadbeef");
            then.status(200).json_body(json!({
                "items": [tx_json(2, 1_700)],
                "complete": true,
                "to": "2000",
            }));
        });

        let query = TxsQuery {
            window: FetchWindow::new(1_000, 2_000),
            propagation_time: 8,
            min_num_misses: 2,
        };

        let mut fractions = vec![];

        let txs = api_for(&server)?
            .fetch_txs(query, |fraction| fractions.push(fraction))
            .await?;

        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].tx_hash, H256::repeat_byte(1));
        assert_eq!(txs[1].tx_hash, H256::repeat_byte(2));
        assert_eq!(fractions, vec![0.5, 1.0]);

        Ok(())
    }

    #[tokio::test]
    async fn stalled_pagination_is_fatal() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::GET).path("/v0/txs");
            then.status(200).json_body(json!({
                "items": [],
                "complete": false,
                "to": "1000",
            }));
        });

        let query = TxsQuery {
            window: FetchWindow::new(1_000, 2_000),
            propagation_time: 8,
            min_num_misses: 2,
        };

        let error = api_for(&server)?
            .fetch_txs(query, |_| {})
            .await
            .expect_err("a cursor that does not advance should be fatal");

        assert_eq!(
            error.downcast::<MissReportsApiError>()?,
            MissReportsApiError::PaginationStalled {
                cursor: QueryBound("1000".to_owned()),
            },
        );

        Ok(())
    }

    #[test]
    fn query_bound_timestamp_is_the_prefix_before_the_first_comma() -> Result<()> {
        assert_eq!(QueryBound("1500,0xdeadbeef".to_owned()).timestamp()?, 1_500);
        assert_eq!(QueryBound("1500".to_owned()).timestamp()?, 1_500);

        QueryBound("garbage".to_owned())
            .timestamp()
            .expect_err("cursors without a leading timestamp should be rejected");

        Ok(())
    }
}
