use anyhow::{bail, Result};
use reqwest::{Client, Response};
use serde::Deserialize;
use thiserror::Error;
use types::{primitives::Slot, reference::RelayEndpoint};

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum RelayApiError {
    #[error("bad request to relay {relay} (relay response: {message})")]
    BadRequest { relay: String, message: String },
    #[error("relay {relay} internal error (relay response: {message})")]
    RelayInternalError { relay: String, message: String },
}

/// Client for the MEV-Boost relay data API, shared across relays.
pub struct Api {
    client: Client,
}

impl Api {
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    /// Returns the slots of payloads `relay` delivered at or below `cursor`,
    /// in the relay's own descending order. An empty page means the relay has
    /// no older deliveries.
    pub async fn get_delivered_slots(
        &self,
        relay: &RelayEndpoint,
        cursor: Slot,
    ) -> Result<Vec<Slot>> {
        let url = relay
            .url
            .join("/relay/v1/data/bidtraces/proposer_payload_delivered")?;

        let response = self
            .client
            .get(url.into_url())
            .query(&[("cursor", cursor.to_string())])
            .send()
            .await?;

        let response = handle_error(&relay.name, response).await?;
        let traces = response.json::<Vec<BidTrace>>().await?;

        Ok(traces.into_iter().map(|trace| trace.slot).collect())
    }
}

async fn handle_error(relay: &str, response: Response) -> Result<Response> {
    if response.status().is_client_error() {
        let message = response.text().await?;
        bail!(RelayApiError::BadRequest {
            relay: relay.to_owned(),
            message,
        });
    }

    if response.status().is_server_error() {
        let message = response.text().await?;
        bail!(RelayApiError::RelayInternalError {
            relay: relay.to_owned(),
            message,
        });
    }

    Ok(response)
}

#[derive(Deserialize)]
struct BidTrace {
    #[serde(with = "serde_utils::string_or_native")]
    slot: Slot,
}
