use anyhow::{bail, Result};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use types::{
    primitives::{ExecutionAddress, ExecutionBlockNumber, Slot, ValidatorIndex, H256},
    pubkey::Pubkey,
    redacting_url::RedactingUrl,
};

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum BeaconApiError {
    #[error("bad request to Beacon API (node response: {message})")]
    BadRequest { message: String },
    #[error("Beacon API node internal error (node response: {message})")]
    NodeInternalError { message: String },
    #[error("received unexpected status code: {received}")]
    UnexpectedStatusCode { received: StatusCode },
}

#[derive(Clone, Debug)]
pub struct BeaconApiConfig {
    pub api_url: RedactingUrl,
}

/// Execution-layer fields of a proposed beacon block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProposedBlock {
    pub proposer_index: ValidatorIndex,
    pub block_number: ExecutionBlockNumber,
    pub block_hash: H256,
    pub fee_recipient: ExecutionAddress,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorSummary {
    pub index: ValidatorIndex,
    pub pubkey: Pubkey,
}

pub struct Api {
    config: BeaconApiConfig,
    client: Client,
}

impl Api {
    #[must_use]
    pub const fn new(config: BeaconApiConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Returns `None` if no block was proposed in `slot`.
    pub async fn get_block_by_slot(&self, slot: Slot) -> Result<Option<ProposedBlock>> {
        let url = self.url(&format!("/eth/v2/beacon/blocks/{slot}"))?;

        let response = self.client.get(url.into_url()).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = handle_error(response).await?;
        let block = response.json::<BlockResponse>().await?;

        let BlockMessage {
            proposer_index,
            body,
        } = block.data.message;

        Ok(Some(ProposedBlock {
            proposer_index,
            block_number: body.execution_payload.block_number,
            block_hash: body.execution_payload.block_hash,
            fee_recipient: body.execution_payload.fee_recipient,
        }))
    }

    pub async fn get_head_slot(&self) -> Result<Slot> {
        let url = self.url("/eth/v1/beacon/headers/head")?;

        let response = self.client.get(url.into_url()).send().await?;
        let response = handle_error(response).await?;
        let header = response.json::<HeaderResponse>().await?;

        Ok(header.data.header.message.slot)
    }

    pub async fn get_validators(
        &self,
        slot: Slot,
        indices: impl IntoIterator<Item = ValidatorIndex>,
    ) -> Result<Vec<ValidatorSummary>> {
        let url = self.url(&format!("/eth/v1/beacon/states/{slot}/validators"))?;

        let query = indices
            .into_iter()
            .map(|index| ("id", index.to_string()))
            .collect::<Vec<_>>();

        let response = self
            .client
            .get(url.into_url())
            .query(&query)
            .send()
            .await?;

        let response = handle_error(response).await?;
        let validators = response.json::<ValidatorsResponse>().await?;

        Ok(validators
            .data
            .into_iter()
            .map(|record| ValidatorSummary {
                index: record.index,
                pubkey: record.validator.pubkey,
            })
            .collect())
    }

    fn url(&self, path: &str) -> Result<RedactingUrl> {
        self.config.api_url.join(path)
    }
}

async fn handle_error(response: Response) -> Result<Response> {
    if response.status().is_client_error() {
        let message = response.text().await?;
        bail!(BeaconApiError::BadRequest { message });
    }

    if response.status().is_server_error() {
        let message = response.text().await?;
        bail!(BeaconApiError::NodeInternalError { message });
    }

    Ok(response)
}

#[derive(Deserialize)]
struct BlockResponse {
    data: BlockData,
}

#[derive(Deserialize)]
struct BlockData {
    message: BlockMessage,
}

#[derive(Deserialize)]
struct BlockMessage {
    #[serde(with = "serde_utils::string_or_native")]
    proposer_index: ValidatorIndex,
    body: BlockBody,
}

#[derive(Deserialize)]
struct BlockBody {
    execution_payload: ExecutionPayload,
}

#[derive(Deserialize)]
struct ExecutionPayload {
    #[serde(with = "serde_utils::string_or_native")]
    block_number: ExecutionBlockNumber,
    block_hash: H256,
    fee_recipient: ExecutionAddress,
}

#[derive(Deserialize)]
struct HeaderResponse {
    data: HeaderData,
}

#[derive(Deserialize)]
struct HeaderData {
    header: SignedHeader,
}

#[derive(Deserialize)]
struct SignedHeader {
    message: HeaderMessage,
}

#[derive(Deserialize)]
struct HeaderMessage {
    #[serde(with = "serde_utils::string_or_native")]
    slot: Slot,
}

#[derive(Deserialize)]
struct ValidatorsResponse {
    data: Vec<ValidatorRecord>,
}

#[derive(Deserialize)]
struct ValidatorRecord {
    #[serde(with = "serde_utils::string_or_native")]
    index: ValidatorIndex,
    validator: ValidatorDetails,
}

#[derive(Deserialize)]
struct ValidatorDetails {
    pubkey: Pubkey,
}

#[cfg(test)]
mod tests {
    use httpmock::{Method, MockServer};
    use serde_json::json;

    use super::*;

    fn api_for(server: &MockServer) -> Result<Api> {
        let config = BeaconApiConfig {
            api_url: server.url("").parse()?,
        };

        Ok(Api::new(config, Client::new()))
    }

    #[tokio::test]
    async fn get_block_by_slot_parses_execution_payload_fields() -> Result<()> {
        let server = MockServer::start();

        let body = json!({
            "version": "electra",
            "data": {
                "message": {
                    "slot": "7909000",
                    "proposer_index": "1234567",
                    "body": {
                        "execution_payload": {
                            "block_number": "21000000",
                            "block_hash":
                                "0x1111111111111111111111111111111111111111111111111111111111111111",
                            "fee_recipient": "0x388c818ca8b9251b393131c08a736a67ccb19297",
                        },
                    },
                },
            },
        });

        server.mock(|when, then| {
            when.method(Method::GET).path("/eth/v2/beacon/blocks/7909000");
            then.status(200).json_body(body.clone());
        });

        let block = api_for(&server)?.get_block_by_slot(7_909_000).await?;

        assert_eq!(
            block,
            Some(ProposedBlock {
                proposer_index: 1_234_567,
                block_number: 21_000_000,
                block_hash: H256::repeat_byte(0x11),
                fee_recipient: "0x388c818ca8b9251b393131c08a736a67ccb19297".parse()?,
            }),
        );

        Ok(())
    }

    #[tokio::test]
    async fn get_block_by_slot_treats_not_found_as_missed() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::GET).path("/eth/v2/beacon/blocks/7909001");
            then.status(404).json_body(json!({
                "code": 404,
                "message": "NOT_FOUND: beacon block at slot 7909001",
            }));
        });

        let block = api_for(&server)?.get_block_by_slot(7_909_001).await?;

        assert_eq!(block, None);

        Ok(())
    }

    #[tokio::test]
    async fn get_head_slot_parses_header_response() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::GET).path("/eth/v1/beacon/headers/head");
            then.status(200).json_body(json!({
                "data": {
                    "header": {
                        "message": {
                            "slot": "7909123",
                        },
                    },
                },
            }));
        });

        let slot = api_for(&server)?.get_head_slot().await?;

        assert_eq!(slot, 7_909_123);

        Ok(())
    }

    #[tokio::test]
    async fn get_validators_sends_repeated_id_parameters() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::GET)
                .path("/eth/v1/beacon/states/7909123/validators")
                .query_param("id", "0")
                .query_param("id", "1");
            then.status(200).json_body(json!({
                "data": [
                    {
                        "index": "0",
                        "validator": { "pubkey": format!("0x{}", "11".repeat(48)) },
                    },
                    {
                        "index": "1",
                        "validator": { "pubkey": format!("0x{}", "22".repeat(48)) },
                    },
                ],
            }));
        });

        let validators = api_for(&server)?.get_validators(7_909_123, [0, 1]).await?;

        assert_eq!(
            validators,
            vec![
                ValidatorSummary {
                    index: 0,
                    pubkey: Pubkey::from_bytes(&[0x11; Pubkey::LENGTH]),
                },
                ValidatorSummary {
                    index: 1,
                    pubkey: Pubkey::from_bytes(&[0x22; Pubkey::LENGTH]),
                },
            ],
        );

        Ok(())
    }

    #[tokio::test]
    async fn server_errors_are_reported_with_the_response_body() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::GET).path("/eth/v1/beacon/headers/head");
            then.status(500).body("beacon node is syncing");
        });

        let error = api_for(&server)?
            .get_head_slot()
            .await
            .expect_err("server errors should fail the request");

        assert_eq!(
            error.downcast::<BeaconApiError>()?,
            BeaconApiError::NodeInternalError {
                message: "beacon node is syncing".to_owned(),
            },
        );

        Ok(())
    }
}
