use anyhow::{bail, ensure, Result};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use types::{
    primitives::{ExecutionAddress, ExecutionBlockNumber, H256},
    redacting_url::RedactingUrl,
};

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum ExecutionApiError {
    #[error("bad request to execution node (node response: {message})")]
    BadRequest { message: String },
    #[error("execution node internal error (node response: {message})")]
    NodeInternalError { message: String },
    #[error("execution node returned RPC error {code}: {message}")]
    RpcError { code: i64, message: String },
    #[error("execution node returned neither a result nor an error")]
    MissingResult,
}

#[derive(Clone, Debug)]
pub struct ExecutionApiConfig {
    pub api_url: RedactingUrl,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LogEntry {
    pub topics: Vec<H256>,
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
}

impl LogEntry {
    pub fn data_bytes(&self) -> Result<Vec<u8>> {
        decode_hex_bytes(&self.data)
    }
}

pub struct Api {
    config: ExecutionApiConfig,
    client: Client,
}

impl Api {
    #[must_use]
    pub const fn new(config: ExecutionApiConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub async fn current_block_number(&self) -> Result<ExecutionBlockNumber> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        let quantity = serde_json::from_value::<String>(result)?;

        decode_hex_quantity(&quantity)
    }

    pub async fn get_logs(
        &self,
        address: ExecutionAddress,
        topic: H256,
        from_block: ExecutionBlockNumber,
        to_block: ExecutionBlockNumber,
    ) -> Result<Vec<LogEntry>> {
        let params = json!([{
            "address": address,
            "topics": [topic],
            "fromBlock": format!("{from_block:#x}"),
            "toBlock": format!("{to_block:#x}"),
        }]);

        let result = self.call("eth_getLogs", params).await?;

        Ok(serde_json::from_value(result)?)
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(self.config.api_url.clone().into_url())
            .json(&request)
            .send()
            .await?;

        let response = handle_error(response).await?;
        let envelope = response.json::<RpcResponse>().await?;

        if let Some(error) = envelope.error {
            bail!(ExecutionApiError::RpcError {
                code: error.code,
                message: error.message,
            });
        }

        envelope
            .result
            .ok_or_else(|| ExecutionApiError::MissingResult.into())
    }
}

async fn handle_error(response: Response) -> Result<Response> {
    if response.status().is_client_error() {
        let message = response.text().await?;
        bail!(ExecutionApiError::BadRequest { message });
    }

    if response.status().is_server_error() {
        let message = response.text().await?;
        bail!(ExecutionApiError::NodeInternalError { message });
    }

    Ok(response)
}

pub fn decode_hex_quantity(quantity: &str) -> Result<u64> {
    let digits = quantity
        .strip_prefix("0x")
        .unwrap_or(quantity)
        .trim_start_matches('0');

    if digits.is_empty() {
        return Ok(0);
    }

    Ok(u64::from_str_radix(digits, 16)?)
}

fn decode_hex_bytes(data: &str) -> Result<Vec<u8>> {
    let digits = data.strip_prefix("0x").unwrap_or(data);

    ensure!(
        digits.len() % 2 == 0,
        "hex data has an odd number of digits: {data}",
    );

    Ok(hex::decode(digits)?)
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}
