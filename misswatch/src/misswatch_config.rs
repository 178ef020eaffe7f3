use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::de::DeserializeOwned;
use types::{
    redacting_url::RedactingUrl,
    reference::{BuilderEntry, Depositors, OperatorNames, RelayEndpoint},
};

pub struct MisswatchConfig {
    pub data_dir: PathBuf,
    pub beacon_api_url: Option<RedactingUrl>,
    pub execution_api_url: Option<RedactingUrl>,
    pub miss_reports_api_url: Option<RedactingUrl>,
    pub relays_file: Option<PathBuf>,
    pub builders_file: Option<PathBuf>,
    pub depositors_file: Option<PathBuf>,
    pub operator_names_file: Option<PathBuf>,
    pub delay: u64,
    pub interval: u64,
    pub propagation_time: u64,
    pub min_num_misses: u64,
    pub validator_batch_size: u64,
    pub logs_blocks_per_page: u64,
    pub min_market_share: f64,
}

impl MisswatchConfig {
    pub fn beacon_api_url(&self) -> Result<RedactingUrl> {
        require(&self.beacon_api_url, "--beacon-api-url")
    }

    pub fn execution_api_url(&self) -> Result<RedactingUrl> {
        require(&self.execution_api_url, "--execution-api-url")
    }

    pub fn miss_reports_api_url(&self) -> Result<RedactingUrl> {
        require(&self.miss_reports_api_url, "--miss-reports-api-url")
    }

    pub fn relays(&self) -> Result<Vec<RelayEndpoint>> {
        load_reference(require(&self.relays_file, "--relays-file")?)
    }

    pub fn builders(&self) -> Result<Vec<BuilderEntry>> {
        load_reference(require(&self.builders_file, "--builders-file")?)
    }

    pub fn depositors(&self) -> Result<Depositors> {
        load_reference(require(&self.depositors_file, "--depositors-file")?)
    }

    pub fn operator_names(&self) -> Result<OperatorNames> {
        load_reference(require(&self.operator_names_file, "--operator-names-file")?)
    }
}

fn require<T: Clone>(option: &Option<T>, flag: &str) -> Result<T> {
    option
        .clone()
        .with_context(|| format!("{flag} is required for this command"))
}

fn load_reference<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let bytes = fs_err::read(path)?;

    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse reference file {}", path.display()))
}
