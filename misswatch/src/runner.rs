use std::sync::Arc;

use anyhow::{Context as _, Result};
use fetchers::progress::{LogObserver, ProgressObserver};
use leaderboard::JoinedSnapshots;
use reqwest::Client;
use snapshot::SnapshotStore;
use tracing::info;
use types::snapshots::{
    BlocksSnapshot, OperatorPubkeysSnapshot, RelaysSnapshot, TxsSnapshot,
    ValidatorPubkeysSnapshot,
};

use crate::{misswatch_args::MisswatchCommand, misswatch_config::MisswatchConfig};

pub async fn run(config: &MisswatchConfig, command: MisswatchCommand) -> Result<()> {
    let client = Client::new();
    let observer: Arc<dyn ProgressObserver> = Arc::new(LogObserver);

    match command {
        MisswatchCommand::FetchTxs => fetch_txs(config, &client, &observer).await,
        MisswatchCommand::FetchBlocks => fetch_blocks(config, &client, &observer).await,
        MisswatchCommand::FetchRelays => fetch_relays(config, &client, &observer).await,
        MisswatchCommand::FetchValidatorPubkeys => {
            fetch_validator_pubkeys(config, &client, &observer).await
        }
        MisswatchCommand::FetchOperatorPubkeys => {
            fetch_operator_pubkeys(config, &client, &observer).await
        }
        MisswatchCommand::BuilderLeaderboard => builder_leaderboard(config),
        MisswatchCommand::RelayLeaderboard => relay_leaderboard(config),
        MisswatchCommand::DepositorLeaderboard => depositor_leaderboard(config),
        MisswatchCommand::OperatorLeaderboard => operator_leaderboard(config),
        MisswatchCommand::FetchAll => {
            fetch_txs(config, &client, &observer).await?;
            fetch_blocks(config, &client, &observer).await?;
            fetch_relays(config, &client, &observer).await?;
            fetch_validator_pubkeys(config, &client, &observer).await?;
            fetch_operator_pubkeys(config, &client, &observer).await?;
            builder_leaderboard(config)?;
            relay_leaderboard(config)?;
            depositor_leaderboard(config)?;
            operator_leaderboard(config)
        }
    }
}

fn txs_store(config: &MisswatchConfig) -> SnapshotStore<TxsSnapshot> {
    SnapshotStore::new(&config.data_dir, "txs.json")
}

fn blocks_store(config: &MisswatchConfig) -> SnapshotStore<BlocksSnapshot> {
    SnapshotStore::new(&config.data_dir, "blocks.json")
}

fn relays_store(config: &MisswatchConfig) -> SnapshotStore<RelaysSnapshot> {
    SnapshotStore::new(&config.data_dir, "relays.json")
}

fn validator_pubkeys_store(config: &MisswatchConfig) -> SnapshotStore<ValidatorPubkeysSnapshot> {
    SnapshotStore::new(&config.data_dir, "validator_pubkeys.json")
}

fn operator_pubkeys_store(config: &MisswatchConfig) -> SnapshotStore<OperatorPubkeysSnapshot> {
    SnapshotStore::new(&config.data_dir, "operator_pubkeys.json")
}

async fn fetch_txs(
    config: &MisswatchConfig,
    client: &Client,
    observer: &Arc<dyn ProgressObserver>,
) -> Result<()> {
    let api = miss_reports_api::Api::new(
        miss_reports_api::MissReportsApiConfig {
            api_url: config.miss_reports_api_url()?,
        },
        client.clone(),
    );

    let fetch_config = fetchers::transactions::Config {
        delay: config.delay,
        interval: config.interval,
        propagation_time: config.propagation_time,
        min_num_misses: config.min_num_misses,
    };

    fetchers::transactions::fetch_txs(&api, &txs_store(config), &fetch_config, Some(observer))
        .await?;

    Ok(())
}

async fn fetch_blocks(
    config: &MisswatchConfig,
    client: &Client,
    observer: &Arc<dyn ProgressObserver>,
) -> Result<()> {
    let api = beacon_api::Api::new(
        beacon_api::BeaconApiConfig {
            api_url: config.beacon_api_url()?,
        },
        client.clone(),
    );

    fetchers::blocks::fetch_blocks(
        &api,
        &txs_store(config),
        &blocks_store(config),
        Some(observer),
    )
    .await?;

    Ok(())
}

async fn fetch_relays(
    config: &MisswatchConfig,
    client: &Client,
    observer: &Arc<dyn ProgressObserver>,
) -> Result<()> {
    let api = relay_api::Api::new(client.clone());
    let relays = config.relays()?;

    fetchers::relays::fetch_relays(
        &api,
        &relays,
        &blocks_store(config),
        &relays_store(config),
        Some(observer),
    )
    .await?;

    Ok(())
}

async fn fetch_validator_pubkeys(
    config: &MisswatchConfig,
    client: &Client,
    observer: &Arc<dyn ProgressObserver>,
) -> Result<()> {
    let api = beacon_api::Api::new(
        beacon_api::BeaconApiConfig {
            api_url: config.beacon_api_url()?,
        },
        client.clone(),
    );

    let fetch_config = fetchers::validator_pubkeys::Config {
        batch_size: config.validator_batch_size,
    };

    fetchers::validator_pubkeys::fetch_validator_pubkeys(
        &api,
        &validator_pubkeys_store(config),
        &fetch_config,
        Some(observer),
    )
    .await?;

    Ok(())
}

async fn fetch_operator_pubkeys(
    config: &MisswatchConfig,
    client: &Client,
    observer: &Arc<dyn ProgressObserver>,
) -> Result<()> {
    let api = execution_api::Api::new(
        execution_api::ExecutionApiConfig {
            api_url: config.execution_api_url()?,
        },
        client.clone(),
    );

    let fetch_config = fetchers::operator_pubkeys::Config {
        blocks_per_page: config.logs_blocks_per_page,
    };

    fetchers::operator_pubkeys::fetch_operator_pubkeys(
        &api,
        &operator_pubkeys_store(config),
        &fetch_config,
        Some(observer),
    )
    .await?;

    Ok(())
}

fn joined_snapshots(config: &MisswatchConfig) -> Result<JoinedSnapshots> {
    let txs = txs_store(config)
        .load()?
        .context("transaction snapshot is missing; run fetch-txs first")?;

    let blocks = blocks_store(config)
        .load()?
        .context("block snapshot is missing; run fetch-blocks first")?;

    let relays = relays_store(config)
        .load()?
        .context("relay snapshot is missing; run fetch-relays first")?;

    JoinedSnapshots::new(txs, blocks, relays)
}

fn builder_leaderboard(config: &MisswatchConfig) -> Result<()> {
    let joined = joined_snapshots(config)?;
    let builders = config.builders()?;

    let report = leaderboard::builder_report(&joined, &builders, config.min_market_share);

    let store = SnapshotStore::new(&config.data_dir, "builder_leaderboard.json");
    store.save(&report)?;

    info!("wrote builder leaderboard to {}", store.path().display());

    Ok(())
}

fn relay_leaderboard(config: &MisswatchConfig) -> Result<()> {
    let joined = joined_snapshots(config)?;

    let report = leaderboard::relay_report(&joined, config.min_market_share);

    let store = SnapshotStore::new(&config.data_dir, "relay_leaderboard.json");
    store.save(&report)?;

    info!("wrote relay leaderboard to {}", store.path().display());

    Ok(())
}

fn depositor_leaderboard(config: &MisswatchConfig) -> Result<()> {
    let joined = joined_snapshots(config)?;

    let validator_pubkeys = validator_pubkeys_store(config)
        .load()?
        .context("validator snapshot is missing; run fetch-validator-pubkeys first")?;

    let depositors = config.depositors()?;

    let report = leaderboard::depositor_report(
        &joined,
        &validator_pubkeys,
        &depositors,
        config.min_market_share,
    );

    let store = SnapshotStore::new(&config.data_dir, "depositor_leaderboard.json");
    store.save(&report)?;

    info!("wrote depositor leaderboard to {}", store.path().display());

    Ok(())
}

fn operator_leaderboard(config: &MisswatchConfig) -> Result<()> {
    let joined = joined_snapshots(config)?;

    let validator_pubkeys = validator_pubkeys_store(config)
        .load()?
        .context("validator snapshot is missing; run fetch-validator-pubkeys first")?;

    let operator_pubkeys = operator_pubkeys_store(config)
        .load()?
        .context("operator snapshot is missing; run fetch-operator-pubkeys first")?;

    let operator_names = config.operator_names()?;

    let report = leaderboard::operator_report(
        &joined,
        &validator_pubkeys,
        &operator_pubkeys,
        &operator_names,
    );

    let store = SnapshotStore::new(&config.data_dir, "operator_leaderboard.json");
    store.save(&report)?;

    info!("wrote operator leaderboard to {}", store.path().display());

    Ok(())
}
