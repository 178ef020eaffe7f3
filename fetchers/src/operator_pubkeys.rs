use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use anyhow::Result;
use execution_api::{
    SigningKeyAdded, CURATED_MODULE_ADDRESS, CURATED_MODULE_DEPLOY_BLOCK, SIGNING_KEY_ADDED_TOPIC,
};
use snapshot::{merge_operator_pubkeys, SnapshotStore};
use tracing::info;
use types::{
    primitives::{ExecutionBlockNumber, OperatorId},
    pubkey::Pubkey,
    snapshots::OperatorPubkeysSnapshot,
};

use crate::progress::{report, ProgressEvent, ProgressObserver};

/// Blocks below the chain head that are considered final enough to scan.
/// Logs closer to the head could still be reorganized away.
const REORG_DELAY: ExecutionBlockNumber = 10;

pub struct Config {
    /// Execution blocks scanned per `eth_getLogs` call.
    pub blocks_per_page: ExecutionBlockNumber,
}

/// Scans the staking registry for `SigningKeyAdded` events and accumulates
/// the signing keys of each node operator. Keys are only ever added to the
/// snapshot; a key that shows up in an already scanned range is kept.
pub async fn fetch_operator_pubkeys(
    api: &execution_api::Api,
    store: &SnapshotStore<OperatorPubkeysSnapshot>,
    config: &Config,
    observer: Option<&Arc<dyn ProgressObserver>>,
) -> Result<OperatorPubkeysSnapshot> {
    let previous = store.load()?;

    let current_block = api.current_block_number().await?;
    let target_block = (current_block + 1).saturating_sub(REORG_DELAY);

    let from_block = previous
        .as_ref()
        .map(|snapshot| snapshot.fetched_until_block)
        .unwrap_or(CURATED_MODULE_DEPLOY_BLOCK);

    if target_block <= from_block {
        info!("operator registry was already scanned up to block {from_block}");

        let snapshot = previous.unwrap_or(OperatorPubkeysSnapshot {
            fetched_until_block: from_block,
            operator_pubkeys: BTreeMap::new(),
        });

        store.save(&snapshot)?;

        return Ok(snapshot);
    }

    let address = CURATED_MODULE_ADDRESS.parse()?;
    let topic = SIGNING_KEY_ADDED_TOPIC.parse()?;

    let mut fetched: BTreeMap<OperatorId, BTreeSet<Pubkey>> = BTreeMap::new();

    let mut page_from = from_block;

    while page_from < target_block {
        let page_to = target_block.min(page_from + config.blocks_per_page);

        let logs = api.get_logs(address, topic, page_from, page_to).await?;

        for log in logs {
            let SigningKeyAdded {
                operator_id,
                pubkey,
            } = SigningKeyAdded::from_log(&log)?;

            fetched.entry(operator_id).or_default().insert(pubkey);
        }

        report(
            observer,
            ProgressEvent::RegistryLogs {
                until_block: page_to,
                target_block,
            },
        );

        page_from = page_to;
    }

    let operator_pubkeys = merge_operator_pubkeys(
        previous
            .map(|snapshot| snapshot.operator_pubkeys)
            .unwrap_or_default(),
        fetched,
    );

    let snapshot = OperatorPubkeysSnapshot {
        fetched_until_block: target_block,
        operator_pubkeys,
    };

    store.save(&snapshot)?;

    info!(
        "saved signing keys of {} operators scanned up to block {}",
        snapshot.operator_pubkeys.len(),
        snapshot.fetched_until_block,
    );

    Ok(snapshot)
}
