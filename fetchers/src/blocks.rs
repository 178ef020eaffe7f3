use std::sync::Arc;

use anyhow::{bail, Result};
use snapshot::{next_fetch_window, SnapshotStore};
use thiserror::Error;
use tracing::info;
use types::snapshots::{BlockRecord, BlocksSnapshot, TxsSnapshot};

use crate::progress::{report, ProgressEvent, ProgressObserver};

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Error {
    #[error("transaction snapshot is missing; fetch transactions first")]
    MissingTxsSnapshot,
}

/// Fetches proposal outcomes for every slot in the transaction snapshot
/// window. The block snapshot always tracks the transaction snapshot; if the
/// latter is gone, the former is stale and is removed.
pub async fn fetch_blocks(
    api: &beacon_api::Api,
    txs_store: &SnapshotStore<TxsSnapshot>,
    blocks_store: &SnapshotStore<BlocksSnapshot>,
    observer: Option<&Arc<dyn ProgressObserver>>,
) -> Result<BlocksSnapshot> {
    let Some(txs_snapshot) = txs_store.load()? else {
        blocks_store.remove()?;
        bail!(Error::MissingTxsSnapshot);
    };

    let desired = txs_snapshot.window();
    let previous = blocks_store.load()?;

    let request = next_fetch_window(previous.as_ref().map(BlocksSnapshot::window), desired)?;

    let mut new_blocks = vec![];

    if let Some((first, last)) = clock::slots_in_window(request)? {
        let total = last - first + 1;

        for slot in first..=last {
            let block = match api.get_block_by_slot(slot).await? {
                Some(proposed) => BlockRecord {
                    slot,
                    missed: false,
                    block_number: Some(proposed.block_number),
                    block_hash: Some(proposed.block_hash),
                    fee_recipient: Some(proposed.fee_recipient),
                    proposer_index: Some(proposed.proposer_index),
                },
                None => BlockRecord::missed(slot),
            };

            new_blocks.push(block);

            report(
                observer,
                ProgressEvent::Blocks {
                    slot,
                    completed: slot - first + 1,
                    total,
                },
            );
        }
    }

    let retained_slots = clock::slots_in_window(desired)?;

    let mut blocks = previous
        .map(|snapshot| snapshot.blocks)
        .unwrap_or_default()
        .into_iter()
        .filter(|block| {
            let in_window = retained_slots
                .is_some_and(|(first, last)| (first..=last).contains(&block.slot));

            let refetched = new_blocks
                .first()
                .is_some_and(|new_first| block.slot >= new_first.slot);

            in_window && !refetched
        })
        .collect::<Vec<_>>();

    blocks.extend(new_blocks);
    blocks.sort_by_key(|block| block.slot);

    let snapshot = BlocksSnapshot {
        fetched_from: desired.from,
        fetched_to: desired.to,
        blocks,
    };

    blocks_store.save(&snapshot)?;

    info!(
        "saved {} blocks ({} missed) covering [{}, {}]",
        snapshot.blocks.len(),
        snapshot.missed_slots().count(),
        snapshot.fetched_from,
        snapshot.fetched_to,
    );

    Ok(snapshot)
}
