use std::{collections::BTreeMap, sync::Arc};

use anyhow::{bail, Result};
use snapshot::{merge_validator_pubkeys, SnapshotStore};
use thiserror::Error;
use tracing::info;
use types::{primitives::Slot, snapshots::ValidatorPubkeysSnapshot};

use crate::progress::{report, ProgressEvent, ProgressObserver};

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Error {
    #[error(
        "head slot {head_slot} is not past the snapshot fetched at slot {fetched_at_slot}; \
         the clock of the node has regressed"
    )]
    HeadSlotRegression {
        head_slot: Slot,
        fetched_at_slot: Slot,
    },
}

pub struct Config {
    /// Validator indexes requested per Beacon API call.
    pub batch_size: u64,
}

/// Extends the validator registry snapshot with pubkeys of validators
/// activated since the last run. Indexes are assigned sequentially and
/// pubkeys never change, so fetching resumes from the highest known index.
pub async fn fetch_validator_pubkeys(
    api: &beacon_api::Api,
    store: &SnapshotStore<ValidatorPubkeysSnapshot>,
    config: &Config,
    observer: Option<&Arc<dyn ProgressObserver>>,
) -> Result<ValidatorPubkeysSnapshot> {
    let previous = store.load()?;
    let head_slot = api.get_head_slot().await?;

    if let Some(previous) = &previous {
        if head_slot <= previous.fetched_at_slot {
            bail!(Error::HeadSlotRegression {
                head_slot,
                fetched_at_slot: previous.fetched_at_slot,
            });
        }
    }

    // The highest known index is requested again in case the previous run
    // stopped mid-batch. Existing entries win when merging.
    let mut next_index = previous
        .as_ref()
        .and_then(|snapshot| snapshot.pubkeys.keys().next_back().copied())
        .unwrap_or_default();

    let mut fetched = BTreeMap::new();

    loop {
        let indices = next_index..next_index + config.batch_size;
        let batch = api.get_validators(head_slot, indices).await?;
        let batch_len = batch.len();

        fetched.extend(
            batch
                .into_iter()
                .map(|validator| (validator.index, validator.pubkey)),
        );

        report(
            observer,
            ProgressEvent::ValidatorBatches {
                fetched: fetched.len(),
            },
        );

        if (batch_len as u64) < config.batch_size {
            break;
        }

        next_index += config.batch_size;
    }

    let pubkeys = merge_validator_pubkeys(
        previous.map(|snapshot| snapshot.pubkeys).unwrap_or_default(),
        fetched,
    );

    let snapshot = ValidatorPubkeysSnapshot {
        fetched_at_slot: head_slot,
        pubkeys,
    };

    store.save(&snapshot)?;

    info!(
        "saved {} validator pubkeys fetched at slot {}",
        snapshot.pubkeys.len(),
        snapshot.fetched_at_slot,
    );

    Ok(snapshot)
}
