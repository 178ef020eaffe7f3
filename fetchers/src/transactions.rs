use std::sync::Arc;

use anyhow::{bail, Result};
use miss_reports_api::TxsQuery;
use snapshot::{merge_txs, next_fetch_window, retain_txs, SnapshotStore};
use thiserror::Error;
use tracing::info;
use types::snapshots::TxsSnapshot;

use crate::progress::{report, ProgressEvent, ProgressObserver};

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Error {
    #[error(
        "snapshot was fetched with propagation_time {snapshot_propagation_time} and \
         min_num_misses {snapshot_min_num_misses}; delete it to refetch with new parameters"
    )]
    ParameterMismatch {
        snapshot_propagation_time: u64,
        snapshot_min_num_misses: u64,
    },
}

pub struct Config {
    /// Seconds to stay behind the present, giving reports time to settle.
    pub delay: u64,
    /// Length of the covered window in seconds.
    pub interval: u64,
    pub propagation_time: u64,
    pub min_num_misses: u64,
}

pub async fn fetch_txs(
    api: &miss_reports_api::Api,
    store: &SnapshotStore<TxsSnapshot>,
    config: &Config,
    observer: Option<&Arc<dyn ProgressObserver>>,
) -> Result<TxsSnapshot> {
    let desired = clock::desired_window(config.delay, config.interval)?;
    let previous = store.load()?;

    if let Some(previous) = &previous {
        if previous.propagation_time != config.propagation_time
            || previous.min_num_misses != config.min_num_misses
        {
            bail!(Error::ParameterMismatch {
                snapshot_propagation_time: previous.propagation_time,
                snapshot_min_num_misses: previous.min_num_misses,
            });
        }
    }

    let request = next_fetch_window(previous.as_ref().map(TxsSnapshot::window), desired)?;

    let new_txs = if request.is_empty() {
        info!("transaction snapshot already covers the window");
        vec![]
    } else {
        let query = TxsQuery {
            window: request,
            propagation_time: config.propagation_time,
            min_num_misses: config.min_num_misses,
        };

        api.fetch_txs(query, |fraction| {
            report(observer, ProgressEvent::TxPages { fraction });
        })
        .await?
    };

    let old_txs = previous.map(|snapshot| snapshot.txs).unwrap_or_default();
    let merged = merge_txs(old_txs, new_txs);
    let retained = retain_txs(merged, desired.from);

    let snapshot = TxsSnapshot {
        fetched_from: desired.from,
        fetched_to: desired.to,
        propagation_time: config.propagation_time,
        min_num_misses: config.min_num_misses,
        txs: retained,
    };

    store.save(&snapshot)?;

    info!(
        "saved {} transactions covering [{}, {}]",
        snapshot.txs.len(),
        snapshot.fetched_from,
        snapshot.fetched_to,
    );

    Ok(snapshot)
}
