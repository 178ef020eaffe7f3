use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use anyhow::{bail, Result};
use snapshot::{merge_relays, next_fetch_window, SnapshotStore};
use thiserror::Error;
use tracing::{info, warn};
use types::{
    primitives::Slot,
    reference::RelayEndpoint,
    snapshots::{BlocksSnapshot, RelaysSnapshot},
};

use crate::progress::{report, ProgressEvent, ProgressObserver};

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Error {
    #[error("block snapshot is missing; fetch blocks first")]
    MissingBlocksSnapshot,
}

/// Attributes every slot in the block snapshot window to the relays that
/// delivered its payload. Slots no relay claims are stored with an empty
/// relay list so they are not swept again.
pub async fn fetch_relays(
    api: &relay_api::Api,
    relays: &[RelayEndpoint],
    blocks_store: &SnapshotStore<BlocksSnapshot>,
    relays_store: &SnapshotStore<RelaysSnapshot>,
    observer: Option<&Arc<dyn ProgressObserver>>,
) -> Result<RelaysSnapshot> {
    let Some(blocks_snapshot) = blocks_store.load()? else {
        bail!(Error::MissingBlocksSnapshot);
    };

    let desired = blocks_snapshot.window();
    let previous = relays_store.load()?;

    let request = next_fetch_window(previous.as_ref().map(RelaysSnapshot::window), desired)?;

    let target_slots = match clock::slots_in_window(request)? {
        Some((first, last)) => blocks_snapshot
            .blocks
            .iter()
            .map(|block| block.slot)
            .filter(|slot| (first..=last).contains(slot))
            .collect::<BTreeSet<_>>(),
        None => BTreeSet::new(),
    };

    let mut attributions = target_slots
        .iter()
        .map(|slot| (*slot, BTreeSet::new()))
        .collect::<BTreeMap<Slot, BTreeSet<String>>>();

    for relay in relays {
        sweep_relay(api, relay, &target_slots, &mut attributions, observer).await?;
    }

    let retained_slots = clock::slots_in_window(desired)?;

    let old = previous
        .map(|snapshot| snapshot.relays)
        .unwrap_or_default()
        .into_iter()
        .filter(|(slot, _)| {
            retained_slots.is_some_and(|(first, last)| (first..=last).contains(slot))
        })
        .collect();

    let new = attributions
        .into_iter()
        .map(|(slot, relays)| (slot, relays.into_iter().collect()))
        .collect();

    let merged = merge_relays(old, new);

    let snapshot = RelaysSnapshot {
        fetched_from: desired.from,
        fetched_to: desired.to,
        relays: merged,
    };

    relays_store.save(&snapshot)?;

    info!(
        "saved relay attributions for {} slots covering [{}, {}]",
        snapshot.relays.len(),
        snapshot.fetched_from,
        snapshot.fetched_to,
    );

    Ok(snapshot)
}

/// Walks one relay's delivered payloads from the newest target slot down
/// until every target slot has been covered by a response. Each response
/// covers the closed slot range from its lowest returned slot up to the
/// request cursor, whether or not the relay delivered anything in between.
async fn sweep_relay(
    api: &relay_api::Api,
    relay: &RelayEndpoint,
    target_slots: &BTreeSet<Slot>,
    attributions: &mut BTreeMap<Slot, BTreeSet<String>>,
    observer: Option<&Arc<dyn ProgressObserver>>,
) -> Result<()> {
    let mut remaining = target_slots.clone();

    while let Some(cursor) = remaining.last().copied() {
        let delivered = api.get_delivered_slots(relay, cursor).await?;

        let Some(lowest) = delivered.iter().copied().min() else {
            warn!(
                "relay {} has no deliveries at or below slot {cursor}",
                relay.name,
            );
            break;
        };

        for slot in delivered {
            if remaining.contains(&slot) {
                attributions
                    .entry(slot)
                    .or_default()
                    .insert(relay.name.clone());
            }
        }

        remaining.retain(|slot| !(lowest..=cursor).contains(slot));

        report(
            observer,
            ProgressEvent::RelaySweep {
                relay: relay.name.clone(),
                remaining_slots: remaining.len(),
            },
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use httpmock::{Method, MockServer};
    use reqwest::Client;
    use serde_json::json;
    use types::snapshots::BlockRecord;

    use super::*;

    fn blocks_snapshot(slots: impl IntoIterator<Item = Slot>) -> BlocksSnapshot {
        let blocks = slots.into_iter().map(BlockRecord::missed).collect::<Vec<_>>();

        let first = blocks.first().map(|block| block.slot).unwrap_or_default();
        let last = blocks.last().map(|block| block.slot).unwrap_or_default();

        BlocksSnapshot {
            fetched_from: clock::start_of_slot(first),
            fetched_to: clock::start_of_slot(last),
            blocks,
        }
    }

    fn delivered(slots: &[Slot]) -> serde_json::Value {
        json!(slots
            .iter()
            .rev()
            .map(|slot| json!({ "slot": slot.to_string() }))
            .collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn fetch_relays_attributes_slots_and_marks_unclaimed_ones() -> Result<()> {
        let server = MockServer::start();

        // First page covers [101, 103], second covers [100, 100].
        server.mock(|when, then| {
            when.method(Method::GET)
                .path("/relay/v1/data/bidtraces/proposer_payload_delivered")
                .query_param("cursor", "103");
            then.status(200).json_body(delivered(&[101, 103]));
        });

        server.mock(|when, then| {
            when.method(Method::GET)
                .path("/relay/v1/data/bidtraces/proposer_payload_delivered")
                .query_param("cursor", "100");
            then.status(200).json_body(delivered(&[100]));
        });

        let relays = vec![RelayEndpoint {
            name: "aestus".to_owned(),
            url: server.url("").parse()?,
        }];

        let directory = tempfile::tempdir()?;
        let blocks_store = SnapshotStore::new(directory.path(), "blocks.json");
        let relays_store = SnapshotStore::new(directory.path(), "relays.json");

        blocks_store.save(&blocks_snapshot([100, 101, 102, 103]))?;

        let snapshot = fetch_relays(
            &relay_api::Api::new(Client::new()),
            &relays,
            &blocks_store,
            &relays_store,
            None,
        )
        .await?;

        assert_eq!(
            snapshot.relays,
            BTreeMap::from([
                (100, vec!["aestus".to_owned()]),
                (101, vec!["aestus".to_owned()]),
                (102, vec![]),
                (103, vec!["aestus".to_owned()]),
            ]),
        );

        Ok(())
    }

    #[tokio::test]
    async fn an_exhausted_relay_stops_its_sweep() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::GET)
                .path("/relay/v1/data/bidtraces/proposer_payload_delivered");
            then.status(200).json_body(json!([]));
        });

        let relays = vec![RelayEndpoint {
            name: "aestus".to_owned(),
            url: server.url("").parse()?,
        }];

        let directory = tempfile::tempdir()?;
        let blocks_store = SnapshotStore::new(directory.path(), "blocks.json");
        let relays_store = SnapshotStore::new(directory.path(), "relays.json");

        blocks_store.save(&blocks_snapshot([100, 101]))?;

        let snapshot = fetch_relays(
            &relay_api::Api::new(Client::new()),
            &relays,
            &blocks_store,
            &relays_store,
            None,
        )
        .await?;

        assert_eq!(
            snapshot.relays,
            BTreeMap::from([(100, vec![]), (101, vec![])]),
        );

        Ok(())
    }

    #[tokio::test]
    async fn missing_blocks_snapshot_is_an_error() -> Result<()> {
        let directory = tempfile::tempdir()?;
        let blocks_store = SnapshotStore::<BlocksSnapshot>::new(directory.path(), "blocks.json");
        let relays_store = SnapshotStore::new(directory.path(), "relays.json");

        let error = fetch_relays(
            &relay_api::Api::new(Client::new()),
            &[],
            &blocks_store,
            &relays_store,
            None,
        )
        .await
        .expect_err("a missing block snapshot should be an error");

        assert_eq!(error.downcast::<Error>()?, Error::MissingBlocksSnapshot);
        assert_eq!(relays_store.load()?, None);

        Ok(())
    }
}
