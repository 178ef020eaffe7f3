//! Policies for combining previously fetched snapshots with fresh data.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use types::{
    primitives::{OperatorId, Slot, UnixSeconds, ValidatorIndex},
    pubkey::Pubkey,
    snapshots::TxRecord,
};

/// Combines transaction records, with new data replacing old records for the
/// same transaction hash. New records come first to keep recently observed
/// activity near the front of the snapshot.
#[must_use]
pub fn merge_txs(old: Vec<TxRecord>, new: Vec<TxRecord>) -> Vec<TxRecord> {
    let new_hashes = new.iter().map(|tx| tx.tx_hash).collect::<HashSet<_>>();

    let mut merged = new;
    merged.extend(old.into_iter().filter(|tx| !new_hashes.contains(&tx.tx_hash)));
    merged
}

/// Drops transactions whose misses all predate `cutoff`.
#[must_use]
pub fn retain_txs(txs: Vec<TxRecord>, cutoff: UnixSeconds) -> Vec<TxRecord> {
    txs.into_iter()
        .filter(|tx| tx.latest_miss_time().is_some_and(|time| time >= cutoff))
        .collect()
}

/// Validator indexes are assigned once, so existing entries win on conflict.
#[must_use]
pub fn merge_validator_pubkeys(
    mut old: BTreeMap<ValidatorIndex, Pubkey>,
    new: BTreeMap<ValidatorIndex, Pubkey>,
) -> BTreeMap<ValidatorIndex, Pubkey> {
    for (index, pubkey) in new {
        old.entry(index).or_insert(pubkey);
    }

    old
}

/// Operators accumulate signing keys over time; merging takes the union so
/// that keys scanned in earlier log ranges are never lost.
#[must_use]
pub fn merge_operator_pubkeys(
    mut old: BTreeMap<OperatorId, BTreeSet<Pubkey>>,
    new: BTreeMap<OperatorId, BTreeSet<Pubkey>>,
) -> BTreeMap<OperatorId, BTreeSet<Pubkey>> {
    for (operator_id, pubkeys) in new {
        old.entry(operator_id).or_default().extend(pubkeys);
    }

    old
}

/// Overlays freshly swept slots onto previously fetched ones. Fresh sweeps
/// are authoritative for the slots they cover, including slots swept to an
/// empty relay list.
#[must_use]
pub fn merge_relays(
    mut old: BTreeMap<Slot, Vec<String>>,
    new: BTreeMap<Slot, Vec<String>>,
) -> BTreeMap<Slot, Vec<String>> {
    old.extend(new);
    old
}
