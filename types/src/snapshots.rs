//! On-disk snapshot formats for incrementally fetched data.
//!
//! Every snapshot that covers a time window records `fetched_from` and
//! `fetched_to`. Numeric fields use [`serde_utils::string_or_native`] where
//! upstream APIs are known to return numbers as JSON strings.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    primitives::{
        ExecutionAddress, ExecutionBlockNumber, FetchWindow, OperatorId, Slot, UnixSeconds,
        ValidatorIndex, H256,
    },
    pubkey::Pubkey,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissEvent {
    pub block_hash: H256,
    #[serde(with = "serde_utils::string_or_native")]
    pub slot: Slot,
    #[serde(with = "serde_utils::string_or_native")]
    pub proposal_time: UnixSeconds,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub tx_hash: H256,
    pub misses: Vec<MissEvent>,
}

impl TxRecord {
    /// Time of the latest recorded miss, used for retention cutoffs.
    #[must_use]
    pub fn latest_miss_time(&self) -> Option<UnixSeconds> {
        self.misses.iter().map(|miss| miss.proposal_time).max()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxsSnapshot {
    pub fetched_from: UnixSeconds,
    pub fetched_to: UnixSeconds,
    pub propagation_time: u64,
    pub min_num_misses: u64,
    pub txs: Vec<TxRecord>,
}

impl TxsSnapshot {
    #[must_use]
    pub const fn window(&self) -> FetchWindow {
        FetchWindow::new(self.fetched_from, self.fetched_to)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    #[serde(with = "serde_utils::string_or_native")]
    pub slot: Slot,
    pub missed: bool,
    pub block_number: Option<ExecutionBlockNumber>,
    pub block_hash: Option<H256>,
    pub fee_recipient: Option<ExecutionAddress>,
    pub proposer_index: Option<ValidatorIndex>,
}

impl BlockRecord {
    #[must_use]
    pub const fn missed(slot: Slot) -> Self {
        Self {
            slot,
            missed: true,
            block_number: None,
            block_hash: None,
            fee_recipient: None,
            proposer_index: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlocksSnapshot {
    pub fetched_from: UnixSeconds,
    pub fetched_to: UnixSeconds,
    pub blocks: Vec<BlockRecord>,
}

impl BlocksSnapshot {
    #[must_use]
    pub const fn window(&self) -> FetchWindow {
        FetchWindow::new(self.fetched_from, self.fetched_to)
    }

    pub fn missed_slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.blocks
            .iter()
            .filter(|block| block.missed)
            .map(|block| block.slot)
    }
}

/// Relays that delivered a payload for each swept slot.
///
/// Slots swept without any relay claiming them map to an empty list, which
/// distinguishes "checked, unattributed" from "never checked".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaysSnapshot {
    pub fetched_from: UnixSeconds,
    pub fetched_to: UnixSeconds,
    #[serde(with = "serde_utils::quoted_u64_keys")]
    pub relays: BTreeMap<Slot, Vec<String>>,
}

impl RelaysSnapshot {
    #[must_use]
    pub const fn window(&self) -> FetchWindow {
        FetchWindow::new(self.fetched_from, self.fetched_to)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorPubkeysSnapshot {
    #[serde(with = "serde_utils::string_or_native")]
    pub fetched_at_slot: Slot,
    #[serde(with = "serde_utils::quoted_u64_keys")]
    pub pubkeys: BTreeMap<ValidatorIndex, Pubkey>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorPubkeysSnapshot {
    pub fetched_until_block: ExecutionBlockNumber,
    #[serde(with = "serde_utils::quoted_u64_keys")]
    pub operator_pubkeys: BTreeMap<OperatorId, BTreeSet<Pubkey>>,
}
