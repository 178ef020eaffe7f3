use std::collections::HashMap;

use anyhow::{ensure, Result};
use thiserror::Error;
use types::{
    primitives::{FetchWindow, H256},
    snapshots::{BlockRecord, BlocksSnapshot, MissEvent, RelaysSnapshot, TxsSnapshot},
};

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Error {
    #[error(
        "{snapshot} snapshot covers {actual:?} instead of {expected:?}; \
         the snapshots were not fetched as one batch"
    )]
    WindowMismatch {
        snapshot: &'static str,
        expected: FetchWindow,
        actual: FetchWindow,
    },
}

/// The three window-stamped snapshots a leaderboard is derived from,
/// verified to cover the same window.
#[derive(Debug)]
pub struct JoinedSnapshots {
    pub txs: TxsSnapshot,
    pub blocks: BlocksSnapshot,
    pub relays: RelaysSnapshot,
}

impl JoinedSnapshots {
    pub fn new(
        txs: TxsSnapshot,
        blocks: BlocksSnapshot,
        relays: RelaysSnapshot,
    ) -> Result<Self> {
        let expected = txs.window();

        ensure!(
            blocks.window() == expected,
            Error::WindowMismatch {
                snapshot: "block",
                expected,
                actual: blocks.window(),
            },
        );

        ensure!(
            relays.window() == expected,
            Error::WindowMismatch {
                snapshot: "relay",
                expected,
                actual: relays.window(),
            },
        );

        Ok(Self {
            txs,
            blocks,
            relays,
        })
    }

    #[must_use]
    pub fn window(&self) -> FetchWindow {
        self.txs.window()
    }

    #[must_use]
    pub fn blocks_by_hash(&self) -> HashMap<H256, &BlockRecord> {
        self.blocks
            .blocks
            .iter()
            .filter_map(|block| Some((block.block_hash?, block)))
            .collect()
    }

    /// Miss events joined to the blocks they occurred in. Misses referencing
    /// blocks outside the window are dropped; a transaction only needs one
    /// in-window miss to have been retained, the rest may be older or newer.
    #[must_use]
    pub fn attributed_misses(&self) -> Vec<(&MissEvent, &BlockRecord)> {
        let blocks_by_hash = self.blocks_by_hash();

        self.txs
            .txs
            .iter()
            .flat_map(|tx| &tx.misses)
            .filter_map(|miss| Some((miss, *blocks_by_hash.get(&miss.block_hash)?)))
            .collect()
    }
}
