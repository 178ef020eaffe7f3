pub use crate::{
    merge::{merge_operator_pubkeys, merge_relays, merge_txs, merge_validator_pubkeys, retain_txs},
    store::SnapshotStore,
    windows::{next_fetch_window, Error as WindowError},
};

mod merge;
mod store;
mod windows;
