use serde::{Deserialize, Serialize};

pub use ethereum_types::H256;

pub type ExecutionAddress = ethereum_types::H160;
pub type ExecutionBlockNumber = u64;
pub type OperatorId = u64;
pub type Slot = u64;
pub type UnixSeconds = u64;
pub type ValidatorIndex = u64;

/// A covered half-open-in-spirit interval of Unix timestamps.
/// `from <= to` is an invariant enforced at construction sites, not here.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct FetchWindow {
    pub from: UnixSeconds,
    pub to: UnixSeconds,
}

impl FetchWindow {
    #[must_use]
    pub const fn new(from: UnixSeconds, to: UnixSeconds) -> Self {
        Self { from, to }
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.from >= self.to
    }
}
