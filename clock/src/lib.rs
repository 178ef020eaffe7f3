//! Conversions between Unix timestamps and Ethereum mainnet slots.

use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use anyhow::Result;
use thiserror::Error;
use types::primitives::{FetchWindow, Slot, UnixSeconds};

pub const GENESIS_TIME: UnixSeconds = 1_606_824_023;
pub const SECONDS_PER_SLOT: u64 = 12;

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Error {
    #[error("time {time} is before genesis time {GENESIS_TIME}")]
    BeforeGenesis { time: UnixSeconds },
}

/// Latest slot whose start is at or before `time`.
pub fn slot_at_time_floor(time: UnixSeconds) -> Result<Slot, Error> {
    let since_genesis = time
        .checked_sub(GENESIS_TIME)
        .ok_or(Error::BeforeGenesis { time })?;

    Ok(since_genesis / SECONDS_PER_SLOT)
}

/// Earliest slot whose start is at or after `time`.
pub fn slot_at_time_ceil(time: UnixSeconds) -> Result<Slot, Error> {
    let since_genesis = time
        .checked_sub(GENESIS_TIME)
        .ok_or(Error::BeforeGenesis { time })?;

    Ok(since_genesis.div_ceil(SECONDS_PER_SLOT))
}

#[must_use]
pub const fn start_of_slot(slot: Slot) -> UnixSeconds {
    GENESIS_TIME + slot * SECONDS_PER_SLOT
}

/// Slots fully contained in `window`, as an inclusive range.
///
/// Empty windows and windows narrower than a slot yield `None`.
pub fn slots_in_window(window: FetchWindow) -> Result<Option<(Slot, Slot)>, Error> {
    if window.is_empty() {
        return Ok(None);
    }

    let first = slot_at_time_ceil(window.from)?;
    let last = slot_at_time_floor(window.to)?;

    if first > last {
        return Ok(None);
    }

    Ok(Some((first, last)))
}

/// Window ending `delay` seconds before now and spanning `interval` seconds.
pub fn desired_window(delay: u64, interval: u64) -> Result<FetchWindow> {
    let now = unix_time()?;
    let to = now.saturating_sub(delay);
    let from = to.saturating_sub(interval);

    Ok(FetchWindow::new(from, to))
}

fn unix_time() -> Result<UnixSeconds, SystemTimeError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}
