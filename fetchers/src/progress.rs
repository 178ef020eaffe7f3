use std::sync::Arc;

use types::primitives::{ExecutionBlockNumber, Slot};

#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// Fraction of the transaction window covered by pagination so far.
    TxPages { fraction: f64 },
    Blocks {
        slot: Slot,
        completed: u64,
        total: u64,
    },
    RelaySweep {
        relay: String,
        remaining_slots: usize,
    },
    RegistryLogs {
        until_block: ExecutionBlockNumber,
        target_block: ExecutionBlockNumber,
    },
    ValidatorBatches { fetched: usize },
}

/// Receives progress updates from long-running fetches. Fetchers report
/// through an `Option<Arc<dyn ProgressObserver>>` so callers that do not
/// care pay nothing.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

/// Forwards progress events to `tracing` at info level.
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_progress(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::TxPages { fraction } => {
                tracing::info!("fetched {:.0}% of reported transactions", fraction * 100.0);
            }
            ProgressEvent::Blocks {
                slot,
                completed,
                total,
            } => {
                tracing::info!("fetched block at slot {slot} ({completed}/{total})");
            }
            ProgressEvent::RelaySweep {
                relay,
                remaining_slots,
            } => {
                tracing::info!("swept relay {relay}, {remaining_slots} slots remaining");
            }
            ProgressEvent::RegistryLogs {
                until_block,
                target_block,
            } => {
                tracing::info!("scanned registry logs up to block {until_block}/{target_block}");
            }
            ProgressEvent::ValidatorBatches { fetched } => {
                tracing::info!("fetched {fetched} validator pubkeys");
            }
        }
    }
}

pub fn report(observer: Option<&Arc<dyn ProgressObserver>>, event: ProgressEvent) {
    if let Some(observer) = observer {
        observer.on_progress(event);
    }
}
