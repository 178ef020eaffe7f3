pub use crate::{
    joined::{Error as JoinError, JoinedSnapshots},
    ranking::{rank, MarketShares, MissTally, RankedEntity},
    reports::{builder_report, depositor_report, operator_report, relay_report},
};

mod joined;
mod ranking;
mod reports;
