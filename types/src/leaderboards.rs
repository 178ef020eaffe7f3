//! Output formats for the four miss leaderboards.

use serde::{Deserialize, Serialize};

use crate::primitives::UnixSeconds;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuilderRow {
    pub builder: String,
    pub num_misses: u64,
    pub market_share: f64,
    pub weighted_num_misses: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelayRow {
    pub relay: String,
    pub num_misses: u64,
    pub market_share: f64,
    pub weighted_num_misses: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DepositorRow {
    pub depositor: String,
    pub num_misses: u64,
    pub market_share: f64,
    pub weighted_num_misses: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperatorRow {
    pub operator: String,
    pub num_misses: u64,
    pub market_share: f64,
    pub weighted_num_misses: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuilderLeaderboard {
    pub fetched_from: UnixSeconds,
    pub fetched_to: UnixSeconds,
    pub builder_leaderboard: Vec<BuilderRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelayLeaderboard {
    pub fetched_from: UnixSeconds,
    pub fetched_to: UnixSeconds,
    pub relay_leaderboard: Vec<RelayRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DepositorLeaderboard {
    pub fetched_from: UnixSeconds,
    pub fetched_to: UnixSeconds,
    pub depositor_leaderboard: Vec<DepositorRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperatorLeaderboard {
    pub fetched_from: UnixSeconds,
    pub fetched_to: UnixSeconds,
    pub operator_leaderboard: Vec<OperatorRow>,
}
