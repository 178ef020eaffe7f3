use std::path::PathBuf;

use clap::{Parser, Subcommand};
use types::redacting_url::RedactingUrl;

use crate::misswatch_config::MisswatchConfig;

#[derive(Parser)]
#[command(version, about = "missed-block leaderboards for Ethereum mainnet")]
pub struct MisswatchArgs {
    /// Directory holding snapshot and leaderboard files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Beacon API endpoint
    #[arg(long)]
    beacon_api_url: Option<RedactingUrl>,

    /// Execution JSON-RPC endpoint
    #[arg(long)]
    execution_api_url: Option<RedactingUrl>,

    /// Missed-transaction reports API endpoint
    #[arg(long)]
    miss_reports_api_url: Option<RedactingUrl>,

    /// JSON file listing relay data APIs: [{"name": …, "url": …}]
    #[arg(long)]
    relays_file: Option<PathBuf>,

    /// JSON file mapping builders to fee recipient address prefixes
    #[arg(long)]
    builders_file: Option<PathBuf>,

    /// JSON file mapping validator pubkeys to depositing entities
    #[arg(long)]
    depositors_file: Option<PathBuf>,

    /// JSON file mapping operator ids to display names
    #[arg(long)]
    operator_names_file: Option<PathBuf>,

    /// Seconds to stay behind the present when fetching
    #[arg(long, default_value_t = 1800)]
    delay: u64,

    /// Length of the covered window in seconds
    #[arg(long, default_value_t = 604_800)]
    interval: u64,

    /// Propagation time parameter forwarded to the miss reports API
    #[arg(long, default_value_t = 8)]
    propagation_time: u64,

    /// Minimum reported misses per transaction
    #[arg(long, default_value_t = 2)]
    min_num_misses: u64,

    /// Validator indexes per Beacon API request
    #[arg(long, default_value_t = 10_000)]
    validator_batch_size: u64,

    /// Execution blocks per eth_getLogs request
    #[arg(long, default_value_t = 10_000)]
    logs_blocks_per_page: u64,

    /// Entities with a smaller market share are left out of leaderboards
    #[arg(long, default_value_t = 0.01)]
    min_market_share: f64,

    #[command(subcommand)]
    command: MisswatchCommand,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Subcommand)]
pub enum MisswatchCommand {
    /// Fetch reported missed transactions
    FetchTxs,
    /// Fetch proposal outcomes for the transaction window
    FetchBlocks,
    /// Attribute slots to the relays that delivered them
    FetchRelays,
    /// Fetch the validator pubkey registry
    FetchValidatorPubkeys,
    /// Scan the staking registry for operator signing keys
    FetchOperatorPubkeys,
    /// Write the builder leaderboard
    BuilderLeaderboard,
    /// Write the relay leaderboard
    RelayLeaderboard,
    /// Write the depositor leaderboard
    DepositorLeaderboard,
    /// Write the operator leaderboard
    OperatorLeaderboard,
    /// Run every fetch, then every leaderboard, in order
    FetchAll,
}

impl MisswatchArgs {
    pub fn into_config(self) -> (MisswatchConfig, MisswatchCommand) {
        let Self {
            data_dir,
            beacon_api_url,
            execution_api_url,
            miss_reports_api_url,
            relays_file,
            builders_file,
            depositors_file,
            operator_names_file,
            delay,
            interval,
            propagation_time,
            min_num_misses,
            validator_batch_size,
            logs_blocks_per_page,
            min_market_share,
            command,
        } = self;

        let config = MisswatchConfig {
            data_dir,
            beacon_api_url,
            execution_api_url,
            miss_reports_api_url,
            relays_file,
            builders_file,
            depositors_file,
            operator_names_file,
            delay,
            interval,
            propagation_time,
            min_num_misses,
            validator_batch_size,
            logs_blocks_per_page,
            min_market_share,
        };

        (config, command)
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn arguments_are_consistent() {
        MisswatchArgs::command().debug_assert();
    }

    #[test]
    fn defaults_match_the_documented_constants() {
        let args = MisswatchArgs::parse_from(["misswatch", "fetch-all"]);

        let (config, command) = args.into_config();

        assert_eq!(command, MisswatchCommand::FetchAll);
        assert_eq!(config.interval, 604_800);
        assert_eq!(config.propagation_time, 8);
        assert_eq!(config.min_num_misses, 2);
    }
}
