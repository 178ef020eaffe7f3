use anyhow::Result;
use clap::Parser as _;
use tokio::runtime::Builder;
use tracing_subscriber::EnvFilter;

use crate::misswatch_args::MisswatchArgs;

mod misswatch_args;
mod misswatch_config;
mod runner;

fn main() -> Result<()> {
    initialize_logger();

    let (config, command) = MisswatchArgs::parse().into_config();

    // Every external call completes before the next begins, so a single
    // thread is enough.
    Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(runner::run(&config, command))
}

fn initialize_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            "info,beacon_api=info,execution_api=info,fetchers=info,\
             leaderboard=info,miss_reports_api=info,relay_api=info,snapshot=info",
        )
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
