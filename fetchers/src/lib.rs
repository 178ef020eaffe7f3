pub mod blocks;
pub mod operator_pubkeys;
pub mod progress;
pub mod relays;
pub mod transactions;
pub mod validator_pubkeys;
