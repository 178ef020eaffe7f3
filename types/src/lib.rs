pub mod leaderboards;
pub mod primitives;
pub mod pubkey;
pub mod redacting_url;
pub mod reference;
pub mod snapshots;
