pub use crate::api::{Api, BeaconApiConfig, BeaconApiError, ProposedBlock, ValidatorSummary};

mod api;
