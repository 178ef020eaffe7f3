pub use crate::{
    api::{Api, ExecutionApiConfig, ExecutionApiError, LogEntry},
    signing_key_added::{
        SigningKeyAdded, CURATED_MODULE_ADDRESS, CURATED_MODULE_DEPLOY_BLOCK,
        SIGNING_KEY_ADDED_TOPIC,
    },
};

mod api;
mod signing_key_added;
