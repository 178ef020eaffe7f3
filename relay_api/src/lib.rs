pub use crate::api::{Api, RelayApiError};

mod api;
