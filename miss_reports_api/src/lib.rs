pub use crate::api::{Api, MissReportsApiConfig, MissReportsApiError, QueryBound, TxsQuery};

mod api;
