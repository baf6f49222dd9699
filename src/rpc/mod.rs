pub mod resilient_client;

pub use resilient_client::{ResilientRpcClient, RetryPolicy, UpstreamError};
