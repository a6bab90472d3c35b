pub mod config;
pub mod client;
pub mod params;
pub mod query;
pub mod executor;
pub mod result;
pub mod invocation;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{AthenaConfig, PollPolicy};
pub use client::{
    AthenaError, AwsQueryService, ExecutionState, ExecutionStatus, QueryExecutionId, QueryService,
    ResultPage,
};
pub use params::RequestParams;
pub use query::ImpressionQuery;
pub use executor::QueryExecutor;
pub use result::{grid_to_records, QueryMetadata, QueryResult, Record, ResultGrid};
pub use invocation::{run_invocation, ApiResponse};
pub use tokio_util::sync::CancellationToken;
