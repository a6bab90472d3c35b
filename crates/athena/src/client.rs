//! AWS Athena service seam.
//!
//! [`QueryService`] is the narrow surface the executor drives: submit, status,
//! result pages, stop. [`AwsQueryService`] implements it on top of the AWS SDK;
//! tests substitute a scripted implementation.

use std::fmt;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_athena::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_athena::types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration};
use tracing::{debug, info};

use crate::config::AthenaConfig;
use crate::query::ImpressionQuery;
use crate::result::ResultGrid;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors that can occur while running a query end to end.
///
/// The display string is what the caller sees in the `error` field of the
/// response body, so terminal-state variants print the bare service message.
#[derive(Debug, thiserror::Error)]
pub enum AthenaError {
    /// Athena rejected the statement on submission.
    #[error("{0}")]
    Submit(String),

    /// Checking the execution status failed.
    #[error("{0}")]
    Poll(String),

    /// The query execution failed on the Athena side.
    #[error("{reason}")]
    QueryFailed { query_id: String, reason: String },

    /// The query was cancelled outside this invocation.
    #[error("Query was cancelled")]
    QueryCancelled { query_id: String },

    /// The query did not finish within the configured deadline.
    #[error("Query {query_id} timed out after {seconds}s")]
    QueryTimeout { query_id: String, seconds: u32 },

    /// The query did not finish within the configured number of status checks.
    #[error("Query {query_id} still running after {attempts} status checks")]
    PollLimitExceeded { query_id: String, attempts: u32 },

    /// The caller abandoned the invocation while the query was in flight.
    #[error("Query {query_id} was abandoned by the caller")]
    Aborted { query_id: String },

    /// Fetching results of a successful query failed.
    #[error("{0}")]
    Fetch(String),

    /// Any other AWS SDK error (stringified).
    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Service types
// ---------------------------------------------------------------------------

/// Opaque handle of one submitted query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryExecutionId(pub String);

impl fmt::Display for QueryExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Athena's execution state vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl From<&QueryExecutionState> for ExecutionState {
    fn from(state: &QueryExecutionState) -> Self {
        match state {
            QueryExecutionState::Succeeded => Self::Succeeded,
            QueryExecutionState::Failed => Self::Failed,
            QueryExecutionState::Cancelled => Self::Cancelled,
            QueryExecutionState::Running => Self::Running,
            // Queued | unknown future variant
            _ => Self::Queued,
        }
    }
}

/// One observation of a query's execution status.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionStatus {
    pub state: ExecutionState,
    /// `StateChangeReason`, set by Athena on failure.
    pub reason: Option<String>,
    pub bytes_scanned: u64,
    pub execution_time_ms: u64,
}

impl ExecutionStatus {
    pub fn new(state: ExecutionState) -> Self {
        Self {
            state,
            reason: None,
            bytes_scanned: 0,
            execution_time_ms: 0,
        }
    }
}

/// One page of `GetQueryResults`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultPage {
    pub rows: ResultGrid,
    pub next_token: Option<String>,
}

/// The asynchronous SQL service the executor drives.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Submit a statement and return its execution handle.
    async fn start_query(
        &self,
        query: &ImpressionQuery,
        config: &AthenaConfig,
    ) -> Result<QueryExecutionId, AthenaError>;

    /// Fetch the current execution status.
    async fn get_status(&self, id: &QueryExecutionId) -> Result<ExecutionStatus, AthenaError>;

    /// Fetch one page of results; `next_token` is `None` for the first page.
    async fn get_results(
        &self,
        id: &QueryExecutionId,
        next_token: Option<&str>,
    ) -> Result<ResultPage, AthenaError>;

    /// Ask the service to stop a running query.
    async fn stop_query(&self, id: &QueryExecutionId) -> Result<(), AthenaError>;
}

// ---------------------------------------------------------------------------
// AWS implementation
// ---------------------------------------------------------------------------

/// Rows requested per `GetQueryResults` call (Athena's maximum).
const RESULT_PAGE_SIZE: i32 = 1000;

/// [`QueryService`] backed by the AWS SDK Athena client.
#[derive(Clone)]
pub struct AwsQueryService {
    athena_client: aws_sdk_athena::Client,
}

impl AwsQueryService {
    /// Load AWS credentials from the environment for the configured region.
    pub async fn new(config: &AthenaConfig) -> Self {
        let region = aws_sdk_athena::config::Region::new(config.region.clone());
        let aws_cfg = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .load()
            .await;

        info!(
            region = %config.region,
            database = %config.database,
            workgroup = %config.workgroup,
            "Athena client initialised"
        );

        Self::from_client(aws_sdk_athena::Client::new(&aws_cfg))
    }

    pub fn from_client(athena_client: aws_sdk_athena::Client) -> Self {
        Self { athena_client }
    }
}

#[async_trait]
impl QueryService for AwsQueryService {
    async fn start_query(
        &self,
        query: &ImpressionQuery,
        config: &AthenaConfig,
    ) -> Result<QueryExecutionId, AthenaError> {
        let mut ctx = QueryExecutionContext::builder();
        if !config.catalog.is_empty() {
            ctx = ctx.catalog(&config.catalog);
        }
        if !config.database.is_empty() {
            ctx = ctx.database(&config.database);
        }

        let resp = self
            .athena_client
            .start_query_execution()
            .query_string(query.sql())
            .set_execution_parameters(Some(query.parameters().to_vec()))
            .query_execution_context(ctx.build())
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(&config.output_location)
                    .build(),
            )
            .work_group(&config.workgroup)
            .send()
            .await
            .map_err(|e| AthenaError::Submit(sdk_message(&e)))?;

        resp.query_execution_id()
            .map(|id| QueryExecutionId(id.to_string()))
            .ok_or_else(|| AthenaError::Submit("No query execution ID returned".into()))
    }

    async fn get_status(&self, id: &QueryExecutionId) -> Result<ExecutionStatus, AthenaError> {
        let resp = self
            .athena_client
            .get_query_execution()
            .query_execution_id(&id.0)
            .send()
            .await
            .map_err(|e| AthenaError::Poll(sdk_message(&e)))?;

        let qe = resp
            .query_execution()
            .ok_or_else(|| AthenaError::Poll("No query execution in response".into()))?;

        let status = qe.status();
        let stats = qe.statistics();

        Ok(ExecutionStatus {
            state: status
                .and_then(|s| s.state())
                .map(ExecutionState::from)
                .unwrap_or(ExecutionState::Queued),
            reason: status
                .and_then(|s| s.state_change_reason())
                .map(|s| s.to_string()),
            bytes_scanned: stats
                .and_then(|s| s.data_scanned_in_bytes())
                .unwrap_or(0) as u64,
            execution_time_ms: stats
                .and_then(|s| s.engine_execution_time_in_millis())
                .unwrap_or(0) as u64,
        })
    }

    async fn get_results(
        &self,
        id: &QueryExecutionId,
        next_token: Option<&str>,
    ) -> Result<ResultPage, AthenaError> {
        let mut request = self
            .athena_client
            .get_query_results()
            .query_execution_id(&id.0)
            .max_results(RESULT_PAGE_SIZE);

        if let Some(token) = next_token {
            request = request.next_token(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| AthenaError::Fetch(sdk_message(&e)))?;

        let rows: ResultGrid = resp
            .result_set()
            .map(|rs| {
                rs.rows()
                    .iter()
                    .map(|row| {
                        row.data()
                            .iter()
                            .map(|datum| datum.var_char_value().map(|v| v.to_string()))
                            .collect()
                    })
                    .collect()
            })
            .unwrap_or_default();

        debug!(query_id = %id, rows = rows.len(), "Fetched result page");

        Ok(ResultPage {
            rows,
            next_token: resp.next_token().map(|t| t.to_string()),
        })
    }

    async fn stop_query(&self, id: &QueryExecutionId) -> Result<(), AthenaError> {
        self.athena_client
            .stop_query_execution()
            .query_execution_id(&id.0)
            .send()
            .await
            .map_err(|e| AthenaError::AwsSdk(sdk_message(&e)))?;
        Ok(())
    }
}

/// Prefer the service-provided message over the SDK's generic wrapper text.
fn sdk_message<E, R>(err: &SdkError<E, R>) -> String
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: fmt::Debug,
{
    match err.as_service_error().and_then(|e| e.message()) {
        Some(msg) => msg.to_string(),
        None => DisplayErrorContext(err).to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
