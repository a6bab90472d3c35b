//! Query lifecycle: submit, poll to a terminal state, fetch all result pages.
//!
//! Everything after submission is bounded three ways: a status-check budget,
//! a wall-clock deadline measured from submission, and a caller-held
//! [`CancellationToken`]. The deadline and the token cover the status calls
//! and the result fetch as well as the waits between polls. Giving up before
//! the query finishes asks Athena to stop it so nothing is left running
//! without a client.

use std::future::Future;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::{AthenaError, ExecutionState, ExecutionStatus, QueryExecutionId, QueryService};
use crate::config::AthenaConfig;
use crate::query::ImpressionQuery;
use crate::result::{QueryMetadata, QueryResult, ResultGrid};

/// Why a guarded step stopped waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Cancelled,
    Deadline,
}

/// Await `fut` unless `cancel` fires or `deadline` passes first.
///
/// An already-ready `fut` wins over a deadline expiring in the same instant.
async fn guarded<F: Future>(
    fut: F,
    deadline: Instant,
    cancel: &CancellationToken,
) -> Result<F::Output, Interrupt> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interrupt::Cancelled),
        out = fut => Ok(out),
        _ = tokio::time::sleep_until(deadline) => Err(Interrupt::Deadline),
    }
}

/// Drives one [`QueryService`] with an explicit [`AthenaConfig`].
pub struct QueryExecutor<S> {
    service: S,
    config: AthenaConfig,
}

impl<S: QueryService> QueryExecutor<S> {
    pub fn new(service: S, config: AthenaConfig) -> Self {
        Self { service, config }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Run `query` to completion and return the full result grid.
    pub async fn execute(
        &self,
        query: &ImpressionQuery,
        cancel: &CancellationToken,
    ) -> Result<QueryResult, AthenaError> {
        debug!(sql = %query.sql(), parameters = ?query.parameters(), "Starting Athena query");

        let query_id = self.service.start_query(query, &self.config).await?;
        let deadline = Instant::now() + self.config.poll.timeout();
        info!(query_id = %query_id, "Query execution started");

        let (status, polls) = self.poll_until_complete(&query_id, deadline, cancel).await?;

        // The query already succeeded, so there is nothing to stop remotely.
        let grid = match guarded(self.fetch_all(&query_id), deadline, cancel).await {
            Ok(grid) => grid?,
            Err(why) => return Err(self.interrupted(&query_id, why)),
        };

        let metadata = QueryMetadata {
            query_id: query_id.0,
            bytes_scanned: status.bytes_scanned,
            execution_time_ms: status.execution_time_ms,
            polls,
        };

        info!(
            query_id = %metadata.query_id,
            rows = grid.len().saturating_sub(1),
            bytes_scanned = metadata.bytes_scanned,
            execution_time_ms = metadata.execution_time_ms,
            polls = metadata.polls,
            cost_usd = metadata.cost_estimate_usd(),
            "Query succeeded"
        );

        Ok(QueryResult { grid, metadata })
    }

    /// Poll status until terminal, returning the final status and the number
    /// of status checks made.
    async fn poll_until_complete(
        &self,
        query_id: &QueryExecutionId,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<(ExecutionStatus, u32), AthenaError> {
        let policy = &self.config.poll;
        let mut attempt: u32 = 0;

        loop {
            let wake = (Instant::now() + policy.delay_for(attempt)).min(deadline);
            if let Err(why) = guarded(tokio::time::sleep_until(wake), deadline, cancel).await {
                let err = self.interrupted(query_id, why);
                return Err(self.abandon(query_id, err).await);
            }

            let status = match guarded(self.service.get_status(query_id), deadline, cancel).await {
                Ok(status) => status?,
                Err(why) => {
                    let err = self.interrupted(query_id, why);
                    return Err(self.abandon(query_id, err).await);
                }
            };
            attempt += 1;

            debug!(query_id = %query_id, state = ?status.state, attempt, "Polling query status");

            match status.state {
                ExecutionState::Succeeded => return Ok((status, attempt)),

                ExecutionState::Failed => {
                    // No StateChangeReason: report "unknown" rather than an empty message.
                    let reason = status.reason.unwrap_or_else(|| "unknown".to_string());
                    error!(query_id = %query_id, reason = %reason, "Query failed");
                    return Err(AthenaError::QueryFailed {
                        query_id: query_id.0.clone(),
                        reason,
                    });
                }

                ExecutionState::Cancelled => {
                    warn!(query_id = %query_id, "Query was cancelled");
                    return Err(AthenaError::QueryCancelled {
                        query_id: query_id.0.clone(),
                    });
                }

                ExecutionState::Queued | ExecutionState::Running => {}
            }

            if Instant::now() >= deadline {
                let err = self.interrupted(query_id, Interrupt::Deadline);
                return Err(self.abandon(query_id, err).await);
            }

            if attempt >= policy.max_attempts {
                warn!(query_id = %query_id, attempts = attempt, "Poll budget exhausted, cancelling");
                return Err(self
                    .abandon(
                        query_id,
                        AthenaError::PollLimitExceeded {
                            query_id: query_id.0.clone(),
                            attempts: attempt,
                        },
                    )
                    .await);
            }
        }
    }

    fn interrupted(&self, query_id: &QueryExecutionId, why: Interrupt) -> AthenaError {
        match why {
            Interrupt::Cancelled => {
                warn!(query_id = %query_id, "Caller abandoned query");
                AthenaError::Aborted {
                    query_id: query_id.0.clone(),
                }
            }
            Interrupt::Deadline => {
                warn!(
                    query_id = %query_id,
                    timeout_seconds = self.config.poll.timeout_seconds,
                    "Query timed out"
                );
                AthenaError::QueryTimeout {
                    query_id: query_id.0.clone(),
                    seconds: self.config.poll.timeout_seconds,
                }
            }
        }
    }

    /// Best-effort remote stop; the original error is returned either way.
    async fn abandon(&self, query_id: &QueryExecutionId, err: AthenaError) -> AthenaError {
        match self.service.stop_query(query_id).await {
            Ok(()) => info!(query_id = %query_id, "Query cancellation requested"),
            Err(e) => warn!(query_id = %query_id, error = %e, "Failed to cancel query"),
        }
        err
    }

    /// Follow `NextToken` until exhausted. Only the first page carries the
    /// header row, so pages concatenate into one grid.
    async fn fetch_all(&self, query_id: &QueryExecutionId) -> Result<ResultGrid, AthenaError> {
        let mut grid = ResultGrid::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .service
                .get_results(query_id, next_token.as_deref())
                .await?;
            grid.extend(page.rows);

            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
        }

        Ok(grid)
    }
}
