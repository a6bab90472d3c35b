//! In-memory [`QueryService`] replaying a fixed status script.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{
    AthenaError, ExecutionState, ExecutionStatus, QueryExecutionId, QueryService, ResultPage,
};
use crate::config::AthenaConfig;
use crate::query::ImpressionQuery;
use crate::result::ResultGrid;

#[derive(Debug, Clone)]
pub struct Submitted {
    pub sql: String,
    pub parameters: Vec<String>,
    pub database: String,
    pub output_location: String,
}

#[derive(Default)]
struct Calls {
    submitted: Vec<Submitted>,
    status: usize,
    stop: usize,
    page_tokens: Vec<Option<String>>,
}

/// Returns statuses in order, repeating the last one once the script runs out.
///
/// Pages are served in order with `page-N` continuation tokens.
pub struct ScriptedService {
    statuses: Vec<ExecutionStatus>,
    pages: Vec<ResultGrid>,
    submit_error: Option<String>,
    status_error: Option<String>,
    results_error: Option<String>,
    status_delay: Duration,
    results_delay: Duration,
    stop_fails: bool,
    calls: Mutex<Calls>,
}

impl ScriptedService {
    pub fn new(statuses: Vec<ExecutionStatus>) -> Self {
        Self {
            statuses,
            pages: vec![ResultGrid::new()],
            submit_error: None,
            status_error: None,
            results_error: None,
            status_delay: Duration::ZERO,
            results_delay: Duration::ZERO,
            stop_fails: false,
            calls: Mutex::new(Calls::default()),
        }
    }

    /// Succeeds on the first status check and serves `grid` as one page.
    pub fn succeeding(grid: ResultGrid) -> Self {
        Self::new(vec![ExecutionStatus::new(ExecutionState::Succeeded)]).with_pages(vec![grid])
    }

    pub fn with_pages(mut self, pages: Vec<ResultGrid>) -> Self {
        self.pages = pages;
        self
    }

    pub fn failing_submit(mut self, message: &str) -> Self {
        self.submit_error = Some(message.to_string());
        self
    }

    pub fn failing_status(mut self, message: &str) -> Self {
        self.status_error = Some(message.to_string());
        self
    }

    pub fn failing_results(mut self, message: &str) -> Self {
        self.results_error = Some(message.to_string());
        self
    }

    /// Every status check takes `delay` before answering.
    pub fn slow_status(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    /// Every result page takes `delay` before arriving.
    pub fn slow_results(mut self, delay: Duration) -> Self {
        self.results_delay = delay;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.stop_fails = true;
        self
    }

    pub fn submitted(&self) -> Vec<Submitted> {
        self.calls.lock().unwrap().submitted.clone()
    }

    pub fn status_calls(&self) -> usize {
        self.calls.lock().unwrap().status
    }

    pub fn stop_calls(&self) -> usize {
        self.calls.lock().unwrap().stop
    }

    pub fn page_tokens(&self) -> Vec<Option<String>> {
        self.calls.lock().unwrap().page_tokens.clone()
    }
}

#[async_trait]
impl QueryService for ScriptedService {
    async fn start_query(
        &self,
        query: &ImpressionQuery,
        config: &AthenaConfig,
    ) -> Result<QueryExecutionId, AthenaError> {
        if let Some(msg) = &self.submit_error {
            return Err(AthenaError::Submit(msg.clone()));
        }
        self.calls.lock().unwrap().submitted.push(Submitted {
            sql: query.sql().to_string(),
            parameters: query.parameters().to_vec(),
            database: config.database.clone(),
            output_location: config.output_location.clone(),
        });
        Ok(QueryExecutionId("scripted-1".into()))
    }

    async fn get_status(&self, _id: &QueryExecutionId) -> Result<ExecutionStatus, AthenaError> {
        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }

        let mut calls = self.calls.lock().unwrap();
        let idx = calls.status.min(self.statuses.len().saturating_sub(1));
        calls.status += 1;

        if let Some(msg) = &self.status_error {
            return Err(AthenaError::Poll(msg.clone()));
        }
        self.statuses
            .get(idx)
            .cloned()
            .ok_or_else(|| AthenaError::Poll("empty status script".into()))
    }

    async fn get_results(
        &self,
        _id: &QueryExecutionId,
        next_token: Option<&str>,
    ) -> Result<ResultPage, AthenaError> {
        if !self.results_delay.is_zero() {
            tokio::time::sleep(self.results_delay).await;
        }

        let mut calls = self.calls.lock().unwrap();
        calls.page_tokens.push(next_token.map(|t| t.to_string()));

        if let Some(msg) = &self.results_error {
            return Err(AthenaError::Fetch(msg.clone()));
        }
        let idx = calls.page_tokens.len() - 1;
        let rows = self.pages.get(idx).cloned().unwrap_or_default();
        let next_token = (idx + 1 < self.pages.len()).then(|| format!("page-{}", idx + 1));
        Ok(ResultPage { rows, next_token })
    }

    async fn stop_query(&self, _id: &QueryExecutionId) -> Result<(), AthenaError> {
        self.calls.lock().unwrap().stop += 1;
        if self.stop_fails {
            return Err(AthenaError::AwsSdk("InvalidRequestException".into()));
        }
        Ok(())
    }
}
