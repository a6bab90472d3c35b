//! One request in, one envelope out.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::client::{AthenaError, QueryService};
use crate::executor::QueryExecutor;
use crate::params::RequestParams;
use crate::query::ImpressionQuery;

/// HTTP status plus JSON body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    pub body: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ApiResponse {
    pub fn ok(body: String) -> Self {
        Self {
            status_code: 200,
            body,
        }
    }

    pub fn error(message: &str) -> Self {
        let body = serde_json::to_string(&ErrorBody { error: message })
            .unwrap_or_else(|_| r#"{"error":"internal error"}"#.to_string());
        Self {
            status_code: 500,
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Normalize, query, transform. Every failure becomes a 500 envelope.
pub async fn run_invocation<S: QueryService>(
    executor: &QueryExecutor<S>,
    key: Option<&str>,
    days: Option<&str>,
    cancel: &CancellationToken,
) -> ApiResponse {
    let params = RequestParams::from_query(key, days);
    info!(key = %params.key, days = params.days, "Impression lookup");

    match lookup(executor, &params, cancel).await {
        Ok(body) => ApiResponse::ok(body),
        Err(e) => {
            error!(error = %e, "Handler error");
            ApiResponse::error(&e.to_string())
        }
    }
}

async fn lookup<S: QueryService>(
    executor: &QueryExecutor<S>,
    params: &RequestParams,
    cancel: &CancellationToken,
) -> Result<String, AthenaError> {
    let query = ImpressionQuery::latest_per_day(params);
    let result = executor.execute(&query, cancel).await?;
    Ok(serde_json::to_string(&result.to_records())?)
}
