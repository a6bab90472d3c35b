//! SQL for the impression history lookup.

use crate::params::RequestParams;

/// Source table of Split impressions; `timestamp` is epoch milliseconds.
pub const IMPRESSIONS_TABLE: &str = "impressions4";

/// Maximum rows returned to the caller.
pub const ROW_LIMIT: u32 = 100;

/// A rendered statement plus its positional execution parameters.
///
/// Parameters are SQL literals bound by Athena to the `?` placeholders in
/// order, so user input never becomes part of the statement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpressionQuery {
    sql: String,
    parameters: Vec<String>,
}

impl ImpressionQuery {
    /// Latest impression per split, treatment and UTC day for one key.
    pub fn latest_per_day(params: &RequestParams) -> Self {
        let sql = format!(
            r#"WITH ranked AS (
  SELECT
    key,
    splitname,
    treatment,
    date_format(from_unixtime(timestamp / 1000), '%Y-%m-%d %H:%i:%s') AS utc,
    ROW_NUMBER() OVER (
      PARTITION BY splitname, treatment, date_trunc('day', from_unixtime(timestamp / 1000))
      ORDER BY timestamp DESC
    ) AS rownum
  FROM {table}
  WHERE key = ?
    AND from_unixtime(timestamp / 1000) >= date_add('day', -?, current_date)
)
SELECT key, splitname, treatment, utc
FROM ranked
WHERE rownum = 1
ORDER BY utc DESC
LIMIT {limit}"#,
            table = IMPRESSIONS_TABLE,
            limit = ROW_LIMIT,
        );

        Self {
            sql,
            parameters: vec![quote_literal(&params.key), params.days.to_string()],
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }
}

/// Render `value` as a single-quoted SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
