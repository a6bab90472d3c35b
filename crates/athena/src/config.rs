use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// S3 prefix Athena writes query results and metadata to.
pub const DEFAULT_OUTPUT_LOCATION: &str = "s3://athena-query-results-split/";

/// Glue database holding the `impressions4` table.
pub const DEFAULT_DATABASE: &str = "split";

pub const DEFAULT_REGION: &str = "us-west-2";

// ── Env helpers ──────────────────────────────────────────────────

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries `{PROFILE}_{KEY}` first, falls back to `{KEY}`.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_f64(profile: &str, key: &str, default: f64) -> f64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .filter(|v: &f64| v.is_finite() && *v >= 1.0)
        .unwrap_or(default)
}

// ── PollPolicy ───────────────────────────────────────────────────

/// How the executor waits for a submitted query to reach a terminal state.
///
/// The first status check happens after `initial_delay_ms`; each following
/// wait is multiplied by `backoff_factor` and capped at `max_delay_ms`.
/// Polling stops after `max_attempts` status checks or once `timeout_seconds`
/// have elapsed since submission, whichever comes first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_attempts: u32,
    pub timeout_seconds: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            max_delay_ms: 5000,
            backoff_factor: 1.5,
            max_attempts: 60,
            timeout_seconds: 25,
        }
    }
}

impl PollPolicy {
    pub fn from_env_profiled(profile: &str) -> Self {
        let d = Self::default();
        Self {
            initial_delay_ms: profiled_env_u64(profile, "ATHENA_POLL_INITIAL_MS", d.initial_delay_ms),
            max_delay_ms: profiled_env_u64(profile, "ATHENA_POLL_MAX_MS", d.max_delay_ms),
            backoff_factor: profiled_env_f64(profile, "ATHENA_POLL_BACKOFF", d.backoff_factor),
            max_attempts: profiled_env_u32(profile, "ATHENA_POLL_MAX_ATTEMPTS", d.max_attempts),
            timeout_seconds: profiled_env_u32(profile, "ATHENA_TIMEOUT_SECONDS", d.timeout_seconds),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds as u64)
    }

    /// Delay to wait before status check number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let mut delay = self.initial_delay_ms.min(self.max_delay_ms) as f64;
        for _ in 0..attempt {
            delay = (delay * self.backoff_factor).min(self.max_delay_ms as f64);
        }
        Duration::from_millis(delay as u64)
    }
}

// ── AthenaConfig ─────────────────────────────────────────────────

/// Everything the executor needs to talk to Athena, built once at cold start.
///
/// Reads from environment variables with optional profile prefix.
/// When `IMPRESSION_PROFILE=PROD`, checks `PROD_ATHENA_DATABASE` before `ATHENA_DATABASE`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthenaConfig {
    /// AWS region for Athena queries.
    pub region: String,
    /// Data catalog (empty = Athena's default `AwsDataCatalog`).
    pub catalog: String,
    /// Athena database name.
    pub database: String,
    /// Athena workgroup.
    pub workgroup: String,
    /// S3 path for query results.
    pub output_location: String,
    pub poll: PollPolicy,
}

impl Default for AthenaConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            catalog: String::new(),
            database: DEFAULT_DATABASE.to_string(),
            workgroup: "primary".to_string(),
            output_location: DEFAULT_OUTPUT_LOCATION.to_string(),
            poll: PollPolicy::default(),
        }
    }
}

impl AthenaConfig {
    /// Build config from environment variables.
    ///
    /// Reads `IMPRESSION_PROFILE` to determine profile prefix.
    /// For each key, tries `{PROFILE}_ATHENA_*` first, then `ATHENA_*`.
    /// `ATHENA_REGION` falls back to `AWS_REGION` before using the default.
    pub fn from_env() -> Self {
        let profile = env_opt("IMPRESSION_PROFILE")
            .map(|s| s.to_uppercase())
            .unwrap_or_default();
        Self::from_env_profiled(&profile)
    }

    /// Build config for a specific named profile.
    pub fn from_env_profiled(profile: &str) -> Self {
        let region = profiled_env_opt(profile, "ATHENA_REGION")
            .or_else(|| profiled_env_opt(profile, "AWS_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        Self {
            region,
            catalog: profiled_env_or(profile, "ATHENA_CATALOG", ""),
            database: profiled_env_or(profile, "ATHENA_DATABASE", DEFAULT_DATABASE),
            workgroup: profiled_env_or(profile, "ATHENA_WORKGROUP", "primary"),
            output_location: profiled_env_or(
                profile,
                "ATHENA_OUTPUT_LOCATION",
                DEFAULT_OUTPUT_LOCATION,
            ),
            poll: PollPolicy::from_env_profiled(profile),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
