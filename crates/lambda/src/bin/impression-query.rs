//! impression-query — run the impression lookup once from a terminal.
//!
//! Uses the same config, executor and envelope as the Lambda, prints the
//! response body to stdout and exits non-zero on a 500. Ctrl-C abandons the
//! query and asks Athena to stop it.

use clap::Parser;
use tracing::{info, warn};

use impression_athena::{run_invocation, AthenaConfig, AwsQueryService, CancellationToken, QueryExecutor};
use impression_lambda::telemetry::init_tracing;

// ── CLI ─────────────────────────────────────────────────────────────

/// Look up the latest Split impressions for a traffic key.
#[derive(Parser, Debug)]
#[command(name = "impression-query", version, about)]
struct Cli {
    /// Traffic key to filter by.
    #[arg(long)]
    key: Option<String>,

    /// Trailing window in days (clamped to 1..=90).
    #[arg(long)]
    days: Option<String>,

    /// Config profile; `PROD` reads `PROD_ATHENA_*` before `ATHENA_*`.
    #[arg(long, env = "IMPRESSION_PROFILE", default_value = "")]
    profile: String,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(true);

    let cli = Cli::parse();

    let config = AthenaConfig::from_env_profiled(&cli.profile.to_uppercase());
    info!(
        database = %config.database,
        output_location = %config.output_location,
        "loaded athena config"
    );

    let service = AwsQueryService::new(&config).await;
    let executor = QueryExecutor::new(service, config);

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, abandoning query");
            on_ctrl_c.cancel();
        }
    });

    let resp = run_invocation(&executor, cli.key.as_deref(), cli.days.as_deref(), &cancel).await;
    println!("{}", resp.body);

    if !resp.is_success() {
        anyhow::bail!("lookup failed with status {}", resp.status_code);
    }
    Ok(())
}
