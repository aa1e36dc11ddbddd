//! Kassa ledger repair tool.
//!
//! Loads a ledger snapshot, reports drift between stored aggregates and
//! records, recounts every period and writes the repaired snapshot.

use std::fs;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use kassa_core::LedgerService;
use kassa_core::store::{LedgerSnapshot, MemoryStore};
use kassa_shared::AppConfig;

fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let json = config.logging.json;
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    let input = config
        .snapshot
        .input
        .as_ref()
        .context("snapshot.input is not configured (KASSA__SNAPSHOT__INPUT)")?;
    let raw = fs::read_to_string(input)
        .with_context(|| format!("Failed to read snapshot {}", input.display()))?;
    let snapshot = LedgerSnapshot::from_json(&raw).context("Snapshot is not valid JSON")?;
    info!(
        path = %input.display(),
        periods = snapshot.periods.len(),
        accounts = snapshot.accounts.len(),
        records = snapshot.records.len(),
        "Snapshot loaded"
    );

    let store = MemoryStore::from_snapshot(snapshot).context("Snapshot contains duplicate ids")?;
    let ledger = LedgerService::from_config(Arc::new(store), &config);

    let mut drifted = 0usize;
    for period in ledger.store().snapshot()?.periods {
        for drift in ledger.audit_period(period.id)? {
            drifted += 1;
            warn!(
                entity = %drift.entity,
                field = drift.field,
                stored = %drift.stored,
                recounted = %drift.recounted,
                "Aggregate drift"
            );
        }
    }

    let full = ledger.recount_all()?;
    for issue in full
        .periods
        .iter()
        .flat_map(|report| &report.issues)
        .chain(&full.unreachable)
    {
        let issue = serde_json::to_string(issue)?;
        warn!(%issue, "Recount issue");
    }
    info!(
        periods = full.periods.len(),
        drifted,
        issues = full.issue_count(),
        "Recount finished"
    );

    let repaired = ledger.store().snapshot()?.to_json_pretty()?;
    match &config.snapshot.output {
        Some(path) => {
            fs::write(path, repaired)
                .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
            info!(path = %path.display(), "Repaired snapshot written");
        }
        None => println!("{repaired}"),
    }

    Ok(())
}
