// Dump one chart window of a host as JSON (same payload as GET /api/hosts/{id}/series).
// Store and engine settings come from the service config, so navigation uses the same retention.
//
// Usage: CONFIG_FILE=config.toml cargo run --example dump_series -- HOST_ID [RANGE] [OFFSET]
//   RANGE    default: hourly
//   OFFSET   default: 0

use anyhow::Context;
use hostwatch::config::AppConfig;
use hostwatch::history_repo::HistoryRepo;
use hostwatch::series::SeriesEngine;
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let host_id: i64 = args
        .get(1)
        .context("usage: dump_series HOST_ID [RANGE] [OFFSET]")?
        .parse()?;
    let range = args.get(2).map(String::as_str).unwrap_or("hourly");
    let offset: i64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0);

    let config = AppConfig::load()?;
    let repo = Arc::new(
        HistoryRepo::connect(
            &config.database.path,
            1,
            config.database.retention_days,
        )
        .await?,
    );
    let host = repo
        .get_host(host_id)
        .await?
        .with_context(|| format!("host {} not found", host_id))?;

    let engine = SeriesEngine::new(repo, config.engine_settings());
    let series = engine
        .series(&host, range.parse()?, offset, chrono::Utc::now())
        .await?;

    println!("{}", serde_json::to_string_pretty(&series)?);
    Ok(())
}
