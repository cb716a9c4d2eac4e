use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::info;

use crate::config::StaticConfig;
use crate::services::ViewService;
use crate::storage::StorageFactory;
use crate::views::{EntityKind, ViewStats};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsReport {
    kind: EntityKind,
    id: i64,
    views: i64,
    #[serde(flatten)]
    stats: ViewStats,
}

/// `marketview config-gen`
pub fn run_config_gen(output: Option<&str>, force: bool) -> Result<()> {
    let Some(path) = output else {
        println!("{}", StaticConfig::generate_sample_config());
        return Ok(());
    };

    if Path::new(path).exists() && !force {
        bail!("{} already exists, use --force to overwrite", path);
    }

    StaticConfig::default()
        .save_to_file(path)
        .map_err(|e| anyhow::anyhow!("{}", e))
        .with_context(|| format!("Failed to write {}", path))?;
    info!("Sample configuration written to {}", path);
    println!("Sample configuration written to {}", path);
    Ok(())
}

/// `marketview stats --kind <kind> --id <id>`
pub async fn run_stats(kind: EntityKind, id: i64) -> Result<()> {
    let storage = StorageFactory::create().await?;
    let service = ViewService::from_config(Arc::clone(&storage));

    let views = service.get_view_count(kind, id).await?;
    let stats = service.get_view_stats(kind, id).await?;

    let report = StatsReport {
        kind,
        id,
        views,
        stats,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
