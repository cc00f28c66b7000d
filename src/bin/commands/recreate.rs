use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use virtdb::{
    LocalDatabase, SchemaSynchronizer, SeedGuard, SeedReport, SeedRunner, SqlScriptExecutor,
    VirtdbConfig,
};

use super::CliHost;

/// Arguments for the Recreate command
#[derive(Args)]
pub struct RecreateArgs {
    /// Recreate the schema without running seed files
    #[clap(long)]
    pub no_seed: bool,
}

/// Recreate the schema in the local file and run the SQL seeds
async fn recreate(config: &VirtdbConfig, seed: bool) -> Result<(Arc<LocalDatabase>, SeedReport)> {
    let tables = config.load_tables()?;
    let db = Arc::new(LocalDatabase::open(Some(&config.sqlite_path()))?);

    SchemaSynchronizer::new(db.as_ref()).recreate(&tables).await?;
    if !seed {
        return Ok((db, SeedReport::default()));
    }

    let executor = SqlScriptExecutor::new(db.clone());
    let sources = SqlScriptExecutor::supported_sources(&config.seeds());
    let report = SeedRunner::new(&executor, &CliHost)
        .run_all(&sources, &SeedGuard::new())
        .await?;
    Ok((db, report))
}

pub async fn run(config: &VirtdbConfig, args: RecreateArgs) -> Result<()> {
    let (db, report) = recreate(config, !args.no_seed).await?;
    let tables = config.load_tables()?;
    println!(
        "Recreated {} tables in {}",
        tables.len(),
        config.sqlite_path().display()
    );

    for path in &report.executed {
        println!("Seeded from {}", path.display());
    }
    for name in tables.names() {
        println!("{:<24} {} rows", name, db.table_count(name)?);
    }
    Ok(())
}
