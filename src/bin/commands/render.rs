use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Args;
use virtdb::{
    Collaborators, Command, DatabaseClient, LocalDatabase, ResolvedConfig, SqlScriptExecutor,
    VirtdbConfig, VirtualModuleRegistry, PUBLIC_MODULE_ID,
};

use super::CliHost;

/// Arguments for the Render command
#[derive(Args)]
pub struct RenderArgs {
    /// Render for a production build instead of the dev server
    #[clap(long)]
    pub build: bool,

    /// Bind to the hosted database regardless of the configuration
    #[clap(long)]
    pub remote: bool,

    /// Emit an (empty) source map to stderr as the host would receive it
    #[clap(long)]
    pub sourcemap: bool,
}

pub async fn run(config: &VirtdbConfig, args: RenderArgs) -> Result<()> {
    let mut config = config.clone();
    config.remote |= args.remote;

    let tables = config.load_tables()?;

    // The remote backend never touches the local file
    let local: Arc<dyn DatabaseClient> = if config.remote {
        Arc::new(LocalDatabase::open_in_memory()?)
    } else {
        Arc::new(LocalDatabase::open(Some(&config.sqlite_path()))?)
    };
    let client = (!config.remote).then(|| local.clone());

    let mut settings = config.registry_settings(tables);
    settings.seeds = SqlScriptExecutor::supported_sources(&settings.seeds);

    let registry = VirtualModuleRegistry::new(
        settings,
        Collaborators {
            client,
            seed_executor: Arc::new(SqlScriptExecutor::new(local)),
            host: Arc::new(CliHost),
        },
    )?;

    registry.config_resolved(ResolvedConfig {
        command: if args.build {
            Command::Build
        } else {
            Command::Serve
        },
        sourcemap: args.sourcemap,
    });

    let id = registry
        .resolve_id(PUBLIC_MODULE_ID)
        .ok_or_else(|| anyhow!("{} was not resolved", PUBLIC_MODULE_ID))?;
    let output = registry
        .load(id)
        .await?
        .ok_or_else(|| anyhow!("{} was not loaded", id.escape_debug()))?;

    print!("{}", output.code);
    if let Some(map) = output.map {
        eprintln!("{}", map);
    }
    Ok(())
}
