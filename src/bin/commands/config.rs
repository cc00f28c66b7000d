use anyhow::Result;
use clap::Args;
use serde::Serialize;
use virtdb::VirtdbConfig;

/// Arguments for the Config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Output as JSON
    #[clap(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ConfigInfo {
    config_file: String,
    data_dir: String,
    tables_file: String,
    tables: Vec<String>,
    backend: &'static str,
    output: virtdb::OutputMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    sqlite_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sqlite_size_bytes: Option<u64>,
    seeds: Vec<String>,
}

pub fn run(config: &VirtdbConfig, args: ConfigArgs) -> Result<()> {
    let tables = config.load_tables()?;

    if !args.json {
        println!("{}", config.summary());
        println!("Tables:             {}", tables.names().join(", "));
        return Ok(());
    }

    let sqlite_path = config.sqlite_path();
    let info = ConfigInfo {
        config_file: config.config_file_path().display().to_string(),
        data_dir: config.data_dir().display().to_string(),
        tables_file: config.tables_path().display().to_string(),
        tables: tables.names().into_iter().map(String::from).collect(),
        backend: if config.remote { "remote" } else { "local" },
        output: config.output,
        sqlite_path: (!config.remote).then(|| sqlite_path.display().to_string()),
        sqlite_size_bytes: std::fs::metadata(&sqlite_path).ok().map(|m| m.len()),
        seeds: config
            .seeds()
            .iter()
            .filter(|s| s.path.exists())
            .map(|s| s.path.display().to_string())
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
