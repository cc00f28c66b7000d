use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use virtdb::VirtdbConfig;

mod commands;

use commands::config::ConfigArgs;
use commands::recreate::RecreateArgs;
use commands::render::RenderArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// project root, by default the current directory
    #[clap(short, long, default_value = ".")]
    root: PathBuf,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop and recreate all declared tables, then run the SQL seed files.
    Recreate(RecreateArgs),

    /// Print the generated source of the virtual database module.
    Render(RenderArgs),

    /// Write type declarations for the virtual database module.
    Typegen,

    /// Generate content collection types from src/content.
    Sync,

    /// Show the resolved project configuration.
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            // filter spans/events with level TRACE or higher.
            .with_max_level(Level::DEBUG)
            .init();
    }

    let config = match VirtdbConfig::new(&cli.root) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Recreate(args) => commands::recreate::run(&config, args).await,
        Commands::Render(args) => commands::render::run(&config, args).await,
        Commands::Typegen => commands::typegen::run(&config).await,
        Commands::Sync => commands::sync::run(&config).await,
        Commands::Config(args) => commands::config::run(&config, args),
    };

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
