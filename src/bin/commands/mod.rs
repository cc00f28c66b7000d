pub mod config;
pub mod recreate;
pub mod render;
pub mod sync;
pub mod typegen;

use std::path::Path;

use tracing::debug;
use virtdb::PluginHost;

/// Host for one-shot command runs: nothing is watched, messages go to stderr
pub(crate) struct CliHost;

impl PluginHost for CliHost {
    fn add_watch_file(&self, path: &Path) {
        debug!("Would watch {}", path.display());
    }

    fn log_info(&self, message: &str) {
        eprintln!("[virtdb] {}", message);
    }
}
