use std::sync::Arc;

use anyhow::Result;
use virtdb::{ContentSyncPipeline, FsEvaluatorFactory, SyncError, VirtdbConfig};

pub async fn run(config: &VirtdbConfig) -> Result<()> {
    let settings = config.sync_settings();
    let pipeline = ContentSyncPipeline::new(Arc::new(FsEvaluatorFactory));

    match pipeline.sync(&settings).await {
        Ok(info) if !info.content_dir_found => {
            println!(
                "No content directory at {}, nothing to generate",
                settings.content_dir.display()
            );
            Ok(())
        }
        Ok(_) => {
            println!("Generated content types at {}", settings.types_path().display());
            Ok(())
        }
        Err(SyncError::UserConfig(err)) => {
            if let Some(location) = &err.location {
                eprintln!("{}", location.file.display());
            }
            if let Some(hint) = &err.hint {
                eprintln!("hint: {}", hint);
            }
            Err(SyncError::UserConfig(err).into())
        }
        Err(e) => Err(e.into()),
    }
}
