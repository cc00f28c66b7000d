use anyhow::{anyhow, Result};
use virtdb::codegen::{render_type_declarations, types::DB_TYPES_FILE};
use virtdb::content::GENERATED_DIR;
use virtdb::{VirtdbConfig, PUBLIC_MODULE_ID};

pub async fn run(config: &VirtdbConfig) -> Result<()> {
    let tables = config.load_tables()?;
    let declarations = render_type_declarations(PUBLIC_MODULE_ID, &tables);

    let dir = config.root.join(GENERATED_DIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| anyhow!("Unable to create {}: {}", dir.display(), e))?;
    let path = dir.join(DB_TYPES_FILE);
    tokio::fs::write(&path, declarations)
        .await
        .map_err(|e| anyhow!("Unable to write {}: {}", path.display(), e))?;

    println!("Wrote types for {} tables to {}", tables.len(), path.display());
    Ok(())
}
