//! Describe command: user-authored descriptions, saved with the snapshot

use anyhow::{Context, Result};
use um_meta::EntityType;

use crate::cli::{DescribeArgs, EntityArg, GlobalArgs};
use crate::commands::common::{load_config, open_store, save_snapshot};

/// Execute the describe command
pub async fn execute(args: &DescribeArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let store = open_store(&config, false)?;

    let entity = match args.entity {
        EntityArg::Model => EntityType::Model,
        EntityArg::Column => EntityType::Column,
    };
    store
        .update_description(entity, &args.id, &args.text)
        .with_context(|| format!("Failed to describe {}", args.id))?;
    save_snapshot(&config, &store)?;

    println!("Updated description of {}", args.id);
    Ok(())
}
