//! Serve command: HTTP JSON API over the metadata store

#[cfg(feature = "serve")]
mod api;

use anyhow::Result;

use crate::cli::{GlobalArgs, ServeArgs};

/// Execute the serve command
pub async fn execute(args: &ServeArgs, global: &GlobalArgs) -> Result<()> {
    #[cfg(feature = "serve")]
    {
        api::execute(args, global).await
    }
    #[cfg(not(feature = "serve"))]
    {
        let _ = (args, global);
        anyhow::bail!(
            "The `serve` command requires the `serve` feature.\n\
             Rebuild with: cargo build -p um-cli --features serve"
        );
    }
}
