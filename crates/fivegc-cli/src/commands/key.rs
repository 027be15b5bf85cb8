//! `generate-key`

use anyhow::{Context, Result};
use fivegc_credential::generate_key_file;
use std::path::Path;

/// Write a new signing key to `out` and print its public half
pub fn generate(out: &Path) -> Result<()> {
    let public = generate_key_file(out)
        .with_context(|| format!("generating signing key at {}", out.display()))?;
    tracing::info!(path = %out.display(), "signing key written");
    println!("{}", hex::encode(public.to_bytes()));
    Ok(())
}
