// CLI subcommands

pub mod history;
pub mod stats;
pub mod status;
pub mod update;
pub mod watch;

use anyhow::{Context, Result};
use clap::Args;
use doorstate_core::SigningKey;
use std::path::PathBuf;

/// Shared secret used to sign submissions
#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    /// File holding the shared HMAC key
    #[arg(long, env = "DOORSTATE_KEY_FILE")]
    pub key_file: PathBuf,
}

impl KeyArgs {
    pub fn load(&self) -> Result<SigningKey> {
        SigningKey::from_file(&self.key_file).with_context(|| {
            format!("Failed to load signing key from {}", self.key_file.display())
        })
    }
}
