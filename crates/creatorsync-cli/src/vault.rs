//! Operator access to the credential vault.
//!
//! Values are read from stdin so secrets never land in shell history.

use std::io::Read;

use anyhow::Context;
use clap::Subcommand;
use creatorsync_vault::CredentialVault;

const SECRET_VAR: &str = "CREATORSYNC_VAULT_SECRET";

#[derive(Debug, Subcommand)]
pub enum VaultCommands {
    /// Encrypt the plaintext on stdin into a vault envelope
    Encrypt,
    /// Decrypt the vault envelope on stdin
    Decrypt,
}

pub(crate) fn run(command: &VaultCommands) -> anyhow::Result<()> {
    let secret = std::env::var(SECRET_VAR).with_context(|| format!("{SECRET_VAR} is not set"))?;
    let vault = CredentialVault::new(secret)?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;

    println!("{}", transform(&vault, command, &input)?);
    Ok(())
}

fn transform(vault: &CredentialVault, command: &VaultCommands, input: &str) -> anyhow::Result<String> {
    // Strip the trailing newline `echo` and heredocs add.
    let value = input.trim_end_matches(['\r', '\n']);
    anyhow::ensure!(!value.is_empty(), "no input on stdin");

    Ok(match command {
        VaultCommands::Encrypt => vault.encrypt(value)?,
        VaultCommands::Decrypt => vault.decrypt(value.trim())?,
    })
}
