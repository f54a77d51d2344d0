use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory and an initial `config.json` in it.
///
/// # Arguments
/// - `fintrack_home` - The directory that will be the root of data directory, e.g.
///   `$HOME/fintrack`
/// - `api_url` - The base URL of the transaction API, e.g. `http://192.168.1.8:3000/api`
/// - `currency_symbol` - The symbol to show amounts with, `₹` when `None`.
///
/// # Errors
/// - Returns an error if the URL is invalid or if any file operations fail.
pub async fn init(
    fintrack_home: &Path,
    api_url: &str,
    currency_symbol: Option<&str>,
) -> Result<Out<()>> {
    let config = Config::create(fintrack_home, api_url, currency_symbol)
        .await
        .context("Unable to create the data directory and config")?;
    Ok(format!(
        "Successfully created the fintrack config at {}",
        config.config_path().display()
    )
    .into())
}
