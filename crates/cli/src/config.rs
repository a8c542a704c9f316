//! Locating, loading and saving the `splicectl` configuration file.

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use splice_core::config::ClientConfig;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SPLICE_CLIENT_CONFIG";

/// Prefix of per-key overrides, e.g. `SPLICECTL_CHUNK_SIZE` or
/// `SPLICECTL_RETRY__MAX_ATTEMPTS`.
pub const ENV_PREFIX: &str = "SPLICECTL_";

/// Resolve the config path: explicit argument, then `SPLICE_CLIENT_CONFIG`,
/// then `$XDG_CONFIG_HOME/splice/client.toml` (falling back to `~/.config`).
pub fn client_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(path) => PathBuf::from(path),
        None => {
            let home = std::env::var_os("HOME")
                .ok_or_else(|| anyhow::anyhow!("HOME not set; set {CONFIG_ENV}"))?;
            PathBuf::from(home).join(".config")
        }
    };

    Ok(base.join("splice").join("client.toml"))
}

/// Defaults, then the file at `path` if it exists, then `SPLICECTL_*`.
pub fn load_client_config(path: &Path) -> Result<ClientConfig> {
    let mut figment = Figment::from(Serialized::defaults(ClientConfig::default()));

    if path.exists() {
        tracing::debug!(path = %path.display(), "loading client configuration");
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    figment
        .extract()
        .with_context(|| format!("failed to load client configuration from {}", path.display()))
}

/// Write `config` as TOML, creating parent directories.
pub async fn save_client_config(path: &Path, config: &ClientConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let contents = toml::to_string_pretty(config)?;
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
