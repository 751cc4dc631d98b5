use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source: EnvironmentConfig,
    pub target: EnvironmentConfig,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    pub url: String,
    pub user: String,
    pub password: String,
}

/// On-disk shape; every value may also come from the environment.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    source: Option<PartialEnvironment>,
    target: Option<PartialEnvironment>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct PartialEnvironment {
    url: Option<String>,
    user: Option<String>,
    password: Option<String>,
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".zdmirror")
}

fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path(), |key| std::env::var(key).ok())
}

/// Read `path` (if present) and apply `ZDMIRROR_*` overrides looked up through `env`.
pub fn load_config_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<AppConfig> {
    let file: FileConfig = if path.exists() {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))?
    } else {
        FileConfig::default()
    };

    let timeout_secs = match env("ZDMIRROR_TIMEOUT_SECS") {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid ZDMIRROR_TIMEOUT_SECS: {raw}"))?,
        None => file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
    };
    if timeout_secs == 0 {
        bail!("timeout_secs must be at least 1 second");
    }

    Ok(AppConfig {
        source: resolve_environment("source", file.source.unwrap_or_default(), &env, path)?,
        target: resolve_environment("target", file.target.unwrap_or_default(), &env, path)?,
        timeout_secs,
    })
}

fn resolve_environment(
    section: &str,
    partial: PartialEnvironment,
    env: &impl Fn(&str) -> Option<String>,
    path: &Path,
) -> Result<EnvironmentConfig> {
    let pick = |key: &str, from_file: Option<String>| -> Result<String> {
        let var = format!("ZDMIRROR_{}_{}", section.to_uppercase(), key.to_uppercase());
        env(&var)
            .or(from_file)
            .filter(|v| !v.trim().is_empty())
            .with_context(|| {
                format!(
                    "Missing {section}.{key}: set it in {} or export {var}",
                    path.display()
                )
            })
    };

    Ok(EnvironmentConfig {
        url: pick("url", partial.url)?,
        user: pick("user", partial.user)?,
        password: pick("password", partial.password)?,
    })
}
