use paddy_core::internal::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "PADDY_CONFIG";
pub const CONFIG_FILENAME: &str = "paddy.toml";

/// Settings of `paddy serve`, read from TOML then overridden by flags.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServeConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub model: Option<PathBuf>,
    #[serde(default = "num_cpus::get")]
    pub workers: usize,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_healthy_label")]
    pub healthy_label: String,
    #[serde(default = "default_allow_origin")]
    pub allow_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_history_capacity() -> usize {
    1000
}

fn default_healthy_label() -> String {
    "healthy".to_string()
}

fn default_allow_origin() -> String {
    "*".to_string()
}

impl Default for ServeConfig {
    fn default() -> ServeConfig {
        ServeConfig {
            host: default_host(),
            port: default_port(),
            model: None,
            workers: num_cpus::get(),
            max_upload_bytes: default_max_upload_bytes(),
            history_capacity: default_history_capacity(),
            healthy_label: default_healthy_label(),
            allow_origin: default_allow_origin(),
        }
    }
}

/// Explicit path, else `$PADDY_CONFIG`, else `./paddy.toml` if it exists.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        Some(path.to_owned())
    } else if let Ok(c) = std::env::var(CONFIG_ENV) {
        Some(PathBuf::from(c))
    } else if Path::new(CONFIG_FILENAME).exists() {
        Some(PathBuf::from(CONFIG_FILENAME))
    } else {
        None
    }
}

pub fn read_config(path: impl AsRef<Path>) -> PaddyResult<ServeConfig> {
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Opening config {:?}", path.as_ref()))?;
    let config = toml::from_str(&text)
        .with_context(|| format!("Parsing configuration file {:?}", path.as_ref()))?;
    Ok(config)
}

impl ServeConfig {
    pub fn load(explicit: Option<&Path>) -> PaddyResult<ServeConfig> {
        match config_path(explicit) {
            Some(path) => {
                info!("Reading configuration from {path:?}");
                read_config(path)
            }
            None => Ok(ServeConfig::default()),
        }
    }

    pub fn validate(&self) -> PaddyResult<()> {
        ensure!(self.workers > 0, "workers must be at least 1");
        ensure!(self.max_upload_bytes > 0, "max_upload_bytes must be positive");
        ensure!(self.history_capacity > 0, "history_capacity must be positive");
        ensure!(self.model.is_some(), "No model given (set `model` in config or pass --model)");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() -> PaddyResult<()> {
        let config: ServeConfig = toml::from_str("")?;
        assert_eq!(config, ServeConfig::default());
        assert_eq!(config.port, 5000);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        Ok(())
    }

    #[test]
    fn partial_file() -> PaddyResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("paddy.toml");
        std::fs::write(
            &path,
            "host = \"0.0.0.0\"\nmodel = \"models/leafnet.tgz\"\nhealthy_label = \"normal\"\n",
        )?;
        let config = ServeConfig::load(Some(&path))?;
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.model, Some(PathBuf::from("models/leafnet.tgz")));
        assert_eq!(config.healthy_label, "normal");
        assert_eq!(config.history_capacity, 1000);
        config.validate()
    }

    #[test]
    fn typos_are_rejected() {
        assert!(toml::from_str::<ServeConfig>("prot = 80").is_err());
    }

    #[test]
    fn model_is_required() {
        assert!(ServeConfig::default().validate().is_err());
    }
}
