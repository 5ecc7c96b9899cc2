//! CLI configuration file
//!
//! `onkyoctl.ini` in the platform config directory (or the `--config`
//! path) provides connection defaults; command-line flags override it.
//!
//! ```ini
//! host = 192.168.1.40
//! port = 60128
//! auto_connect = true
//! allow_reconnect = true
//! reconnect_seconds = 5
//! command_file = /etc/onkyoctl/commands.yaml
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ini::Ini;

/// Settings read from the configuration file.
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub auto_connect: bool,
    pub allow_reconnect: bool,
    pub reconnect_seconds: Option<u64>,
    pub command_file: Option<PathBuf>,
}

/// Default config path: `<platform config dir>/onkyoctl.ini`.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("onkyoctl.ini"))
}

/// Load configuration from an INI file.
pub fn load(path: &Path) -> Result<FileConfig> {
    let ini = Ini::load_from_file(path)
        .with_context(|| format!("failed to read config from {}", path.display()))?;

    let mut config = FileConfig::default();
    let Some(section) = ini.section(None::<String>) else {
        return Ok(config);
    };

    config.host = section.get("host").map(str::to_string);
    if let Some(port) = section.get("port") {
        config.port = Some(port.parse().context("invalid port in config")?);
    }
    config.auto_connect = flag(section.get("auto_connect"))?;
    config.allow_reconnect = flag(section.get("allow_reconnect"))?;
    if let Some(seconds) = section.get("reconnect_seconds") {
        config.reconnect_seconds =
            Some(seconds.parse().context("invalid reconnect_seconds in config")?);
    }
    config.command_file = section.get("command_file").map(PathBuf::from);

    Ok(config)
}

fn flag(value: Option<&str>) -> Result<bool> {
    match value {
        None => Ok(false),
        Some(text) => match text.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => bail!("invalid boolean in config: {other:?}"),
        },
    }
}
