use std::net::SocketAddr;

use serde::Deserialize;
use aurora_core::error::{AuroraError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    pub watcher: WatcherSection,

    #[serde(default)]
    pub exporter: ExporterSection,
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(AuroraError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.watcher.validate()?;
        self.exporter.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatcherSection {
    /// Directory to watch. Must exist when the watcher starts.
    pub path: String,

    #[serde(default = "default_extension")]
    pub extension: String,
}

impl WatcherSection {
    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(AuroraError::Config("watcher.path must not be empty".into()));
        }
        let valid_ext = self
            .extension
            .strip_prefix('.')
            .is_some_and(|rest| !rest.is_empty() && !rest.contains(['.', '/', '\\']));
        if !valid_ext {
            return Err(AuroraError::Config(format!(
                "watcher.extension must look like \".txt\", got {:?}",
                self.extension
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Prefix of the exporter's own series (`<namespace>_version_info`).
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for ExporterSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            namespace: default_namespace(),
        }
    }
}

impl ExporterSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;

        let mut chars = self.namespace.chars();
        let valid_ns = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_ns {
            return Err(AuroraError::Config(format!(
                "exporter.namespace is not a valid metric prefix: {:?}",
                self.namespace
            )));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            AuroraError::Config(format!("exporter.listen must be a valid SocketAddr: {e}"))
        })
    }
}

fn default_extension() -> String {
    ".txt".into()
}
fn default_listen() -> String {
    "0.0.0.0:2112".into()
}
fn default_namespace() -> String {
    "aurora".into()
}
