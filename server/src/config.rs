use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use serde::{Deserialize, Serialize};

use crate::registry::IdlePolicy;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// What log level to use
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// TOML file with server settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Interface to listen on
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Seconds a game with nobody connected is kept around
    #[arg(long)]
    pub idle_timeout: Option<u64>,

    /// Seconds between idle game sweeps
    #[arg(long)]
    pub sweep_interval: Option<u64>,

    /// Force a seed instead of random
    #[arg(short, long)]
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            idle_timeout_secs: 60 * 60,
            sweep_interval_secs: 60,
            seed: None,
        }
    }
}

impl ServerConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid server configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("In {}", path.display()))
    }

    /// Defaults, then the config file, then flags and their environment fallbacks.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if cli.host.is_some() || cli.port.is_some() {
            let host = cli
                .host
                .clone()
                .unwrap_or_else(|| config.bind.ip().to_string());
            let port = cli.port.unwrap_or(config.bind.port());
            config.bind = (host.as_str(), port)
                .to_socket_addrs()
                .with_context(|| format!("Could not resolve {host}:{port}"))?
                .next()
                .with_context(|| format!("No address for {host}:{port}"))?;
        }
        if let Some(secs) = cli.idle_timeout {
            config.idle_timeout_secs = secs;
        }
        if let Some(secs) = cli.sweep_interval {
            config.sweep_interval_secs = secs;
        }
        if cli.seed.is_some() {
            config.seed = cli.seed;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.idle_timeout_secs > 0, "idle_timeout_secs must be greater than 0");
        ensure!(
            self.sweep_interval_secs > 0,
            "sweep_interval_secs must be greater than 0"
        );
        Ok(())
    }

    pub fn idle_policy(&self) -> IdlePolicy {
        IdlePolicy {
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
