use std::env;
use std::net::SocketAddr;

use analysis_orchestrator::{DataPaths, DetectionConfig};
use anyhow::{Context, Result};

/// Breakpoint count the server segments with unless overridden
pub const SERVER_N_BKPS: usize = 7;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data: DataPaths,
    pub detection: DetectionConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("API_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("API_PORT")?,
            data: DataPaths::from_env(),
            detection: DetectionConfig::from_env_with_n_bkps(SERVER_N_BKPS)?,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
