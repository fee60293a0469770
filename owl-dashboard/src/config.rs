use crate::color::{CPU_MAX, TEMP_MAX_CELSIUS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::warn;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub backend: BackendConf,
    pub poll_interval_ms: u64,
    pub listen: String,
    /// Âge au-delà duquel une unité est signalée "stale" dans /fleet
    pub stale_after_secs: i64,
    pub scale: ScaleConf,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BackendConf {
    pub base_url: String, // ex: "http://192.168.1.10:5000"
    pub request_timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ScaleConf {
    pub cpu_max: f64,
    pub temp_max: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            backend: BackendConf::default(),
            poll_interval_ms: 2000,
            listen: "0.0.0.0:8080".into(),
            stale_after_secs: 10,
            scale: ScaleConf::default(),
        }
    }
}

impl Default for BackendConf {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".into(),
            request_timeout_ms: 5000,
        }
    }
}

impl Default for ScaleConf {
    fn default() -> Self {
        Self {
            cpu_max: CPU_MAX,
            temp_max: TEMP_MAX_CELSIUS,
        }
    }
}

impl DashboardConfig {
    pub fn from_yaml_str(txt: &str) -> Result<Self, serde_yaml::Error> {
        if txt.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(txt)
    }

    pub fn poll_interval(&self) -> Duration {
        // un intervalle nul ferait paniquer tokio::time::interval
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

pub async fn load_config() -> DashboardConfig {
    let path = std::env::var("OWL_DASHBOARD_CONFIG").unwrap_or_else(|_| "dashboard.yaml".into());
    load_config_from(&path).await
}

pub async fn load_config_from(path: &str) -> DashboardConfig {
    if !Path::new(path).exists() {
        warn!("no {path}, using default config");
        return DashboardConfig::default();
    }
    let txt = match fs::read_to_string(path).await {
        Ok(txt) => txt,
        Err(e) => {
            warn!("cannot read {path}: {e}, using default config");
            return DashboardConfig::default();
        }
    };
    DashboardConfig::from_yaml_str(&txt).unwrap_or_else(|e| {
        warn!("invalid config {path}: {e}, using default config");
        DashboardConfig::default()
    })
}
