use std::path::Path;

use serde::{Deserialize, Serialize};

use super::AppCore;

const DEFAULT_WS_URL: &str = "ws://localhost:8080/hangouts";
const DEFAULT_LOOKUP_URL: &str = "http://localhost:8080";

pub const CONFIG_FILE_NAME: &str = "hangouts_config.json";

/// Which cache backend a session opens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ws_url: Option<String>,
    pub lookup_url: Option<String>,
    pub storage: Option<StorageKind>,
    pub disable_network: Option<bool>,
}

impl AppConfig {
    pub fn ws_url(&self) -> &str {
        non_empty(self.ws_url.as_deref()).unwrap_or(DEFAULT_WS_URL)
    }

    pub fn lookup_url(&self) -> &str {
        non_empty(self.lookup_url.as_deref()).unwrap_or(DEFAULT_LOOKUP_URL)
    }

    pub fn storage(&self) -> StorageKind {
        self.storage.unwrap_or_default()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

pub fn load_app_config(data_dir: &str) -> AppConfig {
    let path = Path::new(data_dir).join(CONFIG_FILE_NAME);
    let Ok(bytes) = std::fs::read(&path) else {
        return AppConfig::default();
    };
    match serde_json::from_slice::<AppConfig>(&bytes) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %path.display(), err = %e, "ignoring unreadable config");
            AppConfig::default()
        }
    }
}

pub fn default_app_config_json() -> String {
    let config = AppConfig {
        ws_url: Some(DEFAULT_WS_URL.to_string()),
        lookup_url: Some(DEFAULT_LOOKUP_URL.to_string()),
        storage: Some(StorageKind::Sqlite),
        disable_network: Some(false),
    };
    serde_json::to_string_pretty(&config).unwrap_or_else(|_| "{}".to_string())
}

impl AppCore {
    pub(super) fn network_enabled(&self) -> bool {
        // Used to keep Rust tests deterministic and offline.
        if let Some(disable) = self.config.disable_network {
            return !disable;
        }
        std::env::var("HANGOUTS_DISABLE_NETWORK").ok().as_deref() != Some("1")
    }
}
