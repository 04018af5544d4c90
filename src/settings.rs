use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CaixaError, Result};
use crate::notify::{GatewayTransport, PushTransport, UnconfiguredTransport, VapidCredentials};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    /// Root of uploaded spreadsheets; defaults to `<data_dir>/imports`.
    #[serde(default)]
    pub uploads_dir: Option<String>,
    #[serde(default)]
    pub push: Option<PushSettings>,
    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,
    #[serde(default)]
    pub import_deadline_secs: Option<u64>,
    #[serde(default)]
    pub dispatch_deadline_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSettings {
    pub gateway_url: String,
    pub vapid_subject: String,
    pub vapid_public_key: String,
    /// Path to the PEM-encoded P-256 private key.
    pub vapid_private_key_pem: String,
}

fn default_delivery_timeout_secs() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            uploads_dir: None,
            push: None,
            delivery_timeout_secs: default_delivery_timeout_secs(),
            import_deadline_secs: None,
            dispatch_deadline_secs: None,
        }
    }
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("caixa.db")
    }

    pub fn uploads_path(&self) -> PathBuf {
        match &self.uploads_dir {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from(&self.data_dir).join("imports"),
        }
    }

    /// Build the push transport from the configured credentials. Without a
    /// `push` section every delivery fails with a "not configured" reason.
    pub fn push_transport(&self) -> Result<Box<dyn PushTransport>> {
        let Some(push) = &self.push else {
            return Ok(Box::new(UnconfiguredTransport));
        };
        let pem = std::fs::read(shellexpand_path(&push.vapid_private_key_pem)).map_err(|e| {
            CaixaError::Settings(format!("cannot read {}: {e}", push.vapid_private_key_pem))
        })?;
        let credentials = VapidCredentials {
            subject: push.vapid_subject.clone(),
            public_key: push.vapid_public_key.clone(),
            private_key_pem: pem,
        };
        let timeout = Duration::from_secs(self.delivery_timeout_secs);
        Ok(Box::new(GatewayTransport::new(&push.gateway_url, &credentials, timeout)?))
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("caixa")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("caixa")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("ignoring unreadable {}: {e}", path.display());
                Settings::default()
            }
        }
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| CaixaError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
