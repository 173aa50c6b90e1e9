use crate::auth::Credentials;
use crate::listing::DEFAULT_SCAN_CONCURRENCY;
use crate::storage::{DEFAULT_PAGE_SIZE, Timeouts};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_scan_concurrency() -> usize {
    DEFAULT_SCAN_CONCURRENCY
}

fn default_control_timeout_secs() -> u64 {
    30
}

fn default_transfer_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub access_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub secret_access_key: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_scan_concurrency")]
    pub scan_concurrency: usize,
    #[serde(default = "default_control_timeout_secs")]
    pub control_timeout_secs: u64,
    #[serde(default = "default_transfer_timeout_secs")]
    pub transfer_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_key_id: None,
            secret_access_key: None,
            page_size: default_page_size(),
            scan_concurrency: default_scan_concurrency(),
            control_timeout_secs: default_control_timeout_secs(),
            transfer_timeout_secs: default_transfer_timeout_secs(),
        }
    }
}

impl Config {
    /// Load from a JSON file, or YAML when the extension says so
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );

        let config: Config = if is_yaml {
            serde_yml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        Ok(config)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::from_parts(self.access_key_id.clone(), self.secret_access_key.clone())
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            control: Duration::from_secs(self.control_timeout_secs),
            transfer: Duration::from_secs(self.transfer_timeout_secs),
        }
    }
}
