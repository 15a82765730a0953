use std::error::Error;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "DASH_CONFIG";

/// Default configuration file, relative to the working directory
pub const CONFIG_FILE: &str = "config.json";

/// Declarative startup settings
///
/// Everything is key-value JSON; there are no CLI flags. Every field has a
/// default so a partial file (or none at all, in development) still starts
/// the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Row source: a local CSV path or a published-sheet CSV URL
    #[serde(default = "default_sheet")]
    pub sheet: String,

    /// Worksheet label, shown in the dashboard footer
    #[serde(default = "default_worksheet")]
    pub worksheet: String,

    /// Shared access secret; absent means open access (development)
    #[serde(default)]
    pub access_key: Option<String>,

    /// Hint shown on the login form
    #[serde(default)]
    pub access_hint: Option<String>,

    /// Organization domain accepted from a fronting SSO proxy
    #[serde(default)]
    pub allowed_domain: Option<String>,

    /// Status labels counted as a successful onboarding
    #[serde(default = "default_success_statuses")]
    pub success_statuses: Vec<String>,

    /// Upper bound of the rep score scale
    #[serde(default = "default_score_max")]
    pub score_max: f64,

    /// Cell values recognized as true (lowercased)
    #[serde(default = "default_truthy")]
    pub truthy_values: Vec<String>,

    /// Cell values recognized as false (lowercased)
    #[serde(default = "default_falsy")]
    pub falsy_values: Vec<String>,

    /// Listen address for the web server
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_sheet() -> String {
    "onboarding.csv".to_string()
}

fn default_worksheet() -> String {
    "Onboarding".to_string()
}

fn default_success_statuses() -> Vec<String> {
    vec!["confirmed".to_string()]
}

fn default_score_max() -> f64 {
    10.0
}

fn default_truthy() -> Vec<String> {
    vec!["true".to_string(), "yes".to_string(), "1".to_string()]
}

fn default_falsy() -> Vec<String> {
    vec!["false".to_string(), "no".to_string(), "0".to_string()]
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sheet: default_sheet(),
            worksheet: default_worksheet(),
            access_key: None,
            access_hint: None,
            allowed_domain: None,
            success_statuses: default_success_statuses(),
            score_max: default_score_max(),
            truthy_values: default_truthy(),
            falsy_values: default_falsy(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl Config {
    /// Load configuration from the file named by `DASH_CONFIG`
    ///
    /// Falls back to `config.json`, and to built-in defaults when no file
    /// exists. A file that exists but fails to parse is an error; silently
    /// running with half a configuration is worse than not starting.
    pub fn load() -> Result<Config, Box<dyn Error>> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &str) -> Result<Config, Box<dyn Error>> {
        if !Path::new(path).exists() {
            log::warn!("config file {path} not found, using defaults (open access)");
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| format!("invalid config file {path}: {e}"))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_cover_every_field() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.sheet, "onboarding.csv");
        assert_eq!(config.success_statuses, vec!["confirmed"]);
        assert_eq!(config.score_max, 10.0);
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert!(config.access_key.is_none());
    }

    #[test]
    fn partial_file_overrides_only_named_keys() {
        let json = r#"{
            "sheet": "https://docs.google.com/pub?output=csv",
            "access_key": "letmein",
            "success_statuses": ["confirmed", "delivered"]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.sheet.starts_with("https://"));
        assert_eq!(config.access_key.as_deref(), Some("letmein"));
        assert_eq!(config.success_statuses.len(), 2);
        assert_eq!(config.worksheet, "Onboarding");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_from("no/such/config.json").unwrap();
        assert!(config.access_key.is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let path = file.path().to_string_lossy().to_string();
        assert!(Config::load_from(&path).is_err());
    }
}
