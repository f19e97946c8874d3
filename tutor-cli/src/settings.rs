use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tutor_client::{ClientConfig, DEFAULT_BASE_URL};

const DEFAULT_SESSION_FILE: &str = ".tutor_admin_session.json";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub timeout_secs: u64,
    pub session_file: PathBuf,
    pub log_level: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url =
            non_blank(lookup("TUTOR_API_URL")).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout_secs = parse_u64(&lookup, "TUTOR_API_TIMEOUT_SECS", 15)?;
        let session_file = non_blank(lookup("TUTOR_SESSION_FILE"))
            .unwrap_or_else(|| DEFAULT_SESSION_FILE.to_string())
            .into();
        let log_level = non_blank(lookup("LOG_LEVEL"))
            .or_else(|| non_blank(lookup("RUST_LOG")))
            .unwrap_or_else(|| "warn".to_string());

        Ok(Self {
            api_url,
            timeout_secs,
            session_file,
            log_level,
        })
    }

    /// Флаги командной строки важнее переменных окружения.
    pub fn with_overrides(mut self, server: Option<String>, session_file: Option<PathBuf>) -> Self {
        if let Some(server) = non_blank(server) {
            self.api_url = normalize_server(server);
        }
        if let Some(session_file) = session_file {
            self.session_file = session_file;
        }
        self
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.api_url.clone()).with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn normalize_server(server: String) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        return server;
    }

    format!("http://{server}")
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    let value = non_blank(lookup(key))
        .unwrap_or_else(|| default.to_string())
        .parse::<u64>()
        .with_context(|| format!("Failed to parse {key}, expecting positive integer"))?;

    if value == 0 {
        return Err(anyhow!("{key} must be > 0"));
    }
    Ok(value)
}
