//! Configuration loader for Red Flag Detector.
//!
//! Reads `config.toml` from the data directory (`~/.redflag/` in production)
//! and deserializes it into [`AppConfig`]. Falls back to defaults when the
//! file is missing or malformed, then applies `REDFLAG_*` environment
//! overrides.

use std::path::{Path, PathBuf};

use redflag_types::config::AppConfig;

pub const DATA_DIR_ENV: &str = "REDFLAG_DATA_DIR";

/// Resolve the data directory: `REDFLAG_DATA_DIR`, else `~/.redflag`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".redflag");
    }

    PathBuf::from(".redflag")
}

/// Load `{data_dir}/config.toml` and apply environment overrides.
pub async fn load_config(data_dir: &Path) -> AppConfig {
    let mut config = load_config_file(data_dir).await;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

async fn load_config_file(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}

/// Apply `REDFLAG_HOST`, `REDFLAG_PORT`, `REDFLAG_DATABASE_URL` and
/// `REDFLAG_APP_URL`. Unparseable ports are ignored with a warning.
pub fn apply_env_overrides(config: &mut AppConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(host) = env("REDFLAG_HOST").filter(|v| !v.is_empty()) {
        config.server.host = host;
    }
    if let Some(port) = env("REDFLAG_PORT") {
        match port.parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!(value = %port, "ignoring invalid REDFLAG_PORT"),
        }
    }
    if let Some(url) = env("REDFLAG_DATABASE_URL").filter(|v| !v.is_empty()) {
        config.database.url = Some(url);
    }
    if let Some(url) = env("REDFLAG_APP_URL").filter(|v| !v.is_empty()) {
        config.server.app_url = url;
    }
}

/// The configured database URL, or `{data_dir}/redflag.db`.
pub fn database_url(config: &AppConfig, data_dir: &Path) -> String {
    match &config.database.url {
        Some(url) => url.clone(),
        None => format!("sqlite://{}?mode=rwc", data_dir.join("redflag.db").display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config_file(tmp.path()).await;
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.limits.guest.daily, 3);
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[server]
port = 8080

[llm]
model = "gemini-1.5-pro"

[limits.regular]
daily = 50
monthly = 500
"#,
        )
        .await
        .unwrap();

        let config = load_config_file(tmp.path()).await;
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.llm.model, "gemini-1.5-pro");
        assert_eq!(config.limits.regular.daily, 50);
        assert_eq!(config.limits.guest.daily, 3);
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config_file(tmp.path()).await;
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("REDFLAG_HOST", "0.0.0.0"),
            ("REDFLAG_PORT", "9000"),
            ("REDFLAG_DATABASE_URL", "sqlite::memory:"),
            ("REDFLAG_APP_URL", "https://redflag.example"),
        ]);
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, |k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.server.app_url, "https://redflag.example");
    }

    #[test]
    fn invalid_port_override_is_ignored() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, |k| (k == "REDFLAG_PORT").then(|| "http".to_string()));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn database_url_defaults_to_data_dir() {
        let config = AppConfig::default();
        let url = database_url(&config, Path::new("/tmp/rf"));
        assert_eq!(url, "sqlite:///tmp/rf/redflag.db?mode=rwc");
    }
}
