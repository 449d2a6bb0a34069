//! Server settings
//!
//! Defaults, then `config/default.toml` when present, then `APP_*`
//! environment variables (`APP_PORT=8080`, `APP_UPLOAD_LIMIT_BYTES=...`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body on the upload route, in bytes
    pub upload_limit_bytes: usize,
}

impl Settings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            upload_limit_bytes: 100 * 1024 * 1024,
        }
    }
}

/// Load the settings from the default file and the environment
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let defaults = Settings::default();

    Config::builder()
        .set_default("host", defaults.host)?
        .set_default("port", i64::from(defaults.port))?
        .set_default("upload_limit_bytes", defaults.upload_limit_bytes as i64)?
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::with_prefix("APP").try_parsing(true))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_apply_without_overrides() {
        unsafe {
            std::env::remove_var("APP_PORT");
            std::env::remove_var("APP_HOST");
        }

        let settings = get_configuration().unwrap();
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.address(), "0.0.0.0:3000");
        assert_eq!(settings.upload_limit_bytes, 104_857_600);
    }

    #[test]
    #[serial]
    fn environment_overrides_defaults() {
        unsafe {
            std::env::set_var("APP_PORT", "8088");
            std::env::set_var("APP_HOST", "127.0.0.1");
        }

        let settings = get_configuration().unwrap();
        assert_eq!(settings.address(), "127.0.0.1:8088");

        unsafe {
            std::env::remove_var("APP_PORT");
            std::env::remove_var("APP_HOST");
        }
    }
}
