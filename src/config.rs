//! # Configuration Management
//!
//! This module handles loading and managing application configuration from
//! multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER_HOST, APP_SERVER_PORT, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)
//!
//! ## Configuration Sections:
//! - **server**: Listening address and the browser origin allowed by CORS
//! - **storage**: Connection string for the transcription record database
//! - **recognition**: Remote speech service endpoint, credentials, and the
//!   audio parameters sent with every request
//! - **upload**: Ephemeral audio storage location and the upload size limit

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

use crate::recognition::RecognitionConfig;

/// Main application configuration that contains all settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub recognition: RecognitionSettings,
    pub upload: UploadConfig,
}

/// Server-specific configuration settings.
///
/// ## Fields:
/// - `host`: IP address or hostname to bind the server to
/// - `port`: TCP port number to listen on
/// - `allowed_origin`: Browser origin allowed by CORS; `*` allows any origin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origin: String,
}

/// Durable storage configuration.
///
/// The record store is opened once at startup from this connection string and
/// the pool is shared by every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite connection string, e.g. `sqlite://voice_notes.db`
    pub database_url: String,
}

/// Remote speech-recognition service settings.
///
/// ## Note on audio parameters:
/// `encoding`, `sample_rate_hertz`, and `language_code` are applied to every
/// request regardless of the actual uploaded file. A mismatched upload (say,
/// an MP3 with `LINEAR16` configured) is passed through as-is and the remote
/// service decides what to do with it. Making these per-request would require
/// sniffing the container format, which this service does not do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionSettings {
    /// Recognition endpoint URL
    pub api_url: String,
    /// API key appended to the request; may be empty for keyless deployments
    pub api_key: String,
    /// Audio encoding identifier sent to the service (e.g. "LINEAR16")
    pub encoding: String,
    /// Sample rate the service should assume, in hertz
    pub sample_rate_hertz: u32,
    /// BCP-47 language code (e.g. "en-US")
    pub language_code: String,
}

impl RecognitionSettings {
    /// Build the per-request recognition parameters from the configured values.
    pub fn to_recognition_config(&self) -> RecognitionConfig {
        RecognitionConfig {
            encoding: self.encoding.clone(),
            sample_rate_hertz: self.sample_rate_hertz,
            language_code: self.language_code.clone(),
        }
    }
}

/// Upload handling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum accepted audio upload size in bytes (default 10 MiB)
    pub max_audio_bytes: usize,
    /// Directory for ephemeral audio files awaiting recognition
    pub temp_dir: String,
}

/// Provides default configuration values.
///
/// Default values ensure the application can start even if no configuration
/// file exists. They also serve as documentation of reasonable starting values.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),  // Localhost only (safe for development)
                port: 8080,                     // Common development port
                allowed_origin: "*".to_string(),
            },
            storage: StorageConfig {
                database_url: "sqlite://voice_notes.db".to_string(),
            },
            recognition: RecognitionSettings {
                api_url: "https://speech.googleapis.com/v1/speech:recognize".to_string(),
                api_key: String::new(),
                encoding: "LINEAR16".to_string(),
                sample_rate_hertz: 16_000,
                language_code: "en-US".to_string(),
            },
            upload: UploadConfig {
                max_audio_bytes: 10 * 1024 * 1024,  // 10 MiB upload ceiling
                temp_dir: env::temp_dir()
                    .join("voice-notes-uploads")
                    .to_string_lossy()
                    .into_owned(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle special cases for HOST and PORT environment variables
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER_HOST=0.0.0.0`: Override server host
    /// - `APP_SERVER_PORT=3000`: Override server port
    /// - `HOST=0.0.0.0` / `PORT=3000`: Special cases for deployment platforms
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            // 1. Start with defaults - converts our Default impl to config format
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // 2. Load from config.toml file (if it exists)
            .add_source(config::File::with_name("config").required(false))
            // 3. Load from environment variables with APP_ prefix
            // Example: APP_SERVER_HOST becomes server.host in the config
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Handle special environment variables used by deployment platforms
        // These don't follow the APP_ prefix convention but are commonly used
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        // The record store connection string is commonly injected directly
        if let Ok(database_url) = env::var("DATABASE_URL") {
            settings = settings.set_override("storage.database_url", database_url)?;
        }

        // Recognition credentials never belong in config.toml
        if let Ok(api_key) = env::var("RECOGNITION_API_KEY") {
            settings = settings.set_override("recognition.api_key", api_key)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// Catching configuration errors early prevents runtime failures and
    /// provides clear error messages about what's wrong.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.storage.database_url.is_empty() {
            return Err(anyhow::anyhow!("Storage database URL cannot be empty"));
        }

        if self.recognition.api_url.is_empty() {
            return Err(anyhow::anyhow!("Recognition API URL cannot be empty"));
        }

        if self.recognition.sample_rate_hertz == 0 {
            return Err(anyhow::anyhow!("Recognition sample rate must be greater than 0"));
        }

        if self.upload.max_audio_bytes == 0 {
            return Err(anyhow::anyhow!("Max audio upload size must be greater than 0"));
        }

        Ok(())  // All validation passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;  // Import everything from the parent module

    /// Test that the default configuration is valid and has expected values.
    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.upload.max_audio_bytes, 10 * 1024 * 1024);
        // Ensure the default config passes validation
        assert!(config.validate().is_ok());
    }

    /// Test that validation catches invalid configurations.
    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;  // Invalid port
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.upload.max_audio_bytes = 0;  // Would reject every upload
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.recognition.api_url = String::new();
        assert!(config.validate().is_err());
    }

    /// Test that recognition settings map onto per-request parameters.
    #[test]
    fn test_to_recognition_config() {
        let config = AppConfig::default();
        let recognition = config.recognition.to_recognition_config();
        assert_eq!(recognition.encoding, "LINEAR16");
        assert_eq!(recognition.sample_rate_hertz, 16_000);
        assert_eq!(recognition.language_code, "en-US");
    }
}
