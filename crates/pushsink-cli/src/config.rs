//! Configuration system for the pushsink CLI.

use anyhow::Context;
use pushsink_crypto::{KeyMaterial, KeyMaterialBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

/// pushsink configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Subscriber keys
    #[serde(default)]
    pub keys: KeysConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Subscriber keys, all base64url
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KeysConfig {
    /// P-256 private scalar
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    /// Auth secret shared with the push provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_secret: Option<String>,
    /// Application server verification key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_key: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self =
            toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to file
    ///
    /// The file holds the private scalar and auth secret, so on unix it is
    /// owner read/write only.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options
            .open(path)
            .with_context(|| format!("writing config {}", path.display()))?;

        // `mode` only applies on create; tighten files saved by older versions
        #[cfg(unix)]
        file.set_permissions(fs::Permissions::from_mode(0o600))?;

        file.write_all(contents.as_bytes())
            .with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }

    /// Get default config path
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("pushsink/config.toml")
    }

    /// Load config from `path`, or an empty default if it doesn't exist yet
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the log level is unknown or a configured key does not decode.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                VALID_LOG_LEVELS.join(", ")
            );
        }

        // Keys are optional until used, but whatever is set must decode
        self.partial_keys()?;
        Ok(())
    }

    /// Import whatever keys are configured, without requiring any of them.
    fn partial_keys(&self) -> anyhow::Result<KeyMaterialBuilder> {
        let mut builder = KeyMaterialBuilder::new();
        if let Some(private_key) = &self.keys.private_key {
            builder
                .import_private_scalar(private_key)
                .context("keys.private_key is not a valid P-256 private key")?;
        }
        if let Some(auth_secret) = &self.keys.auth_secret {
            builder
                .import_auth_secret(auth_secret)
                .context("keys.auth_secret is not valid base64url")?;
        }
        if let Some(server_key) = &self.keys.server_key {
            builder
                .import_verification_key(server_key)
                .context("keys.server_key is not a valid P-256 public key")?;
        }
        Ok(builder)
    }

    /// Import the subscriber key pair and auth secret; the server key is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscriber keys are missing or do not decode.
    pub fn subscriber_keys(&self) -> anyhow::Result<KeyMaterialBuilder> {
        let builder = self.partial_keys()?;
        if builder.subscriber().is_none() || builder.auth_secret().is_none() {
            anyhow::bail!("No subscriber keys configured; run `pushsink keygen` first");
        }
        Ok(builder)
    }

    /// Trust `key` as the application server key.
    ///
    /// # Errors
    ///
    /// Returns an error if a different server key is already configured and
    /// `force` is not set; the existing key is left in place.
    pub fn replace_server_key(&mut self, key: String, force: bool) -> anyhow::Result<()> {
        let differs = self
            .keys
            .server_key
            .as_ref()
            .is_some_and(|existing| *existing != key);
        if differs && !force {
            anyhow::bail!("A server key is already configured (use --force to replace it)");
        }
        self.keys.server_key = Some(key);
        Ok(())
    }

    /// Build the complete key material for receiving.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the three keys is missing or invalid.
    pub fn key_material(&self) -> anyhow::Result<KeyMaterial> {
        let builder = self.subscriber_keys()?;
        if builder.verification_key().is_none() {
            anyhow::bail!("No server key configured; run `pushsink set-server-key` first");
        }
        Ok(builder.build()?)
    }
}
