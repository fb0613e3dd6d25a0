/// Configuration schema for the licensor binary
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use zeroize::Zeroizing;

use crate::error::{LicenseError, LicenseResult};
use crate::issuance::MIN_KEY_BITS;

/// Log levels accepted in `log_level`
pub const LOG_LEVELS: [&str; 5] = ["debug", "info", "warn", "error", "none"];

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// License artifact to verify or write
    #[serde(default = "default_license_path")]
    pub license_path: PathBuf,

    /// Directory holding the issuer key files
    #[serde(default = "default_key_dir")]
    pub key_dir: PathBuf,

    /// RSA modulus size for newly generated keys
    #[serde(default = "default_key_bits")]
    pub key_bits: usize,

    /// Environment variable holding the private key passphrase
    #[serde(default = "default_passphrase_env")]
    pub passphrase_env: String,

    /// Where the activation record lives; user state directory if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_dir: Option<PathBuf>,

    /// Record an activation after every successful verification
    #[serde(default = "default_true")]
    pub record_activation: bool,

    /// Expected SHA-256 of the issuer key (SubjectPublicKeyInfo DER, hex)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_key_sha256: Option<String>,

    /// Log level: "debug", "info", "warn", "error", "none"
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_license_path() -> PathBuf {
    PathBuf::from("license.key")
}

fn default_key_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_key_bits() -> usize {
    crate::issuance::DEFAULT_KEY_BITS
}

fn default_passphrase_env() -> String {
    "KC_LICENSOR_PASSPHRASE".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            license_path: default_license_path(),
            key_dir: default_key_dir(),
            key_bits: default_key_bits(),
            passphrase_env: default_passphrase_env(),
            activation_dir: None,
            record_activation: true,
            pinned_key_sha256: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Get the effective issuer key pin, prioritizing compile-time value
    pub fn effective_pin(&self) -> Option<String> {
        // If KC_LICENSOR_PINNED_KEY_SHA256 was set at compile time, use it (hardcoded into binary)
        if let Some(compile_time_pin) = option_env!("KC_LICENSOR_PINNED_KEY_SHA256") {
            if !compile_time_pin.is_empty() {
                return Some(compile_time_pin.to_ascii_lowercase());
            }
        }

        // Otherwise use the config value
        self.pinned_key_sha256
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_ascii_lowercase)
    }

    /// Private key passphrase from the configured environment variable
    ///
    /// Empty when the variable is unset; key storage refuses an empty
    /// passphrase.
    pub fn passphrase(&self) -> Zeroizing<String> {
        Zeroizing::new(std::env::var(&self.passphrase_env).unwrap_or_default())
    }

    /// Validate configuration
    pub fn validate(&self) -> LicenseResult<()> {
        if self.license_path.as_os_str().is_empty() {
            return Err(invalid("license_path cannot be empty"));
        }

        if self.key_dir.as_os_str().is_empty() {
            return Err(invalid("key_dir cannot be empty"));
        }

        if self.passphrase_env.trim().is_empty() {
            return Err(invalid("passphrase_env cannot be empty"));
        }

        if self.key_bits < MIN_KEY_BITS {
            return Err(invalid(&format!(
                "key_bits must be at least {} (got {})",
                MIN_KEY_BITS, self.key_bits
            )));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(invalid(&format!(
                "log_level must be one of {} (got '{}')",
                LOG_LEVELS.join(", "),
                self.log_level
            )));
        }

        if let Some(pin) = self.effective_pin() {
            if pin.len() != 64 || !pin.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(invalid("pinned_key_sha256 must be 64 hex characters"));
            }
        }

        if let Some(dir) = &self.activation_dir {
            if dir.as_os_str().is_empty() {
                return Err(invalid("activation_dir cannot be empty when set"));
            }
        }

        Ok(())
    }
}

fn invalid(reason: &str) -> LicenseError {
    LicenseError::Config(reason.to_string())
}
