/// Distributable license artifact
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

use crate::error::{LicenseError, LicenseResult};

/// Signed license as shipped next to the protected software
///
/// All fields stay in their transport encoding; the seal is computed over
/// the `license` and `signature` strings exactly as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedLicense {
    /// Base64 of the canonical claim bytes
    pub license: String,
    /// Base64 RSA-PSS signature over the claim bytes
    pub signature: String,
    /// Issuer public key, SubjectPublicKeyInfo PEM
    pub public_key: String,
    /// Hex integrity seal
    pub integrity: String,
}

impl SignedLicense {
    /// Parse an artifact, requiring every field to be a non-empty string
    pub fn from_json(text: &str) -> LicenseResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| LicenseError::MalformedArtifact(format!("not valid JSON: {}", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| LicenseError::MalformedArtifact("expected a JSON object".to_string()))?;

        let field = |name: &str| -> LicenseResult<String> {
            object
                .get(name)
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    LicenseError::MalformedArtifact(format!("missing or empty field '{}'", name))
                })
        };

        Ok(Self {
            license: field("license")?,
            signature: field("signature")?,
            public_key: field("public_key")?,
            integrity: field("integrity")?,
        })
    }

    /// Read an artifact from disk
    pub fn read_from(path: &Path) -> LicenseResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            IoErrorKind::NotFound => LicenseError::NotFound(path.to_path_buf()),
            _ => LicenseError::MalformedArtifact(format!("cannot read {}: {}", path.display(), e)),
        })?;
        Self::from_json(&text)
    }

    /// Pretty JSON with two-space indentation
    pub fn to_json(&self) -> LicenseResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| LicenseError::EncodingError(e.to_string()))
    }

    /// Write the artifact to disk, creating parent directories
    pub fn write_to(&self, path: &Path) -> LicenseResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| LicenseError::Storage(format!("cannot create {}: {}", parent.display(), e)))?;
        }
        fs::write(path, self.to_json()?)
            .map_err(|e| LicenseError::Storage(format!("cannot write {}: {}", path.display(), e)))
    }
}
