/// Signing key material and its on-disk storage
///
/// The private key lives in an encrypted PKCS#8 PEM file, the public key
/// in a SubjectPublicKeyInfo PEM next to it. Key material is zeroized on
/// drop: `RsaPrivateKey` clears itself and the passphrase is `Zeroizing`.
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use crate::error::{LicenseError, LicenseResult};

/// Key size used when none is configured
pub const DEFAULT_KEY_BITS: usize = 4096;

/// Smallest key size accepted for new keys
pub const MIN_KEY_BITS: usize = 2048;

const PRIVATE_KEY_FILE: &str = "license_signing.key";
const PUBLIC_KEY_FILE: &str = "license_signing.pub";

/// RSA key pair held by the issuer
pub struct KeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl KeyPair {
    /// Generate a fresh key pair
    pub fn generate(bits: usize) -> LicenseResult<Self> {
        if bits < MIN_KEY_BITS {
            return Err(LicenseError::KeyUnavailable(format!(
                "key size {} below minimum {}",
                bits, MIN_KEY_BITS
            )));
        }
        let private = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| LicenseError::KeyUnavailable(format!("key generation failed: {}", e)))?;
        Ok(Self::from_private(private))
    }

    pub fn from_private(private: RsaPrivateKey) -> Self {
        let public = private.to_public_key();
        Self { private, public }
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    /// Modulus size in bits
    pub fn bits(&self) -> usize {
        self.public.n().bits()
    }

    /// Public key as SubjectPublicKeyInfo PEM
    pub fn public_key_pem(&self) -> LicenseResult<String> {
        self.public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| LicenseError::EncodingError(format!("cannot encode public key: {}", e)))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair").field("bits", &self.bits()).finish_non_exhaustive()
    }
}

/// Directory holding the issuer key files
pub struct KeyStore {
    dir: PathBuf,
    passphrase: Zeroizing<String>,
}

impl KeyStore {
    pub fn new(dir: impl Into<PathBuf>, passphrase: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            passphrase: Zeroizing::new(passphrase.into()),
        }
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.dir.join(PRIVATE_KEY_FILE)
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.dir.join(PUBLIC_KEY_FILE)
    }

    /// True if a private key file is present
    pub fn exists(&self) -> bool {
        self.private_key_path().is_file()
    }

    /// Decrypt and load the stored key pair
    pub fn load(&self) -> LicenseResult<KeyPair> {
        self.require_passphrase()?;

        let path = self.private_key_path();
        let pem = Zeroizing::new(fs::read_to_string(&path).map_err(|e| {
            LicenseError::KeyUnavailable(format!("cannot read {}: {}", path.display(), e))
        })?);

        let private = RsaPrivateKey::from_pkcs8_encrypted_pem(&pem, self.passphrase.as_bytes())
            .map_err(|_| {
                LicenseError::KeyUnavailable(format!(
                    "cannot decrypt {} (wrong passphrase or corrupt file)",
                    path.display()
                ))
            })?;

        tracing::debug!(path = %path.display(), "signing key loaded");
        Ok(KeyPair::from_private(private))
    }

    /// Persist a key pair, replacing existing files
    pub fn save(&self, keys: &KeyPair) -> LicenseResult<()> {
        self.require_passphrase()?;

        fs::create_dir_all(&self.dir).map_err(|e| {
            LicenseError::Storage(format!("cannot create {}: {}", self.dir.display(), e))
        })?;

        let private_pem = keys
            .private_key()
            .to_pkcs8_encrypted_pem(&mut OsRng, self.passphrase.as_bytes(), LineEnding::LF)
            .map_err(|e| LicenseError::EncodingError(format!("cannot encrypt private key: {}", e)))?;

        let private_path = self.private_key_path();
        write_private_file(&private_path, private_pem.as_bytes())?;

        write_file(&self.public_key_path(), keys.public_key_pem()?.as_bytes())?;

        tracing::info!(dir = %self.dir.display(), bits = keys.bits(), "signing key pair stored");
        Ok(())
    }

    /// Load the stored key pair, generating and storing one on first use
    pub fn load_or_generate(&self, bits: usize) -> LicenseResult<KeyPair> {
        if self.exists() {
            return self.load();
        }

        tracing::info!(bits, "no signing key found, generating a new pair");
        let keys = KeyPair::generate(bits)?;
        self.save(&keys)?;
        Ok(keys)
    }

    fn require_passphrase(&self) -> LicenseResult<()> {
        if self.passphrase.is_empty() {
            return Err(LicenseError::KeyUnavailable(
                "no key passphrase configured".to_string(),
            ));
        }
        Ok(())
    }
}

fn write_file(path: &Path, contents: &[u8]) -> LicenseResult<()> {
    fs::write(path, contents)
        .map_err(|e| LicenseError::Storage(format!("cannot write {}: {}", path.display(), e)))
}

/// Write a file readable by the owner only
///
/// A new file is created with mode 0600; an existing one is narrowed to
/// 0600 before any key material is written into it.
#[cfg(unix)]
fn write_private_file(path: &Path, contents: &[u8]) -> LicenseResult<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let storage_err = |e: std::io::Error| LicenseError::Storage(format!("cannot write {}: {}", path.display(), e));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(storage_err)?;
    file.set_permissions(fs::Permissions::from_mode(0o600))
        .map_err(storage_err)?;
    file.write_all(contents).map_err(storage_err)?;
    file.sync_all().map_err(storage_err)
}

#[cfg(not(unix))]
fn write_private_file(path: &Path, contents: &[u8]) -> LicenseResult<()> {
    write_file(path, contents)
}
