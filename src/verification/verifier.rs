/// License verification state machine
///
/// One deterministic pass per call, stopping at the first failing stage:
/// artifact parse, integrity seal, signature, claim decode, expiry, machine
/// binding. The cryptographic stages run before any claim field is read, so
/// a forged expiry or machine id is never trusted.
///
/// Trust is self-contained: the public key travels inside the artifact, so
/// acceptance proves "signed by whoever holds the matching private key".
/// Pin the issuer key with [`Verifier::with_pinned_key`] to also prove
/// which key that was.
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use std::fmt;
use std::path::Path;
use subtle::ConstantTimeEq;

use super::seal;
use crate::crypto;
use crate::error::{LicenseError, LicenseResult};
use crate::license::{timestamp, LicenseClaim, SignedLicense};
use crate::machine::{HostMachine, MachineIdentity};

/// Verification stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ParseArtifact,
    SealCheck,
    SignatureCheck,
    DecodeClaim,
    ExpiryCheck,
    MachineCheck,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ParseArtifact => "parse_artifact",
            Stage::SealCheck => "seal_check",
            Stage::SignatureCheck => "signature_check",
            Stage::DecodeClaim => "decode_claim",
            Stage::ExpiryCheck => "expiry_check",
            Stage::MachineCheck => "machine_check",
        };
        f.write_str(name)
    }
}

/// Checks signed licenses against the machine identity `M`
///
/// Holds no mutable state; one verifier can serve any number of calls
/// from any number of threads.
#[derive(Debug, Clone)]
pub struct Verifier<M: MachineIdentity = HostMachine> {
    machine: M,
    pinned_key: Option<String>,
}

impl Verifier<HostMachine> {
    /// Verifier bound to the current host
    pub fn new() -> Self {
        Self::with_machine(HostMachine)
    }
}

impl Default for Verifier<HostMachine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: MachineIdentity> Verifier<M> {
    pub fn with_machine(machine: M) -> Self {
        Self {
            machine,
            pinned_key: None,
        }
    }

    /// Require the embedded public key to hash to `key_sha256`
    ///
    /// # Arguments
    /// * `key_sha256` - Hex SHA-256 of the issuer key's SubjectPublicKeyInfo DER
    pub fn with_pinned_key(mut self, key_sha256: impl Into<String>) -> Self {
        self.pinned_key = Some(key_sha256.into().trim().to_ascii_lowercase());
        self
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn pinned_key(&self) -> Option<&str> {
        self.pinned_key.as_deref()
    }

    /// Read and verify the artifact at `path`
    pub fn verify_file(&self, path: &Path) -> LicenseResult<LicenseClaim> {
        tracing::debug!(stage = %Stage::ParseArtifact, path = %path.display());
        let artifact = match SignedLicense::read_from(path) {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::warn!(stage = %Stage::ParseArtifact, kind = %e.kind(), "license rejected: {}", e);
                return Err(e);
            }
        };
        self.verify(&artifact)
    }

    /// Verify a parsed artifact against the current time
    pub fn verify(&self, artifact: &SignedLicense) -> LicenseResult<LicenseClaim> {
        self.verify_at(artifact, Utc::now())
    }

    /// Verify a parsed artifact as of `now`
    ///
    /// # Returns
    /// The decoded claim on acceptance, the first failing check otherwise
    pub fn verify_at(&self, artifact: &SignedLicense, now: DateTime<Utc>) -> LicenseResult<LicenseClaim> {
        match self.run(artifact, now) {
            Ok(claim) => {
                tracing::info!(
                    license_id = claim.license_id(),
                    product_id = claim.product_id(),
                    "license accepted"
                );
                Ok(claim)
            }
            Err((stage, e)) => {
                tracing::warn!(stage = %stage, kind = %e.kind(), "license rejected: {}", e);
                Err(e)
            }
        }
    }

    fn run(&self, artifact: &SignedLicense, now: DateTime<Utc>) -> Result<LicenseClaim, (Stage, LicenseError)> {
        tracing::debug!(stage = %Stage::SealCheck);
        if !seal::verify_seal(&artifact.license, &artifact.signature, &artifact.integrity) {
            return Err((Stage::SealCheck, LicenseError::TamperedIntegrity));
        }

        tracing::debug!(stage = %Stage::SignatureCheck);
        let claim_bytes = self
            .check_signature(artifact)
            .map_err(|e| (Stage::SignatureCheck, e))?;

        tracing::debug!(stage = %Stage::DecodeClaim);
        let claim = decode_claim(&claim_bytes).map_err(|e| (Stage::DecodeClaim, e))?;

        tracing::debug!(stage = %Stage::ExpiryCheck, expires_at = %claim.expires_at());
        check_expiry(&claim, now).map_err(|e| (Stage::ExpiryCheck, e))?;

        tracing::debug!(stage = %Stage::MachineCheck, machine_bound = claim.machine_bound());
        self.check_machine(&claim).map_err(|e| (Stage::MachineCheck, e))?;

        Ok(claim)
    }

    /// Returns the verified claim bytes
    fn check_signature(&self, artifact: &SignedLicense) -> LicenseResult<Vec<u8>> {
        let claim_bytes = BASE64
            .decode(&artifact.license)
            .map_err(|e| LicenseError::BadSignature(format!("license data is not valid base64: {}", e)))?;
        let signature = BASE64
            .decode(&artifact.signature)
            .map_err(|e| LicenseError::BadSignature(format!("signature is not valid base64: {}", e)))?;
        let key = RsaPublicKey::from_public_key_pem(artifact.public_key.trim())
            .map_err(|e| LicenseError::BadSignature(format!("invalid public key: {}", e)))?;

        if let Some(pin) = &self.pinned_key {
            let id = crypto::key_id(&key).map_err(|e| LicenseError::BadSignature(e.to_string()))?;
            if !bool::from(id.as_bytes().ct_eq(pin.as_bytes())) {
                return Err(LicenseError::BadSignature(
                    "public key does not match the pinned issuer key".to_string(),
                ));
            }
        }

        key.verify(crypto::pss_for(&key), &crypto::message_digest(&claim_bytes), &signature)
            .map_err(|_| LicenseError::BadSignature("signature does not match license data".to_string()))?;

        Ok(claim_bytes)
    }

    fn check_machine(&self, claim: &LicenseClaim) -> LicenseResult<()> {
        if !claim.machine_bound() {
            return Ok(());
        }

        let expected = claim.machine_id().ok_or_else(|| {
            LicenseError::MalformedClaim("machine-bound license has no machine_id".to_string())
        })?;
        let actual = self.machine.fingerprint();

        if *expected != actual {
            return Err(LicenseError::MachineMismatch {
                expected: expected.short(),
                actual: actual.short(),
            });
        }
        Ok(())
    }
}

fn decode_claim(claim_bytes: &[u8]) -> LicenseResult<LicenseClaim> {
    serde_json::from_slice(claim_bytes).map_err(|e| LicenseError::MalformedClaim(e.to_string()))
}

fn check_expiry(claim: &LicenseClaim, now: DateTime<Utc>) -> LicenseResult<()> {
    match claim.expires_at().instant() {
        Some(at) if claim.expires_at().is_expired_at(now) => Err(LicenseError::Expired {
            expired_at: timestamp::format(&at),
        }),
        _ => Ok(()),
    }
}
