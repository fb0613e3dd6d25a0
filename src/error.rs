/// Error taxonomy for issuance, verification and activation
///
/// Every failure path returns one of these; nothing in the verification
/// path panics or is retried. Display strings are safe to show operators:
/// they never contain key material or full machine fingerprints.
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`LicenseError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    MalformedArtifact,
    MalformedClaim,
    TamperedIntegrity,
    BadSignature,
    Expired,
    MachineMismatch,
    KeyUnavailable,
    EncodingError,
    Storage,
    Config,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::MalformedArtifact => "malformed_artifact",
            ErrorKind::MalformedClaim => "malformed_claim",
            ErrorKind::TamperedIntegrity => "tampered_integrity",
            ErrorKind::BadSignature => "bad_signature",
            ErrorKind::Expired => "expired",
            ErrorKind::MachineMismatch => "machine_mismatch",
            ErrorKind::KeyUnavailable => "key_unavailable",
            ErrorKind::EncodingError => "encoding_error",
            ErrorKind::Storage => "storage",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum LicenseError {
    /// License artifact does not exist
    #[error("license file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Artifact is unreadable or misses one of its required fields
    #[error("invalid license file format: {0}")]
    MalformedArtifact(String),

    /// Signed payload could not be decoded into a claim
    #[error("invalid license data: {0}")]
    MalformedClaim(String),

    /// Integrity seal does not match license and signature
    #[error("integrity check failed - license may be tampered")]
    TamperedIntegrity,

    /// Signature, embedded key or issuer pin rejected
    #[error("signature verification failed: {0}")]
    BadSignature(String),

    /// License expiry lies in the past
    #[error("license expired on {expired_at}")]
    Expired { expired_at: String },

    /// License bound to another machine; both fingerprints are prefixes only
    #[error("license not valid for this machine (expected {expected}, actual {actual})")]
    MachineMismatch { expected: String, actual: String },

    /// No usable signing key pair
    #[error("signing key unavailable: {0}")]
    KeyUnavailable(String),

    /// Claim could not be canonically serialized
    #[error("canonical encoding failed: {0}")]
    EncodingError(String),

    /// Activation record or key file I/O
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl LicenseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LicenseError::NotFound(_) => ErrorKind::NotFound,
            LicenseError::MalformedArtifact(_) => ErrorKind::MalformedArtifact,
            LicenseError::MalformedClaim(_) => ErrorKind::MalformedClaim,
            LicenseError::TamperedIntegrity => ErrorKind::TamperedIntegrity,
            LicenseError::BadSignature(_) => ErrorKind::BadSignature,
            LicenseError::Expired { .. } => ErrorKind::Expired,
            LicenseError::MachineMismatch { .. } => ErrorKind::MachineMismatch,
            LicenseError::KeyUnavailable(_) => ErrorKind::KeyUnavailable,
            LicenseError::EncodingError(_) => ErrorKind::EncodingError,
            LicenseError::Storage(_) => ErrorKind::Storage,
            LicenseError::Config(_) => ErrorKind::Config,
        }
    }
}

/// Result type for license operations
pub type LicenseResult<T> = Result<T, LicenseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(LicenseError::TamperedIntegrity.kind(), ErrorKind::TamperedIntegrity);
        assert_eq!(
            LicenseError::Expired { expired_at: "2020-01-01T00:00:00+00:00".into() }.kind(),
            ErrorKind::Expired
        );
        assert_eq!(LicenseError::NotFound(PathBuf::from("x")).kind().name(), "not_found");
    }

    #[test]
    fn test_reason_strings() {
        let err = LicenseError::Expired { expired_at: "2020-01-01T00:00:00+00:00".into() };
        assert_eq!(err.to_string(), "license expired on 2020-01-01T00:00:00+00:00");

        let err = LicenseError::MachineMismatch {
            expected: "0123456789abcdef...".into(),
            actual: "fedcba9876543210...".into(),
        };
        assert!(err.to_string().contains("0123456789abcdef..."));
    }
}
