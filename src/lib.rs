/// KillCode Licensor - Offline license issuance and verification
///
/// A vendor signs license claims with an RSA key pair; the protected
/// software verifies the artifact at startup without any network access:
/// 1. Integrity seal over the encoded license and signature
/// 2. RSA-PSS signature over the canonical claim bytes
/// 3. Expiry and optional machine binding
/// 4. Advisory activation record on the local machine

pub mod activation;
pub mod config;
pub mod crypto;
pub mod error;
pub mod issuance;
pub mod license;
pub mod logging;
pub mod machine;
pub mod utils;
pub mod verification;

#[cfg(test)]
mod test_support;

pub use activation::{activate, ActivationRecord, ActivationStore};
pub use error::{ErrorKind, LicenseError, LicenseResult};
pub use issuance::{create_claim, create_claim_on, KeyPair, KeyStore, Signer};
pub use license::{ClaimRequest, Expiry, Features, LicenseClaim, SignedLicense};
pub use machine::{Descriptors, HostMachine, MachineFingerprint, MachineIdentity};
pub use verification::Verifier;
