/// Signature scheme shared by issuer and verifier
///
/// RSA-PSS with SHA-256, MGF1-SHA-256 and the maximum salt length the key
/// allows (`emLen - hLen - 2`). Both sides derive the salt length from the
/// key, so a license signed with any key size verifies unchanged.
use rsa::pkcs8::EncodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{Pss, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::{LicenseError, LicenseResult};

/// Salt length for PSS with SHA-256 on this key
pub fn max_salt_len(key: &RsaPublicKey) -> usize {
    let em_bits = key.n().bits().saturating_sub(1);
    let em_len = em_bits.div_ceil(8);
    em_len.saturating_sub(<Sha256 as Digest>::output_size() + 2)
}

/// Padding scheme for signing or verifying with `key`
pub fn pss_for(key: &RsaPublicKey) -> Pss {
    Pss::new_with_salt::<Sha256>(max_salt_len(key))
}

/// Message digest fed to the PSS encoder
pub fn message_digest(message: &[u8]) -> Vec<u8> {
    Sha256::digest(message).to_vec()
}

/// SHA-256 hex of the key's SubjectPublicKeyInfo DER, used for pinning
pub fn key_id(key: &RsaPublicKey) -> LicenseResult<String> {
    let der = key
        .to_public_key_der()
        .map_err(|e| LicenseError::EncodingError(format!("cannot encode public key: {}", e)))?;
    Ok(hex::encode(Sha256::digest(der.as_bytes())))
}
