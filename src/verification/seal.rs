/// Integrity seal over license and signature
///
/// Three salted rounds alternating SHA-256 and SHA-512. This is a tamper
/// speed bump layered on the signature, never a replacement for it.
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;

/// Application salt appended in every round; wire constant
const SEAL_SALT: &[u8] = b"shiplock_integrity_salt_v1";

/// Separator between the encoded license and signature
const SEAL_SEPARATOR: &str = ":";

/// Compute the integrity seal
///
/// # Arguments
/// * `license_b64` - Transport-encoded claim bytes, exactly as stored
/// * `signature_b64` - Transport-encoded signature, exactly as stored
///
/// # Returns
/// Lowercase hex SHA-256 digest of the final round
pub fn seal(license_b64: &str, signature_b64: &str) -> String {
    let combined = format!("{}{}{}", license_b64, SEAL_SEPARATOR, signature_b64);

    let round1 = salted_hex::<Sha256>(combined.as_bytes());
    let round2 = salted_hex::<Sha512>(round1.as_bytes());
    salted_hex::<Sha256>(round2.as_bytes())
}

/// Check a stored seal against the recomputed one
///
/// # Returns
/// true if the seal matches
pub fn verify_seal(license_b64: &str, signature_b64: &str, expected: &str) -> bool {
    let actual = seal(license_b64, signature_b64);

    // Use constant-time comparison to prevent timing attacks
    actual.as_bytes().ct_eq(expected.as_bytes()).into()
}

fn salted_hex<D: Digest>(input: &[u8]) -> String {
    let mut hasher = D::new();
    hasher.update(input);
    hasher.update(SEAL_SALT);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_is_deterministic() {
        let s1 = seal("bGljZW5zZQ==", "c2lnbmF0dXJl");
        let s2 = seal("bGljZW5zZQ==", "c2lnbmF0dXJl");

        // Same input should produce same seal
        assert_eq!(s1, s2);

        // Seal should be a 64 character hex string
        assert_eq!(s1.len(), 64);
        assert!(s1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_seal_matches_reference_chain() {
        let salt = "shiplock_integrity_salt_v1";
        let h1 = hex::encode(Sha256::digest(format!("a:b{}", salt).as_bytes()));
        let h2 = hex::encode(Sha512::digest(format!("{}{}", h1, salt).as_bytes()));
        let h3 = hex::encode(Sha256::digest(format!("{}{}", h2, salt).as_bytes()));
        assert_eq!(seal("a", "b"), h3);
        assert_eq!(h3, "2fcef3fb106e815c73a1400d2908c1a8b67d2500a159bf8ea7c74ce76135bd38");
    }

    #[test]
    fn test_seal_depends_on_both_inputs() {
        let base = seal("license", "signature");
        assert_ne!(base, seal("licensf", "signature"));
        assert_ne!(base, seal("license", "signaturf"));
        // The separator keeps the split point significant
        assert_ne!(seal("ab", "c"), seal("a", "bc"));
    }

    #[test]
    fn test_verify_seal() {
        let stored = seal("license", "signature");
        assert!(verify_seal("license", "signature", &stored));

        // Wrong inputs should fail
        assert!(!verify_seal("license", "other", &stored));

        // Tampered seal should fail
        let mut tampered = stored.clone();
        tampered.push('0');
        assert!(!verify_seal("license", "signature", &tampered));
        assert!(!verify_seal("license", "signature", &stored.to_uppercase()));
    }
}
