/// License signing (vendor side)
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;

use super::keys::KeyPair;
use crate::crypto;
use crate::error::{LicenseError, LicenseResult};
use crate::license::{to_canonical_bytes, LicenseClaim, SignedLicense};
use crate::verification::seal;

/// Signs claims with the issuer's private key
///
/// The key pair is handed in explicitly; the signer never reads or writes
/// key files itself.
#[derive(Debug)]
pub struct Signer {
    keys: KeyPair,
}

impl Signer {
    pub fn new(keys: KeyPair) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }

    /// Sign a claim and seal the result
    ///
    /// # Arguments
    /// * `claim` - Claim to sign; encoded canonically before signing
    ///
    /// # Returns
    /// The distributable artifact, ready to be written next to the software
    pub fn sign(&self, claim: &LicenseClaim) -> LicenseResult<SignedLicense> {
        let claim_bytes = to_canonical_bytes(claim)?;
        let digest = crypto::message_digest(&claim_bytes);

        let public = self.keys.public_key();
        let signature = self
            .keys
            .private_key()
            .sign_with_rng(&mut OsRng, crypto::pss_for(public), &digest)
            .map_err(|e| LicenseError::KeyUnavailable(format!("signing failed: {}", e)))?;

        let license = BASE64.encode(&claim_bytes);
        let signature = BASE64.encode(signature);
        let integrity = seal::seal(&license, &signature);

        tracing::info!(
            license_id = claim.license_id(),
            product_id = claim.product_id(),
            machine_bound = claim.machine_bound(),
            expires_at = %claim.expires_at(),
            "license signed"
        );

        Ok(SignedLicense {
            license,
            signature,
            public_key: self.keys.public_key_pem()?,
            integrity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::ClaimRequest;
    use crate::machine::Descriptors;
    use crate::test_support::test_signer;
    use chrono::Utc;

    fn claim() -> LicenseClaim {
        ClaimRequest::new("acme-core", "Acme Corp")
            .feature("seats", 5)
            .into_claim(&Descriptors::default(), Utc::now())
    }

    #[test]
    fn test_sign_produces_complete_artifact() {
        let signed = test_signer().sign(&claim()).unwrap();
        assert!(!signed.license.is_empty());
        assert!(!signed.signature.is_empty());
        assert!(signed.public_key.contains("BEGIN PUBLIC KEY"));
        assert!(seal::verify_seal(&signed.license, &signed.signature, &signed.integrity));
    }

    #[test]
    fn test_license_field_is_canonical_claim() {
        let claim = claim();
        let signed = test_signer().sign(&claim).unwrap();
        let bytes = BASE64.decode(&signed.license).unwrap();
        assert_eq!(bytes, to_canonical_bytes(&claim).unwrap());

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with(r#"{"client": "Acme Corp", "expires_at": "never""#));
    }

    #[test]
    fn test_signatures_are_salted() {
        let claim = claim();
        let a = test_signer().sign(&claim).unwrap();
        let b = test_signer().sign(&claim).unwrap();
        assert_eq!(a.license, b.license);
        assert_ne!(a.signature, b.signature);
        assert_ne!(a.integrity, b.integrity);
    }
}
