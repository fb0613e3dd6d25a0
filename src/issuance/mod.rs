/// Issuance module - Claim creation, signing and key storage
pub mod keys;
pub mod signer;

pub use keys::{KeyPair, KeyStore, DEFAULT_KEY_BITS, MIN_KEY_BITS};
pub use signer::Signer;

use chrono::Utc;

use crate::license::{ClaimRequest, LicenseClaim};
use crate::machine::{HostMachine, MachineIdentity};

/// Build a claim on this machine
///
/// Stamps a fresh license id and the issue time; when the request is
/// machine bound without an explicit target, the current host is
/// fingerprinted.
pub fn create_claim(request: ClaimRequest) -> LicenseClaim {
    create_claim_on(request, &HostMachine)
}

/// Build a claim, taking machine identity from `machine`
pub fn create_claim_on<M: MachineIdentity + ?Sized>(request: ClaimRequest, machine: &M) -> LicenseClaim {
    request.into_claim(machine, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::MachineFingerprint;

    #[test]
    fn test_create_claim_stamps_issue_time() {
        let before = Utc::now();
        let claim = create_claim(ClaimRequest::new("acme-core", "Acme Corp"));
        assert!(claim.issued_at() >= before);
        assert!(claim.issued_at() <= Utc::now());
    }

    #[test]
    fn test_create_bound_claim_on_host() {
        let claim = create_claim(ClaimRequest::new("acme-core", "Acme Corp").machine_bound(true));
        assert_eq!(claim.machine_id(), Some(&MachineFingerprint::compute()));
    }
}
