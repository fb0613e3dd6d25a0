/// Shared fixtures for unit tests
use std::sync::OnceLock;

use crate::issuance::{KeyPair, Signer};

/// One 2048-bit signer per test binary; generation is the slow part
pub fn test_signer() -> &'static Signer {
    static SIGNER: OnceLock<Signer> = OnceLock::new();
    SIGNER.get_or_init(|| Signer::new(KeyPair::generate(2048).unwrap()))
}

pub fn test_keys() -> &'static KeyPair {
    test_signer().keys()
}
