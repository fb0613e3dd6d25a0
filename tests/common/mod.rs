//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::OnceLock;

use kc_licensor::{Descriptors, KeyPair, Signer};

/// One 2048-bit signer per test binary.
pub fn signer() -> &'static Signer {
    static SIGNER: OnceLock<Signer> = OnceLock::new();
    SIGNER.get_or_init(|| Signer::new(KeyPair::generate(2048).expect("key generation")))
}

/// Machine the licenses are issued for.
pub fn office_pc() -> Descriptors {
    Descriptors {
        hostname: Some("office-pc".to_string()),
        machine_id: Some("8c1f4a2e6b0d4f19a3c5e7b9d1f3a5c7".to_string()),
        hardware_address: Some("00:1a:2b:3c:4d:5e".to_string()),
        node_id: None,
    }
}

/// Same box after a rename and a NIC swap.
pub fn office_pc_moved() -> Descriptors {
    Descriptors {
        hostname: Some("office-pc-2".to_string()),
        hardware_address: Some("00:1a:2b:3c:4d:99".to_string()),
        ..office_pc()
    }
}
