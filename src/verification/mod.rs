/// Verification module - Integrity seal and the license verifier
pub mod seal;
pub mod verifier;

pub use seal::{seal, verify_seal};
pub use verifier::{Stage, Verifier};
