/// License module - Claim model, canonical encoding and artifact format
pub mod artifact;
pub mod canonical;
pub mod claim;
pub mod timestamp;

pub use artifact::SignedLicense;
pub use canonical::to_canonical_bytes;
pub use claim::{ClaimRequest, Features, LicenseClaim, CLAIM_VERSION};
pub use timestamp::Expiry;
