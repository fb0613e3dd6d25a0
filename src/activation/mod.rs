/// Activation module - Verify-then-record on the local machine
pub mod store;

pub use store::{default_location, ActivationRecord, ActivationStore};

use std::path::Path;

use crate::error::LicenseResult;
use crate::license::LicenseClaim;
use crate::machine::MachineIdentity;
use crate::verification::Verifier;

/// Verify the artifact at `path` and record the activation
///
/// A rejected license leaves the store untouched. The record is written
/// with the verifier's machine identity.
pub fn activate<M: MachineIdentity>(
    verifier: &Verifier<M>,
    path: &Path,
    store: &ActivationStore,
) -> LicenseResult<(LicenseClaim, ActivationRecord)> {
    let claim = verifier.verify_file(path)?;
    let record = store.record_activation_on(&claim, verifier.machine())?;
    Ok((claim, record))
}
