/// Machine module - Host fingerprinting and system snapshot
pub mod fingerprint;
pub mod sources;

pub use fingerprint::{truncate, DescriptorSources, Descriptors, MachineFingerprint};

use crate::utils::platform::SystemInfo;

/// Source of the machine identity a claim is bound to or checked against
///
/// Implementations must be free of mutable state so a single value can be
/// shared by concurrent verifications.
pub trait MachineIdentity {
    fn fingerprint(&self) -> MachineFingerprint;

    fn system_info(&self) -> SystemInfo {
        SystemInfo::collect()
    }
}

/// The machine this process runs on
#[derive(Debug, Clone, Copy, Default)]
pub struct HostMachine;

impl MachineIdentity for HostMachine {
    fn fingerprint(&self) -> MachineFingerprint {
        MachineFingerprint::compute()
    }
}

impl MachineIdentity for Descriptors {
    fn fingerprint(&self) -> MachineFingerprint {
        Descriptors::fingerprint(self)
    }
}

impl MachineIdentity for MachineFingerprint {
    fn fingerprint(&self) -> MachineFingerprint {
        self.clone()
    }
}
