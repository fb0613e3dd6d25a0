/// Local activation record
///
/// Advisory only: the record says a license was accepted here at some
/// point. It never feeds an accept/reject decision, and a missing or
/// corrupt record is not an error.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{LicenseError, LicenseResult};
use crate::license::{timestamp, LicenseClaim};
use crate::machine::{HostMachine, MachineFingerprint, MachineIdentity};
use crate::utils::platform::SystemInfo;

const APP_DIR: &str = "kc-licensor";
const RECORD_FILE: &str = "activation.json";

/// Snapshot written after a successful verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationRecord {
    #[serde(with = "timestamp::rfc3339")]
    pub activated_at: DateTime<Utc>,
    pub machine_id: MachineFingerprint,
    pub license_id: String,
    pub system_info: SystemInfo,
}

/// Directory holding the activation record
#[derive(Debug, Clone)]
pub struct ActivationStore {
    dir: PathBuf,
}

impl ActivationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the user's state directory
    pub fn in_user_state_dir() -> LicenseResult<Self> {
        Ok(Self::new(default_location()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(RECORD_FILE)
    }

    /// Record an activation of `claim` on this host
    pub fn record_activation(&self, claim: &LicenseClaim) -> LicenseResult<ActivationRecord> {
        self.record_activation_on(claim, &HostMachine)
    }

    /// Record an activation, overwriting any previous record
    ///
    /// # Arguments
    /// * `claim` - The verified claim
    /// * `machine` - Identity whose fingerprint and system snapshot are stored
    pub fn record_activation_on<M: MachineIdentity + ?Sized>(
        &self,
        claim: &LicenseClaim,
        machine: &M,
    ) -> LicenseResult<ActivationRecord> {
        let record = ActivationRecord {
            activated_at: Utc::now(),
            machine_id: machine.fingerprint(),
            license_id: claim.license_id().to_string(),
            system_info: machine.system_info(),
        };

        fs::create_dir_all(&self.dir)
            .map_err(|e| LicenseError::Storage(format!("cannot create {}: {}", self.dir.display(), e)))?;

        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| LicenseError::EncodingError(e.to_string()))?;
        let path = self.path();
        fs::write(&path, json)
            .map_err(|e| LicenseError::Storage(format!("cannot write {}: {}", path.display(), e)))?;

        tracing::info!(license_id = %record.license_id, path = %path.display(), "activation recorded");
        Ok(record)
    }

    /// True if an activation record file exists
    pub fn is_activated(&self) -> bool {
        self.path().is_file()
    }

    /// Read the record; absent or unreadable records yield `None`
    pub fn load(&self) -> Option<ActivationRecord> {
        let path = self.path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == IoErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read activation record");
                return None;
            }
        };

        match serde_json::from_str(&text) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt activation record");
                None
            }
        }
    }

    /// Remove the record; removing a missing record succeeds
    pub fn clear(&self) -> LicenseResult<()> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(LicenseError::Storage(format!("cannot remove {}: {}", path.display(), e))),
        }
    }
}

/// Per-user state directory for the licensor
///
/// The platform state directory where one exists, else local data, else
/// the home directory.
pub fn default_location() -> LicenseResult<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .or_else(dirs::home_dir)
        .map(|base| base.join(APP_DIR))
        .ok_or_else(|| LicenseError::Storage("no user state directory available".to_string()))
}
