/// License claim - the signed payload
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::timestamp::{self, Expiry};
use crate::machine::{MachineFingerprint, MachineIdentity};
use crate::utils::platform::SystemInfo;

/// Claim format version written by this issuer
pub const CLAIM_VERSION: &str = "1.0";

/// Capability name to value; interpreted by the protected application only
pub type Features = BTreeMap<String, serde_json::Value>;

/// Facts asserted by a license
///
/// Fields are read-only: any change after signing would break the
/// signature, so claims are only built through [`ClaimRequest`] or decoded
/// from verified bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseClaim {
    license_id: String,
    product_id: String,
    client: String,
    #[serde(with = "timestamp::rfc3339")]
    issued_at: DateTime<Utc>,
    expires_at: Expiry,
    machine_bound: bool,
    #[serde(default)]
    features: Features,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    machine_id: Option<MachineFingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    system_info: Option<SystemInfo>,
}

fn default_version() -> String {
    CLAIM_VERSION.to_string()
}

impl LicenseClaim {
    pub fn license_id(&self) -> &str {
        &self.license_id
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn client(&self) -> &str {
        &self.client
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> Expiry {
        self.expires_at
    }

    pub fn machine_bound(&self) -> bool {
        self.machine_bound
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Fingerprint the claim is bound to, if any
    pub fn machine_id(&self) -> Option<&MachineFingerprint> {
        self.machine_id.as_ref()
    }

    pub fn system_info(&self) -> Option<&SystemInfo> {
        self.system_info.as_ref()
    }
}

/// Parameters for a new claim
#[derive(Debug, Clone)]
pub struct ClaimRequest {
    pub product_id: String,
    pub client: String,
    pub expires_at: Expiry,
    pub machine_bound: bool,
    pub features: Features,
    /// Bind to this fingerprint instead of the issuing machine
    pub bind_to: Option<MachineFingerprint>,
}

impl ClaimRequest {
    /// Unbound, never-expiring request without features
    pub fn new(product_id: impl Into<String>, client: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            client: client.into(),
            expires_at: Expiry::Never,
            machine_bound: false,
            features: Features::new(),
            bind_to: None,
        }
    }

    pub fn expires_at(mut self, expires_at: Expiry) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn machine_bound(mut self, machine_bound: bool) -> Self {
        self.machine_bound = machine_bound;
        self
    }

    pub fn feature(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.features.insert(name.into(), value.into());
        self
    }

    pub fn features(mut self, features: Features) -> Self {
        self.features = features;
        self
    }

    /// Bind to a fingerprint reported by the target machine; implies machine binding
    pub fn bind_to(mut self, fingerprint: MachineFingerprint) -> Self {
        self.machine_bound = true;
        self.bind_to = Some(fingerprint);
        self
    }

    /// Materialise the claim, fingerprinting `machine` when bound
    pub(crate) fn into_claim<M: MachineIdentity + ?Sized>(self, machine: &M, now: DateTime<Utc>) -> LicenseClaim {
        // A remote binding describes another host, so the local snapshot is left out
        let (machine_id, system_info) = match (self.machine_bound, self.bind_to) {
            (false, _) => (None, None),
            (true, Some(remote)) => (Some(remote), None),
            (true, None) => (Some(machine.fingerprint()), Some(machine.system_info())),
        };

        LicenseClaim {
            license_id: uuid::Uuid::new_v4().to_string(),
            product_id: self.product_id,
            client: self.client,
            issued_at: now,
            expires_at: self.expires_at,
            machine_bound: self.machine_bound,
            features: self.features,
            version: default_version(),
            machine_id,
            system_info,
        }
    }
}
