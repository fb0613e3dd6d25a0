/// Machine fingerprinting for license binding
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use super::sources::{self, Source};
use crate::error::{LicenseError, LicenseResult};

/// Separator between descriptors; part of the digest input
const DELIMITER: &str = "|";

/// Number of hex characters shown wherever a fingerprint is displayed
const VISIBLE_PREFIX: usize = 16;

/// Raw descriptors gathered from the host, in digest order
///
/// 1. hostname
/// 2. OS machine identifier
/// 3. primary hardware address
/// 4. numeric node identifier, only when fewer than two of the above exist
///
/// With nothing collected the digest falls back to OS and CPU architecture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Descriptors {
    pub hostname: Option<String>,
    pub machine_id: Option<String>,
    pub hardware_address: Option<String>,
    pub node_id: Option<u64>,
}

/// Where each descriptor category is read from
#[derive(Debug, Clone, Copy)]
pub struct DescriptorSources {
    pub hostname: Source,
    pub machine_id: Source,
    pub hardware_address: Source,
    pub node_id: fn() -> Option<u64>,
}

impl DescriptorSources {
    /// The live host
    pub const HOST: Self = Self {
        hostname: sources::hostname,
        machine_id: sources::os_machine_id,
        hardware_address: sources::hardware_address,
        node_id: sources::node_id,
    };
}

impl Descriptors {
    /// Gather descriptors from the live host
    pub fn collect() -> Self {
        Self::collect_from(&DescriptorSources::HOST)
    }

    /// Gather descriptors, consulting the node id only when it can matter
    ///
    /// The node id lookup may resolve the hostname through the system
    /// resolver, so it is skipped when two or more descriptors were found.
    pub fn collect_from(sources: &DescriptorSources) -> Self {
        let hostname = (sources.hostname)();
        let machine_id = (sources.machine_id)();
        let hardware_address = (sources.hardware_address)();

        let found = [&hostname, &machine_id, &hardware_address]
            .into_iter()
            .flatten()
            .filter(|v| !v.is_empty())
            .count();
        let node_id = if found < 2 { (sources.node_id)() } else { None };

        Self {
            hostname,
            machine_id,
            hardware_address,
            node_id,
        }
    }

    /// Descriptor strings in the fixed order fed to the digest
    pub fn ordered(&self) -> Vec<String> {
        let mut parts: Vec<String> = [&self.hostname, &self.machine_id, &self.hardware_address]
            .into_iter()
            .flatten()
            .filter(|v| !v.is_empty())
            .cloned()
            .collect();

        if parts.len() < 2 {
            if let Some(node) = self.node_id.filter(|n| *n != 0) {
                parts.push(node.to_string());
            }
        }

        if parts.is_empty() {
            parts = vec![
                std::env::consts::OS.to_string(),
                std::env::consts::ARCH.to_string(),
            ];
        }

        parts
    }

    /// Digest of these descriptors; pure
    pub fn fingerprint(&self) -> MachineFingerprint {
        MachineFingerprint::from_descriptors(&self.ordered())
    }
}

/// SHA-256 hex digest identifying a machine
///
/// `Display` and `Debug` only ever show a short prefix so the full value
/// does not end up in logs or error messages.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineFingerprint(String);

impl MachineFingerprint {
    /// Fingerprint of the current machine
    ///
    /// Never fails; missing descriptors are skipped.
    pub fn compute() -> Self {
        Descriptors::collect().fingerprint()
    }

    /// Hash an ordered descriptor list
    pub fn from_descriptors<S: AsRef<str>>(parts: &[S]) -> Self {
        let joined = parts
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(DELIMITER);
        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Parse a fingerprint reported by another machine
    pub fn from_hex(value: &str) -> LicenseResult<Self> {
        let value = value.trim().to_lowercase();
        if value.len() != 64 || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(LicenseError::Config(
                "machine id must be a 64 character hex digest".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Full digest; do not log
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Truncated form safe for user-facing messages
    pub fn short(&self) -> String {
        truncate(&self.0)
    }
}

impl fmt::Display for MachineFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}

impl fmt::Debug for MachineFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MachineFingerprint({})", self.short())
    }
}

/// Shorten any fingerprint-like string to its visible prefix
pub fn truncate(value: &str) -> String {
    let prefix: String = value.chars().take(VISIBLE_PREFIX).collect();
    format!("{}...", prefix)
}
