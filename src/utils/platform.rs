/// Platform-specific utilities
///
/// Detect OS, architecture and kernel details for the system snapshot
/// embedded in machine-bound licenses and activation records
use serde::{Deserialize, Serialize};

/// Snapshot of the host's system descriptors
///
/// Informational only: nothing in verification compares these fields,
/// machine binding relies on the fingerprint alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub platform: String,
    pub platform_release: String,
    pub platform_version: String,
    pub architecture: String,
    pub processor: String,
    pub hostname: String,
}

impl SystemInfo {
    /// Collect a snapshot of the current host
    pub fn collect() -> Self {
        let kernel = kernel_info();
        Self {
            platform: os_family().to_string(),
            platform_release: kernel.release,
            platform_version: kernel.version,
            architecture: kernel.machine,
            processor: processor_name(),
            hostname: hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_default(),
        }
    }
}

/// OS family name in the conventional capitalisation (`Linux`, `Darwin`, `Windows`)
pub fn os_family() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        other => other,
    }
}

/// Short platform tag, e.g. `linux-x86_64`
pub fn platform_tag() -> String {
    let arch = match std::env::consts::ARCH {
        "aarch64" => "arm64",
        "arm" => "armv7",
        other => other,
    };
    format!("{}-{}", std::env::consts::OS, arch)
}

struct KernelInfo {
    release: String,
    version: String,
    machine: String,
}

#[cfg(unix)]
fn kernel_info() -> KernelInfo {
    use std::ffi::CStr;

    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut uts) } != 0 {
        return fallback_kernel_info();
    }

    // uname fields are NUL-terminated within their fixed buffers
    let field = |raw: &[libc::c_char]| -> String {
        unsafe { CStr::from_ptr(raw.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    };

    KernelInfo {
        release: field(&uts.release),
        version: field(&uts.version),
        machine: field(&uts.machine),
    }
}

#[cfg(not(unix))]
fn kernel_info() -> KernelInfo {
    fallback_kernel_info()
}

#[cfg_attr(not(unix), allow(dead_code))]
fn fallback_kernel_info() -> KernelInfo {
    KernelInfo {
        release: String::new(),
        version: String::new(),
        machine: std::env::consts::ARCH.to_string(),
    }
}

fn processor_name() -> String {
    #[cfg(target_os = "linux")]
    {
        if let Ok(cpuinfo) = std::fs::read_to_string("/proc/cpuinfo") {
            let model = cpuinfo
                .lines()
                .find(|l| l.starts_with("model name"))
                .and_then(|l| l.split_once(':'))
                .map(|(_, v)| v.trim().to_string());
            if let Some(model) = model {
                return model;
            }
        }
    }

    std::env::consts::ARCH.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_system_info() {
        let info = SystemInfo::collect();
        assert_eq!(info.platform, os_family());
        assert!(!info.architecture.is_empty());
        assert!(!info.processor.is_empty());
    }

    #[test]
    fn test_platform_tag() {
        let tag = platform_tag();
        assert!(tag.starts_with(std::env::consts::OS));
        assert!(tag.contains('-'));
    }

    #[test]
    fn test_system_info_json_keys() {
        let info = SystemInfo::collect();
        let json = serde_json::to_value(&info).unwrap();
        for key in [
            "platform",
            "platform_release",
            "platform_version",
            "architecture",
            "processor",
            "hostname",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }
}
