/// Descriptor sources for machine fingerprinting
///
/// Every source is a plain function returning an optional value. Sources
/// of one category are tried in order and the first non-empty answer
/// wins; errors are swallowed and simply leave the descriptor out.
#[cfg(target_os = "linux")]
use std::fs;
#[cfg(target_os = "linux")]
use std::path::Path;
#[cfg(any(target_os = "macos", target_os = "windows"))]
use std::process::Command;

/// A single best-effort descriptor source
pub type Source = fn() -> Option<String>;

const ZERO_MAC: &str = "00:00:00:00:00:00";

/// Evaluate sources in order, returning the first trimmed non-empty value
pub fn first_success(sources: &[Source]) -> Option<String> {
    sources.iter().find_map(|source| {
        source()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

/// Host name as reported by the OS
pub fn hostname() -> Option<String> {
    first_success(&[system_hostname])
}

/// OS-level persistent machine identifier
pub fn os_machine_id() -> Option<String> {
    first_success(MACHINE_ID_SOURCES)
}

/// Hardware address of the primary non-loopback interface
pub fn hardware_address() -> Option<String> {
    first_success(HARDWARE_ADDRESS_SOURCES)
}

/// Numeric host identifier from the platform network identity API
///
/// Only consulted when fewer than two other descriptors were found.
pub fn node_id() -> Option<u64> {
    #[cfg(unix)]
    {
        let id = unsafe { libc::gethostid() };
        // gethostid yields a 32-bit value that may be sign-extended
        let id = (id as u64) & 0xffff_ffff;
        if id != 0 {
            return Some(id);
        }
    }
    None
}

fn system_hostname() -> Option<String> {
    hostname::get().ok().and_then(|h| h.into_string().ok())
}

#[cfg(target_os = "linux")]
const MACHINE_ID_SOURCES: &[Source] = &[etc_machine_id, dbus_machine_id];

#[cfg(target_os = "macos")]
const MACHINE_ID_SOURCES: &[Source] = &[ioreg_platform_uuid];

#[cfg(target_os = "windows")]
const MACHINE_ID_SOURCES: &[Source] = &[registry_machine_guid];

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const MACHINE_ID_SOURCES: &[Source] = &[];

#[cfg(target_os = "linux")]
fn etc_machine_id() -> Option<String> {
    fs::read_to_string("/etc/machine-id").ok()
}

#[cfg(target_os = "linux")]
fn dbus_machine_id() -> Option<String> {
    fs::read_to_string("/var/lib/dbus/machine-id").ok()
}

#[cfg(target_os = "macos")]
fn ioreg_platform_uuid() -> Option<String> {
    let output = Command::new("ioreg")
        .args(["-rd1", "-c", "IOPlatformExpertDevice"])
        .output()
        .ok()?;
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .find(|l| l.contains("IOPlatformUUID"))
        .and_then(|l| l.split('"').nth(3))
        .map(String::from)
}

#[cfg(target_os = "windows")]
fn registry_machine_guid() -> Option<String> {
    let output = Command::new("reg")
        .args([
            "query",
            r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Cryptography",
            "/v",
            "MachineGuid",
        ])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .find(|l| l.contains("MachineGuid"))
        .and_then(|l| l.split_whitespace().last())
        .map(String::from)
}

#[cfg(target_os = "linux")]
const HARDWARE_ADDRESS_SOURCES: &[Source] = &[sysfs_hardware_address];

#[cfg(target_os = "macos")]
const HARDWARE_ADDRESS_SOURCES: &[Source] = &[ifconfig_hardware_address];

#[cfg(target_os = "windows")]
const HARDWARE_ADDRESS_SOURCES: &[Source] = &[getmac_hardware_address];

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const HARDWARE_ADDRESS_SOURCES: &[Source] = &[];

/// Name prefixes of bridges and container links created on the host
const SOFTWARE_INTERFACE_PREFIXES: &[&str] = &["docker", "br-", "veth", "virbr", "cni", "flannel"];

/// Interfaces that never identify the physical machine
fn is_ignored_interface(name: &str) -> bool {
    name.starts_with("lo")
        || name.to_lowercase().contains("virtual")
        || SOFTWARE_INTERFACE_PREFIXES.iter().any(|p| name.starts_with(p))
}

fn usable_address(addr: &str) -> Option<String> {
    let addr = addr.trim().to_lowercase();
    if addr.is_empty() || addr == ZERO_MAC {
        None
    } else {
        Some(addr)
    }
}

#[cfg(target_os = "linux")]
fn sysfs_hardware_address() -> Option<String> {
    sysfs_address_under(Path::new("/sys/class/net"))
}

/// First usable address under a `/sys/class/net` style tree
///
/// Interfaces backed by a device (a `device` link) come first; purely
/// software interfaces are only used when no physical one has an address.
#[cfg(target_os = "linux")]
fn sysfs_address_under(root: &Path) -> Option<String> {
    // read_dir order is unspecified; sort so the pick is stable across runs
    let mut names: Vec<String> = fs::read_dir(root)
        .ok()?
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| !is_ignored_interface(name))
        .collect();
    names.sort();

    let (physical, software): (Vec<&String>, Vec<&String>) =
        names.iter().partition(|name| root.join(name).join("device").exists());

    physical.into_iter().chain(software).find_map(|name| {
        fs::read_to_string(root.join(name).join("address"))
            .ok()
            .and_then(|addr| usable_address(&addr))
    })
}

#[cfg(target_os = "macos")]
fn ifconfig_hardware_address() -> Option<String> {
    let output = Command::new("ifconfig").output().ok()?;
    let text = String::from_utf8_lossy(&output.stdout);

    let mut current_ignored = true;
    for line in text.lines() {
        if !line.starts_with(char::is_whitespace) {
            let name = line.split(':').next().unwrap_or_default();
            current_ignored = is_ignored_interface(name);
            continue;
        }
        if current_ignored {
            continue;
        }
        if let Some(addr) = line.trim().strip_prefix("ether ") {
            if let Some(addr) = addr.split_whitespace().next().and_then(usable_address) {
                return Some(addr);
            }
        }
    }
    None
}

#[cfg(target_os = "windows")]
fn getmac_hardware_address() -> Option<String> {
    let output = Command::new("getmac").arg("/NH").output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|l| l.split_whitespace().next())
        .filter(|token| token.len() == 17)
        .find_map(|token| usable_address(&token.replace('-', ":")))
}
