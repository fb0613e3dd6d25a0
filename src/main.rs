/// KillCode Licensor - License issuance & offline verification
///
/// Vendor side:
/// 1. `keygen` creates the encrypted issuer key pair
/// 2. `issue` signs a license, optionally bound to a customer machine
///
/// Customer side:
/// 3. `verify` / `activate` check a license at startup (exit 0 = accepted)
/// 4. `fingerprint` prints the identifier a vendor binds licenses to
use anyhow::{bail, Context};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use kc_licensor::activation::{self, ActivationStore};
use kc_licensor::config::{load_config, Config};
use kc_licensor::crypto;
use kc_licensor::issuance::{create_claim, KeyPair, KeyStore, Signer};
use kc_licensor::license::{ClaimRequest, Expiry, LicenseClaim};
use kc_licensor::logging::init_logging;
use kc_licensor::machine::MachineFingerprint;
use kc_licensor::utils::platform::{platform_tag, SystemInfo};
use kc_licensor::verification::Verifier;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "kc-licensor")]
#[command(version = VERSION)]
#[command(about = "Offline license issuance and verification")]
struct Cli {
    /// Config file (default: <executable>.config, if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the issuer key pair
    Keygen {
        /// RSA modulus size (default from config)
        #[arg(long)]
        bits: Option<usize>,

        /// Replace an existing key pair
        #[arg(long)]
        force: bool,
    },

    /// Sign a new license
    Issue {
        /// Product identifier
        #[arg(long)]
        product: String,

        /// Licensee name
        #[arg(long)]
        client: String,

        /// Expiry timestamp or "never"
        #[arg(long, conflicts_with = "days")]
        expires: Option<String>,

        /// Expire this many days from now
        #[arg(long)]
        days: Option<i64>,

        /// Bind to the machine running this command
        #[arg(long)]
        machine_bound: bool,

        /// Bind to a fingerprint reported by `kc-licensor fingerprint`
        #[arg(long)]
        machine_id: Option<String>,

        /// Feature flag as name=value; repeatable
        #[arg(long = "feature", value_name = "NAME=VALUE")]
        features: Vec<String>,

        /// Output path (default: license_path from config)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Verify a license on this machine
    Verify {
        /// License file (default: license_path from config)
        #[arg(short, long)]
        license: Option<PathBuf>,

        /// Do not write an activation record
        #[arg(long)]
        no_activate: bool,
    },

    /// Verify a license and record the activation
    Activate {
        /// License file (default: license_path from config)
        #[arg(short, long)]
        license: Option<PathBuf>,
    },

    /// Show the local activation record
    Status,

    /// Print this machine's fingerprint
    Fingerprint,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(if cli.verbose { "debug" } else { &config.log_level });

    match run(cli.command, &config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns false when a license was rejected
fn run(command: Commands, config: &Config) -> anyhow::Result<bool> {
    match command {
        Commands::Keygen { bits, force } => {
            keygen(config, bits.unwrap_or(config.key_bits), force)?;
            Ok(true)
        }
        Commands::Issue {
            product,
            client,
            expires,
            days,
            machine_bound,
            machine_id,
            features,
            out,
        } => {
            let expires_at = match (expires, days) {
                (Some(text), _) => text.parse::<Expiry>()?,
                (None, Some(days)) => Duration::try_days(days)
                    .and_then(|d| Utc::now().checked_add_signed(d))
                    .map(Expiry::At)
                    .context("--days is out of range")?,
                (None, None) => Expiry::Never,
            };

            let mut request = ClaimRequest::new(product, client)
                .expires_at(expires_at)
                .machine_bound(machine_bound);
            for feature in &features {
                let (name, value) = parse_feature(feature)?;
                request = request.feature(name, value);
            }
            if let Some(id) = machine_id {
                request = request.bind_to(MachineFingerprint::from_hex(&id)?);
            }

            let out = out.unwrap_or_else(|| config.license_path.clone());
            issue(config, request, &out)?;
            Ok(true)
        }
        Commands::Verify { license, no_activate } => {
            let path = license.unwrap_or_else(|| config.license_path.clone());
            Ok(verify(config, &path, config.record_activation && !no_activate))
        }
        Commands::Activate { license } => {
            let path = license.unwrap_or_else(|| config.license_path.clone());
            let store = activation_store(config)?;

            eprintln!("🔍 Activating license {}...", path.display());
            match activation::activate(&verifier(config), &path, &store) {
                Ok((claim, record)) => {
                    print_claim(&claim);
                    eprintln!("✅ License activated (record: {})", store.path().display());
                    eprintln!("   Machine: {}", record.machine_id);
                    Ok(true)
                }
                Err(e) => {
                    eprintln!("❌ Activation failed: {}", e);
                    Ok(false)
                }
            }
        }
        Commands::Status => {
            let store = activation_store(config)?;
            match store.load() {
                Some(record) => {
                    eprintln!("✅ Activated");
                    eprintln!("   License: {}", record.license_id);
                    eprintln!("   Activated at: {}", record.activated_at);
                    eprintln!("   Machine: {}", record.machine_id);
                    eprintln!(
                        "   System: {} {} ({})",
                        record.system_info.platform, record.system_info.platform_release, record.system_info.architecture
                    );
                    Ok(true)
                }
                None => {
                    eprintln!("ℹ️  No activation record at {}", store.path().display());
                    Ok(false)
                }
            }
        }
        Commands::Fingerprint => {
            let info = SystemInfo::collect();
            eprintln!("🖥️  {} ({})", info.hostname, platform_tag());

            // Full value on stdout; the vendor needs it for --machine-id
            println!("{}", MachineFingerprint::compute().as_str());
            Ok(true)
        }
    }
}

fn keygen(config: &Config, bits: usize, force: bool) -> anyhow::Result<()> {
    let store = key_store(config);
    if store.exists() && !force {
        bail!(
            "key pair already exists at {} (use --force to replace it)",
            store.private_key_path().display()
        );
    }

    eprintln!("🔑 Generating {}-bit RSA key pair...", bits);
    let keys = KeyPair::generate(bits)?;
    store.save(&keys)?;

    eprintln!("✅ Private key: {}", store.private_key_path().display());
    eprintln!("✅ Public key:  {}", store.public_key_path().display());
    eprintln!("   Key pin (sha256): {}", crypto::key_id(keys.public_key())?);
    Ok(())
}

fn issue(config: &Config, request: ClaimRequest, out: &Path) -> anyhow::Result<()> {
    let keys = key_store(config)
        .load_or_generate(config.key_bits)
        .context("cannot load signing key")?;
    let signer = Signer::new(keys);

    let claim = create_claim(request);
    let signed = signer.sign(&claim)?;
    signed.write_to(out)?;

    eprintln!("✅ License written to {}", out.display());
    print_claim(&claim);
    Ok(())
}

fn verify(config: &Config, path: &Path, record: bool) -> bool {
    eprintln!("🔍 Verifying license {}...", path.display());

    let claim = match verifier(config).verify_file(path) {
        Ok(claim) => claim,
        Err(e) => {
            eprintln!("❌ License verification failed: {}", e);
            return false;
        }
    };

    eprintln!("✅ License verified successfully");
    print_claim(&claim);

    // The record is advisory; failing to write it never rejects the license
    if record {
        match activation_store(config).and_then(|store| Ok(store.record_activation(&claim)?)) {
            Ok(_) => {}
            Err(e) => eprintln!("⚠️  Could not record activation: {:#}", e),
        }
    }
    true
}

fn verifier(config: &Config) -> Verifier {
    match config.effective_pin() {
        Some(pin) => Verifier::new().with_pinned_key(pin),
        None => Verifier::new(),
    }
}

fn key_store(config: &Config) -> KeyStore {
    KeyStore::new(&config.key_dir, config.passphrase().as_str())
}

fn activation_store(config: &Config) -> anyhow::Result<ActivationStore> {
    match &config.activation_dir {
        Some(dir) => Ok(ActivationStore::new(dir)),
        None => Ok(ActivationStore::in_user_state_dir()?),
    }
}

fn parse_feature(text: &str) -> anyhow::Result<(String, serde_json::Value)> {
    let Some((name, value)) = text.split_once('=') else {
        bail!("invalid feature '{}', expected NAME=VALUE", text);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("invalid feature '{}', name is empty", text);
    }

    // Numbers, booleans and JSON literals keep their type; anything else is a string
    let value = serde_json::from_str(value.trim())
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

fn print_claim(claim: &LicenseClaim) {
    eprintln!("   License ID: {}", claim.license_id());
    eprintln!("   Product: {}", claim.product_id());
    eprintln!("   Client: {}", claim.client());
    eprintln!("   Expires: {}", claim.expires_at());
    if let Some(machine) = claim.machine_id() {
        eprintln!("   Bound to: {}", machine);
    }
    if !claim.features().is_empty() {
        let names: Vec<&str> = claim.features().keys().map(String::as_str).collect();
        eprintln!("   Features: {}", names.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_feature_types() {
        assert_eq!(parse_feature("seats=5").unwrap(), ("seats".to_string(), serde_json::json!(5)));
        assert_eq!(parse_feature("beta=true").unwrap().1, serde_json::json!(true));
        assert_eq!(parse_feature("tier=pro").unwrap().1, serde_json::json!("pro"));
        assert_eq!(parse_feature("note=a=b").unwrap().1, serde_json::json!("a=b"));
    }

    #[test]
    fn test_parse_feature_rejects_garbage() {
        assert!(parse_feature("seats").is_err());
        assert!(parse_feature("=5").is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
