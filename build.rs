/// Build script to load environment variables from .env file
/// This allows compile-time pinning of the issuer public key

const PIN_VAR: &str = "KC_LICENSOR_PINNED_KEY_SHA256";

fn main() {
    println!("cargo:rerun-if-env-changed={}", PIN_VAR);

    // An explicit environment variable wins over the .env file
    if let Ok(value) = std::env::var(PIN_VAR) {
        let value = value.trim();
        if !value.is_empty() {
            println!("cargo:rustc-env={}={}", PIN_VAR, value);
            return;
        }
    }

    // Load .env file from the crate root if it exists
    let Ok(path) = std::env::var("CARGO_MANIFEST_DIR") else {
        return;
    };
    let env_path = std::path::Path::new(&path).join(".env");
    if !env_path.exists() {
        return;
    }
    println!("cargo:rerun-if-changed={}", env_path.display());

    // Read .env file manually (avoid extra dependencies in build script)
    let Ok(contents) = std::fs::read_to_string(&env_path) else {
        return;
    };
    for line in contents.lines() {
        let line = line.trim();

        // Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Parse KEY=VALUE format
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"').trim_matches('\'');

            if key == PIN_VAR && !value.is_empty() {
                println!("cargo:rustc-env={}={}", key, value);
                eprintln!("🔧 Building with pinned issuer key: {}", value);
            }
        }
    }
}
