//! Embeds build identification (`GIT_HASH`, `BUILD_TIMESTAMP`, `BUILD_PROFILE`)
//! for the startup banner and `/health`.

use std::process::Command;

const UNKNOWN: &str = "unknown";

fn main() {
    emit("GIT_HASH", &git_hash());
    emit(
        "BUILD_TIMESTAMP",
        &chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    );
    emit(
        "BUILD_PROFILE",
        &std::env::var("PROFILE").unwrap_or_else(|_| UNKNOWN.to_string()),
    );

    // Packaged builds pass the hash in
    println!("cargo:rerun-if-env-changed=AA_GIT_HASH");
    println!("cargo:rerun-if-changed=../.git/HEAD");
}

fn emit(key: &str, value: &str) {
    println!("cargo:rustc-env={key}={value}");
}

/// Short commit hash, `AA_GIT_HASH` if set, or `unknown` outside a checkout
fn git_hash() -> String {
    if let Ok(hash) = std::env::var("AA_GIT_HASH") {
        if !hash.trim().is_empty() {
            return hash.trim().to_string();
        }
    }

    match Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
    {
        Ok(out) if out.status.success() => {
            let hash = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if hash.is_empty() {
                UNKNOWN.to_string()
            } else {
                hash
            }
        }
        _ => UNKNOWN.to_string(),
    }
}
