use std::env;
use std::process::Command;

/// Short commit for `tbase --version`. Source tarballs have no `.git`, so
/// packagers can pin the value with `TBASE_GIT_HASH`.
fn commit_hash() -> String {
    if let Ok(pinned) = env::var("TBASE_GIT_HASH") {
        if !pinned.trim().is_empty() {
            return pinned.trim().to_string();
        }
    }

    Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .filter(|hash| !hash.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/refs/heads");
    println!("cargo:rerun-if-env-changed=TBASE_GIT_HASH");

    println!("cargo:rustc-env=GIT_COMMIT_HASH={}", commit_hash());
    println!(
        "cargo:rustc-env=TARGET={}",
        env::var("TARGET").unwrap_or_else(|_| "unknown".to_string())
    );
}
