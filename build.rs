//! Build script: embeds the crate version from the environment or `git describe`.

use std::process::Command;

fn main() {
    // Release pipelines export LAYERED_OPTS_VERSION; local builds fall back to git describe.
    if let Ok(version) = std::env::var("LAYERED_OPTS_VERSION") {
        println!("cargo:rustc-env=LAYERED_OPTS_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=LAYERED_OPTS_VERSION={version}");
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=LAYERED_OPTS_VERSION");
}
