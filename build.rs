//! Build script: embeds the tool version as `AQUILA_INSTALL_VERSION`.

use std::process::Command;

fn main() {
    // Release builds pin the version through AQUILA_INSTALL_VERSION; local
    // builds fall back to git describe.
    if let Ok(version) = std::env::var("AQUILA_INSTALL_VERSION") {
        println!("cargo:rustc-env=AQUILA_INSTALL_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !version.is_empty() {
            println!("cargo:rustc-env=AQUILA_INSTALL_VERSION={version}");
        }
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=AQUILA_INSTALL_VERSION");
}
