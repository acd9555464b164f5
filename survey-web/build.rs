//! Embeds the revision, build time and profile shown in the startup banner

use std::process::Command;

fn main() {
    let revision = git_revision().unwrap_or_else(|| "unknown".into());
    let built_at = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC");
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".into());

    println!("cargo:rustc-env=SURVEY_REVISION={}", revision);
    println!("cargo:rustc-env=SURVEY_BUILT_AT={}", built_at);
    println!("cargo:rustc-env=SURVEY_PROFILE={}", profile);
    println!("cargo:rerun-if-changed=../.git/HEAD");
}

/// Abbreviated commit id, `None` outside a checkout
fn git_revision() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let revision = String::from_utf8(output.stdout).ok()?;
    Some(revision.trim().to_string())
}
