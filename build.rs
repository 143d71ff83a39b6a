use std::{env, process::Command};

fn main() {
    let version = env::var("CARGO_PKG_VERSION").unwrap();

    let short_sha = output(Command::new("git")
        .args(&["rev-parse", "--short", "HEAD"]));
    let date = output(Command::new("git")
        .args(&["log", "-1", "--date=short", "--pretty=%cd"]));

    // Building from a source archive, without git history.
    let version = match (short_sha, date) {
        (Some(sha), Some(date)) => format!("{} ({} {})", version, sha, date),
        _ => version,
    };

    println!("cargo:rustc-env=VERSION={}", version);
    println!("cargo:rerun-if-changed=migrations");
}

fn output(cmd: &mut Command) -> Option<String> {
    let out = cmd.output().ok()?;

    if !out.status.success() {
        return None;
    }

    String::from_utf8(out.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}
