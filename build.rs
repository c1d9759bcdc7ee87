use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

/// Exposes GIT_HASH, GIT_COMMIT_DATE and IS_RELEASE to the `mrml --version`
/// string. Outside a git checkout all three fall back to a plain release
/// version.
fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let hash = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_default();
    let commit_date =
        git(&["log", "-1", "--format=%cd", "--date=format:%Y-%m-%d %H:%M"]).unwrap_or_default();

    let version = env!("CARGO_PKG_VERSION");
    let dirty = git(&["status", "--porcelain"]).is_some_and(|s| !s.is_empty());
    let tagged = git(&["tag", "--points-at", "HEAD"]).is_some_and(|tags| {
        tags.lines()
            .any(|tag| tag == version || tag.strip_prefix('v') == Some(version))
    });

    println!("cargo:rustc-env=GIT_HASH={}", hash);
    println!("cargo:rustc-env=GIT_COMMIT_DATE={}", commit_date);
    println!("cargo:rustc-env=IS_RELEASE={}", tagged && !dirty);
}
