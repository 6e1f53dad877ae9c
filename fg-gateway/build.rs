use std::{env, process::Command};

const BUILD_VARS: [&str; 3] = [
    "FG_BUILD_GIT_TAG",
    "FG_BUILD_GIT_COMMIT",
    "FG_BUILD_GIT_DIRTY",
];

fn main() {
    for key in BUILD_VARS {
        println!("cargo:rerun-if-env-changed={key}");
    }

    let git_tag = env_or("FG_BUILD_GIT_TAG", || {
        run_git(&["describe", "--tags", "--exact-match"]).unwrap_or_else(|| "untagged".into())
    });
    let git_commit = env_or("FG_BUILD_GIT_COMMIT", || {
        run_git(&["rev-parse", "--short=12", "HEAD"]).unwrap_or_else(|| "unknown".into())
    });
    let git_dirty = env_or("FG_BUILD_GIT_DIRTY", || {
        let dirty = run_git(&["status", "--porcelain", "--untracked-files=no"])
            .is_some_and(|output| !output.is_empty());
        dirty.to_string()
    });

    for (key, value) in BUILD_VARS.iter().zip([git_tag, git_commit, git_dirty]) {
        println!("cargo:rustc-env={key}={value}");
    }
}

fn env_or(key: &str, fallback: impl FnOnce() -> String) -> String {
    env::var(key).unwrap_or_else(|_| fallback())
}

fn run_git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|value| value.trim().to_string())
}
