use std::process::Command;

const CATALOG: &str = "../../crates/sim-achievements/src/data/achievements.yaml";

fn git(args: &[&str]) -> Option<String> {
    let out = Command::new("git").args(args).output().ok()?;
    if !out.status.success() {
        return None;
    }
    let s = String::from_utf8(out.stdout).ok()?.trim().to_string();
    (!s.is_empty()).then_some(s)
}

/// FNV-1a over the catalog bytes; two builds replay alike only with the same rules.
fn catalog_digest() -> String {
    match std::fs::read(CATALOG) {
        Ok(bytes) => {
            let hash = bytes.iter().fold(0xcbf29ce484222325u64, |h, b| {
                (h ^ u64::from(*b)).wrapping_mul(0x100000001b3)
            });
            format!("{hash:016x}")
        }
        Err(_) => "unknown".into(),
    }
}

fn main() {
    let mut sha = git(&["rev-parse", "--short=12", "HEAD"]).unwrap_or_else(|| "unknown".into());
    if git(&["status", "--porcelain", "--untracked-files=no"]).is_some() {
        sha.push_str("-dirty");
    }
    let date = git(&["show", "-s", "--format=%cs", "HEAD"]).unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs().to_string())
            .unwrap_or_else(|_| "unknown".into())
    });
    println!("cargo:rustc-env=HANDSET_GIT_SHA={sha}");
    println!("cargo:rustc-env=HANDSET_BUILD_DATE={date}");
    println!("cargo:rustc-env=HANDSET_CATALOG_DIGEST={}", catalog_digest());
    println!("cargo:rerun-if-changed={CATALOG}");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
