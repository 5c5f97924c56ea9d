fn main() {
    for var in [
        "GLYPHRAIN_BUILD",
        "RUSTFLAGS",
        "CARGO_ENCODED_RUSTFLAGS",
        "GITHUB_SHA",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    let build_id = non_empty_env("GLYPHRAIN_BUILD").unwrap_or_else(infer_build_id);
    println!("cargo:rustc-env=GLYPHRAIN_BUILD={build_id}");

    let sha = git_short_sha()
        .or_else(|| non_empty_env("GITHUB_SHA").and_then(|v| short_hex(&v)))
        .unwrap_or_default();
    println!("cargo:rustc-env=GLYPHRAIN_GIT_SHA={sha}");
}

fn non_empty_env(name: &str) -> Option<String> {
    let v = std::env::var(name).ok()?;
    let v = v.trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

fn short_hex(v: &str) -> Option<String> {
    let short = &v[..v.len().min(7)];
    if !short.is_empty() && short.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(short.to_ascii_lowercase())
    } else {
        None
    }
}

fn git_short_sha() -> Option<String> {
    let out = std::process::Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let s = String::from_utf8(out.stdout).ok()?;
    short_hex(s.trim())
}

fn infer_build_id() -> String {
    let os = match std::env::var("CARGO_CFG_TARGET_OS").as_deref() {
        Ok("macos") => "darwin".to_string(),
        Ok(other) => other.to_string(),
        Err(_) => "unknown".to_string(),
    };
    let arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_else(|_| "unknown".to_string());
    let features = std::env::var("CARGO_CFG_TARGET_FEATURE").unwrap_or_default();

    if arch != "x86_64" {
        return format!("{os}-{arch}-native");
    }
    if os != "linux" {
        return format!("{os}-{arch}");
    }

    let level = if features.contains("avx512f") {
        "v4"
    } else if features.contains("avx2") {
        "v3"
    } else if features.contains("sse4.2") || features.contains("sse4_2") {
        "v2"
    } else {
        "v1"
    };
    format!("{os}-{arch}-{level}")
}
