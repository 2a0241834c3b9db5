//! Build metadata generated by the build script

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Build time (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash, or "unknown" outside a checkout
pub fn git_hash() -> &'static str {
    GIT_HASH
}

/// Version line for `--version`
pub fn long_version() -> String {
    format!(
        "{} ({} built {})",
        env!("CARGO_PKG_VERSION"),
        git_hash(),
        build_time()
    )
}
