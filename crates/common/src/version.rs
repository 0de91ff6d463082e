use std::fmt;

use serde::Serialize;

/// Build metadata captured at compile time by the binary's `build.rs`.
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub repo_version: &'static str,
    pub build_profile: &'static str,
    pub build_features: &'static str,
    pub build_timestamp: &'static str,
    pub rust_version: &'static str,
    pub build_target: Option<&'static str>,
    pub build_host: Option<&'static str>,
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "version:   {} ({})", self.version, self.repo_version)?;
        writeln!(f, "profile:   {}", self.build_profile)?;
        writeln!(f, "features:  {}", self.build_features)?;
        writeln!(f, "built:     {}", self.build_timestamp)?;
        writeln!(f, "rustc:     {}", self.rust_version)?;
        write!(
            f,
            "target:    {} (host {})",
            self.build_target.unwrap_or("unknown"),
            self.build_host.unwrap_or("unknown")
        )
    }
}

/// Expands to the [`BuildInfo`] of the crate it is invoked from.
///
/// The invoking crate needs a build script that exports `REPO_VERSION`,
/// `BUILD_PROFILE`, `BUILD_FEATURES`, `BUILD_TIMESTAMP` and `RUST_VERSION`.
#[macro_export]
macro_rules! build_info {
    () => {
        $crate::version::BuildInfo {
            version: env!("CARGO_PKG_VERSION"),
            repo_version: env!("REPO_VERSION"),
            build_profile: env!("BUILD_PROFILE"),
            build_features: env!("BUILD_FEATURES"),
            build_timestamp: env!("BUILD_TIMESTAMP"),
            rust_version: env!("RUST_VERSION"),
            build_target: option_env!("BUILD_TARGET"),
            build_host: option_env!("BUILD_HOST"),
        }
    };
}
