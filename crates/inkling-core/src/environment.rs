#![forbid(unsafe_code)]

//! Execution environment detection.
//!
//! Decides whether the process runs in a non-interactive CI context, where
//! erasing and rewriting earlier lines is unsafe because output lands in a
//! log rather than on a live terminal.
//!
//! # Detection Strategy
//!
//! 1. `CI=false` (or `0`) forces interactive behavior, whatever else is set.
//! 2. A known vendor variable (`GITHUB_ACTIONS`, `GITLAB_CI`, ...) marks CI
//!    and records the vendor name.
//! 3. Any generic marker (`CI`, `CONTINUOUS_INTEGRATION`, `BUILD_NUMBER`,
//!    `RUN_ID`, ...) with a non-empty value marks CI.
//!
//! # Invariants
//!
//! - **Determinism**: the same environment lookup always yields the same
//!   [`Environment`].
//! - **Override wins**: a forced-interactive environment never reports CI.

/// Variable whose value `false` forces interactive behavior.
pub const ENV_CI: &str = "CI";

/// Vendor-specific variables, checked before the generic markers.
const CI_VENDORS: &[(&str, &str)] = &[
    ("GITHUB_ACTIONS", "GitHub Actions"),
    ("GITLAB_CI", "GitLab CI"),
    ("CIRCLECI", "CircleCI"),
    ("TRAVIS", "Travis CI"),
    ("BUILDKITE", "Buildkite"),
    ("JENKINS_URL", "Jenkins"),
    ("TEAMCITY_VERSION", "TeamCity"),
    ("TF_BUILD", "Azure Pipelines"),
    ("APPVEYOR", "AppVeyor"),
    ("DRONE", "Drone"),
    ("BITBUCKET_BUILD_NUMBER", "Bitbucket Pipelines"),
    ("CODEBUILD_BUILD_ARN", "AWS CodeBuild"),
    ("NETLIFY", "Netlify"),
    ("NOW_BUILDER", "Vercel"),
    ("SEMAPHORE", "Semaphore"),
];

/// Generic markers set by most CI providers.
const CI_MARKERS: &[&str] = &[
    "CI",
    "CONTINUOUS_INTEGRATION",
    "BUILD_ID",
    "BUILD_NUMBER",
    "CI_APP_ID",
    "CI_BUILD_ID",
    "CI_BUILD_NUMBER",
    "CI_NAME",
    "RUN_ID",
];

/// Detected execution environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Environment {
    ci: bool,
    vendor: Option<&'static str>,
    forced_interactive: bool,
}

impl Environment {
    /// An interactive environment (no CI markers).
    #[must_use]
    pub const fn interactive() -> Self {
        Self {
            ci: false,
            vendor: None,
            forced_interactive: false,
        }
    }

    /// A CI environment with an optional vendor name.
    #[must_use]
    pub const fn ci(vendor: Option<&'static str>) -> Self {
        Self {
            ci: true,
            vendor,
            forced_interactive: false,
        }
    }

    /// Detect from the process environment.
    #[must_use]
    pub fn detect() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Detect using a custom environment lookup (for tests).
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_set = |key: &str| get_env(key).is_some_and(|v| !v.is_empty());

        if let Some(value) = get_env(ENV_CI)
            && is_false_flag(&value)
        {
            #[cfg(feature = "tracing")]
            tracing::debug!("CI detection overridden by CI=false");
            return Self {
                ci: false,
                vendor: None,
                forced_interactive: true,
            };
        }

        if let Some(&(_, name)) = CI_VENDORS.iter().find(|(key, _)| is_set(key)) {
            #[cfg(feature = "tracing")]
            tracing::debug!(vendor = name, "CI vendor detected");
            return Self::ci(Some(name));
        }

        if CI_MARKERS.iter().any(|key| is_set(key)) {
            #[cfg(feature = "tracing")]
            tracing::debug!("generic CI marker detected");
            return Self::ci(None);
        }

        Self::interactive()
    }

    /// Whether the process runs in CI.
    #[inline]
    #[must_use]
    pub const fn is_ci(&self) -> bool {
        self.ci
    }

    /// Name of the detected CI vendor, when known.
    #[inline]
    #[must_use]
    pub const fn vendor(&self) -> Option<&'static str> {
        self.vendor
    }

    /// Whether `CI=false` suppressed detection.
    #[inline]
    #[must_use]
    pub const fn is_forced_interactive(&self) -> bool {
        self.forced_interactive
    }
}

fn is_false_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("false") || value == "0"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_env_is_interactive() {
        let env = Environment::from_env_with(env_of(&[]));
        assert!(!env.is_ci());
        assert_eq!(env.vendor(), None);
        assert!(!env.is_forced_interactive());
    }

    #[test]
    fn generic_ci_marker_detected() {
        let env = Environment::from_env_with(env_of(&[("CI", "true")]));
        assert!(env.is_ci());
        assert_eq!(env.vendor(), None);
    }

    #[test]
    fn vendor_detected_by_name() {
        let env = Environment::from_env_with(env_of(&[("GITHUB_ACTIONS", "true"), ("CI", "1")]));
        assert!(env.is_ci());
        assert_eq!(env.vendor(), Some("GitHub Actions"));
    }

    #[test]
    fn ci_false_overrides_vendor() {
        let env = Environment::from_env_with(env_of(&[("CI", "false"), ("GITLAB_CI", "true")]));
        assert!(!env.is_ci());
        assert!(env.is_forced_interactive());
    }

    #[test]
    fn ci_zero_is_an_override() {
        let env = Environment::from_env_with(env_of(&[("CI", "0"), ("BUILD_NUMBER", "42")]));
        assert!(!env.is_ci());
    }

    #[test]
    fn empty_marker_value_is_ignored() {
        let env = Environment::from_env_with(env_of(&[("BUILD_NUMBER", "")]));
        assert!(!env.is_ci());
    }

    #[test]
    fn build_number_alone_marks_ci() {
        let env = Environment::from_env_with(env_of(&[("BUILD_NUMBER", "17")]));
        assert!(env.is_ci());
    }
}
