//! Decide whether a finished build should be published.

/// What the bundler produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildContext {
    /// Production build (minified, deployable).
    pub production: bool,
    /// The build was configured to emit sourcemaps.
    pub sourcemaps: bool,
    /// Server-side rendering bundle.
    pub ssr: bool,
}

impl Default for BuildContext {
    fn default() -> Self {
        Self {
            production: true,
            sourcemaps: true,
            ssr: false,
        }
    }
}

/// Why publishing was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SsrBuild,
    NonProduction,
    NoSourcemaps,
}

impl SkipReason {
    /// User-facing explanation, `None` for silent skips.
    pub fn warning(&self) -> Option<&'static str> {
        match self {
            SkipReason::SsrBuild => None,
            SkipReason::NonProduction => Some(
                "Skipped because running non-production build. If you want to run it anyway set skip_environment_check to true",
            ),
            SkipReason::NoSourcemaps => Some(
                "Skipped because the build is not configured to produce sourcemaps. Please check the bundler's sourcemap setting",
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Publish; `non_production` means the environment check was skipped.
    Run { non_production: bool },
    Skip(SkipReason),
}

/// Publish only production builds with sourcemaps, unless the environment
/// check is explicitly skipped.
pub fn evaluate(build: &BuildContext, skip_environment_check: bool) -> GateDecision {
    if build.ssr {
        return GateDecision::Skip(SkipReason::SsrBuild);
    }
    if !build.production && !skip_environment_check {
        return GateDecision::Skip(SkipReason::NonProduction);
    }
    if !build.sourcemaps {
        return GateDecision::Skip(SkipReason::NoSourcemaps);
    }
    GateDecision::Run {
        non_production: !build.production,
    }
}
