//! Harness configuration
//!
//! Everything the run needs is resolved once, up front, into an immutable [`HarnessConfig`] that is passed by
//! reference to discovery, execution and reporting. No later stage looks at the working directory or the
//! environment on its own.
//!
//! Default locations are derived from the Vyn repository root, which is found by walking up from a start
//! directory until one contains both `CMakeLists.txt` and `src/tests.cpp`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use crate::runner::evaluator::VerdictPolicy;

/// Default fixture selection pattern.
pub const DEFAULT_PATTERN: &str = "*.vyn";

/// Files whose joint presence marks the repository root.
const ROOT_MARKERS: [&str; 2] = ["CMakeLists.txt", "src/tests.cpp"];

/// Errors that stop the harness before any fixture runs.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("could not find the Vyn repository root above {}", start.display())]
    #[diagnostic(
        code(vyn_harness::config::repo_root),
        help("run from inside the repository, or pass both --compiler and --test-dir")
    )]
    RepoRootNotFound { start: PathBuf },

    #[error("cannot find Vyn executable at {}", path.display())]
    #[diagnostic(
        code(vyn_harness::config::compiler),
        help("build Vyn or specify the executable with --compiler")
    )]
    CompilerNotFound { path: PathBuf },

    #[error("test directory {} doesn't exist", path.display())]
    #[diagnostic(code(vyn_harness::config::test_dir), help("pass an existing directory with --test-dir"))]
    FixtureDirNotFound { path: PathBuf },
}

/// Optional values supplied by the operator. `None` means "use the default".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub compiler: Option<PathBuf>,
    pub fixture_dir: Option<PathBuf>,
    pub pattern: Option<String>,
    pub category: Option<String>,
    pub filter: Option<String>,
    pub policy: Option<VerdictPolicy>,
    pub jobs: Option<usize>,
    pub timeout: Option<Duration>,
    pub stop_on_fail: bool,
    pub verbosity: u8,
}

/// Resolved, validated harness configuration.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Repository root, when one was found.
    pub repo_root: Option<PathBuf>,
    /// Compiler executable under test
    pub compiler: PathBuf,
    /// Directory searched for fixtures
    pub fixture_dir: PathBuf,
    /// Glob matched against file names anywhere below `fixture_dir`
    pub pattern: String,
    /// Only run fixtures tagged with this category
    pub category: Option<String>,
    /// Only run fixtures whose name or description contains this text (case-insensitive)
    pub filter: Option<String>,
    pub policy: VerdictPolicy,
    /// Worker threads; 1 runs fixtures strictly in sequence
    pub jobs: usize,
    /// Kill the compiler after this long. `None` waits forever.
    pub timeout: Option<Duration>,
    pub stop_on_fail: bool,
    pub verbosity: u8,
}

impl HarnessConfig {
    /// Configuration with explicit paths and default settings.
    pub fn new(compiler: impl Into<PathBuf>, fixture_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: None,
            compiler: compiler.into(),
            fixture_dir: fixture_dir.into(),
            pattern: DEFAULT_PATTERN.to_string(),
            category: None,
            filter: None,
            policy: VerdictPolicy::default(),
            jobs: 1,
            timeout: None,
            stop_on_fail: false,
            verbosity: 0,
        }
    }

    /// Resolve defaults against the repository root found above `start`, then validate.
    pub fn resolve(overrides: ConfigOverrides, start: &Path) -> Result<Self, ConfigError> {
        let repo_root = find_repo_root(start);

        let root = || {
            repo_root.clone().ok_or_else(|| ConfigError::RepoRootNotFound {
                start: start.to_path_buf(),
            })
        };
        let compiler = match overrides.compiler {
            Some(path) => path,
            None => default_compiler(&root()?),
        };
        let fixture_dir = match overrides.fixture_dir {
            Some(path) => path,
            None => default_fixture_dir(&root()?),
        };

        let config = Self {
            repo_root,
            compiler,
            fixture_dir,
            pattern: overrides.pattern.unwrap_or_else(|| DEFAULT_PATTERN.to_string()),
            category: overrides.category.filter(|c| !c.is_empty()),
            filter: overrides.filter.filter(|f| !f.is_empty()),
            policy: overrides.policy.unwrap_or_default(),
            jobs: overrides.jobs.unwrap_or(1).max(1),
            timeout: overrides.timeout,
            stop_on_fail: overrides.stop_on_fail,
            verbosity: overrides.verbosity,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the compiler and fixture directory exist.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.compiler.is_file() {
            return Err(ConfigError::CompilerNotFound {
                path: self.compiler.clone(),
            });
        }
        if !self.fixture_dir.is_dir() {
            return Err(ConfigError::FixtureDirNotFound {
                path: self.fixture_dir.clone(),
            });
        }
        Ok(())
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_policy(mut self, policy: VerdictPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_stop_on_fail(mut self, stop: bool) -> Self {
        self.stop_on_fail = stop;
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }
}

/// `<root>/build/vyn`
pub fn default_compiler(root: &Path) -> PathBuf {
    root.join("build").join("vyn")
}

/// `<root>/test/units`
pub fn default_fixture_dir(root: &Path) -> PathBuf {
    root.join("test").join("units")
}

/// Walk up from `start` to the first directory holding every root marker.
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| ROOT_MARKERS.iter().all(|marker| dir.join(marker).exists()))
        .map(Path::to_path_buf)
}
