#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    str::FromStr,
    sync::{Arc, Mutex, OnceLock},
};

use bon::Builder;
use serde::{Deserialize, Serialize};
use tracing::Level;

/// Operations a single test-case invocation may perform before it is halted.
pub const DEFAULT_MAX_OPERATIONS: u64 = 2_000_000;

/// Nested JavaScript calls allowed before a stack overflow is reported.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 400;

/// Elements of one array or bytes of one string a submission may create.
pub const DEFAULT_MAX_ALLOCATION: usize = 4 * 1024 * 1024;

/// Stack reserved for the worker thread that executes submissions, in MiB.
pub const DEFAULT_STACK_SIZE_MB: usize = 32;

/// Module tokens that cannot be resolved in-process.
pub const DEFAULT_DENIED_MODULES: &[&str] = &[
    "@solana/web3.js",
    "@solana/spl-token",
    "@coral-xyz/anchor",
    "@metaplex",
    "node:",
    "require(",
];

/// What the structural validator does when no rule can be derived for a test
/// case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnderivablePolicy {
    /// Fail the case and say that nothing could be checked.
    #[default]
    Fail,
    /// Pass the case vacuously.
    Pass,
}

impl FromStr for UnderivablePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "pass" => Ok(Self::Pass),
            other => anyhow::bail!("Unknown underivable policy `{other}` (expected pass or fail)"),
        }
    }
}

/// Knobs shared by both backends.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Operation budget per test-case invocation.
    #[builder(default = DEFAULT_MAX_OPERATIONS)]
    max_operations: u64,
    /// Maximum JavaScript call depth.
    #[builder(default = DEFAULT_MAX_CALL_DEPTH)]
    max_call_depth: usize,
    /// Largest array length or string size a submission may create.
    #[builder(default = DEFAULT_MAX_ALLOCATION)]
    max_allocation: usize,
    /// Worker thread stack size in bytes.
    #[builder(default = DEFAULT_STACK_SIZE_MB * 1024 * 1024)]
    stack_size:     usize,
    /// Handling of test cases for which no structural rule exists.
    #[builder(default)]
    underivable:    UnderivablePolicy,
    /// Tokens that force escalation to structural validation.
    #[builder(default = default_denied_modules())]
    denied_modules: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EngineConfig {
    /// Operation budget per test-case invocation.
    pub fn max_operations(&self) -> u64 {
        self.max_operations
    }

    /// Maximum JavaScript call depth.
    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    /// Largest array length or string size a submission may create.
    pub fn max_allocation(&self) -> usize {
        self.max_allocation
    }

    /// Worker thread stack size in bytes.
    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    /// Handling of test cases for which no structural rule exists.
    pub fn underivable(&self) -> UnderivablePolicy {
        self.underivable
    }

    /// Tokens that force escalation to structural validation.
    pub fn denied_modules(&self) -> &[String] {
        &self.denied_modules
    }

    /// Reads overrides from the environment on top of the defaults.
    pub fn from_env() -> Self {
        let mut denied_modules = default_denied_modules();
        if let Ok(extra) = std::env::var("DOJO_DENIED_MODULES") {
            denied_modules.extend(
                extra
                    .split(',')
                    .map(str::trim)
                    .filter(|token| !token.is_empty())
                    .map(str::to_owned),
            );
        }

        let underivable = std::env::var("DOJO_UNDERIVABLE")
            .ok()
            .and_then(|value| match value.parse::<UnderivablePolicy>() {
                Ok(policy) => Some(policy),
                Err(err) => {
                    tracing::warn!("{err:#}; falling back to `fail`");
                    None
                }
            })
            .unwrap_or_default();

        Self {
            max_operations: read_env("DOJO_MAX_OPERATIONS", DEFAULT_MAX_OPERATIONS),
            max_call_depth: read_env("DOJO_MAX_CALL_DEPTH", DEFAULT_MAX_CALL_DEPTH),
            max_allocation: read_env("DOJO_MAX_ALLOCATION", DEFAULT_MAX_ALLOCATION),
            stack_size: read_env("DOJO_STACK_SIZE_MB", DEFAULT_STACK_SIZE_MB) * 1024 * 1024,
            underivable,
            denied_modules,
        }
    }

    /// Returns a copy with a different underivable policy.
    pub fn with_underivable(mut self, policy: UnderivablePolicy) -> Self {
        self.underivable = policy;
        self
    }
}

/// The default deny-list as owned strings.
fn default_denied_modules() -> Vec<String> {
    DEFAULT_DENIED_MODULES
        .iter()
        .map(|token| token.to_string())
        .collect()
}

/// Runtime configuration shared across the crate.
pub struct ConfigState {
    /// Engine limits and policies.
    engine:    EngineConfig,
    /// Verbosity for the CLI subscriber.
    log_level: Level,
}

impl ConfigState {
    /// Construct a new configuration instance from the environment.
    fn new() -> Self {
        let log_level = std::env::var("DOJO_LOG_LEVEL")
            .ok()
            .and_then(|value| value.trim().parse::<Level>().ok())
            .unwrap_or(Level::INFO);

        Self {
            engine: EngineConfig::from_env(),
            log_level,
        }
    }

    /// Returns the engine configuration.
    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    /// Returns the configured log level.
    pub fn log_level(&self) -> Level {
        self.log_level
    }
}

/// Shared configuration handle used throughout the crate.
#[derive(Clone)]
pub struct ConfigHandle(Arc<ConfigState>);

impl std::ops::Deref for ConfigHandle {
    type Target = ConfigState;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Global storage for the lazily constructed configuration state.
static CONFIG_SLOT: OnceLock<Mutex<Option<Arc<ConfigState>>>> = OnceLock::new();

/// Returns the mutex guarding the global configuration slot.
fn slot() -> &'static Mutex<Option<Arc<ConfigState>>> {
    CONFIG_SLOT.get_or_init(|| Mutex::new(None))
}

/// Returns the active configuration, initializing it on demand.
pub fn get() -> ConfigHandle {
    let mut guard = slot().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(cfg) = guard.as_ref() {
        return ConfigHandle(Arc::clone(cfg));
    }

    let cfg = Arc::new(ConfigState::new());
    *guard = Some(Arc::clone(&cfg));
    ConfigHandle(cfg)
}

/// Returns a clone of the configured engine settings.
pub fn engine() -> EngineConfig {
    get().engine().clone()
}

/// Returns the configured log level.
pub fn log_level() -> Level {
    get().log_level()
}

/// Parses an environment variable, falling back to `default` when parsing
/// fails or the variable is missing.
fn read_env<T: FromStr>(env: &str, default: T) -> T {
    std::env::var(env)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}
