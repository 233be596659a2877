//! Runtime configuration and the process-wide configuration slot.
//!
//! Components take a `&Config` explicitly. The only global is [`GlobalConfig`],
//! which the entry point fills once; reading it before then is a
//! [`UsageError::Uninitialized`] rather than a silent default.

pub mod file;

use crate::error::UsageError;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

/// Result of the most recent connectivity probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityCheck {
    pub checked_at: Instant,
    pub reachable: bool,
}

/// Runtime mode flags for one invocation of the tool.
#[derive(Debug, Default)]
pub struct Config {
    /// Report what would happen instead of doing it
    pub pretend: bool,
    pub verbose: bool,
    pub quiet: bool,
    /// Answer every confirmation prompt without asking
    pub force: bool,
    /// Skip the connectivity probe and assume the network works
    pub presume_connectivity: bool,
    pub test_mode: bool,
    connectivity: Mutex<Option<ConnectivityCheck>>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set pretend (dry-run) mode.
    pub fn pretend(mut self, pretend: bool) -> Self {
        self.pretend = pretend;
        self
    }

    /// Set verbose mode.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set quiet mode.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Set force mode.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn presume_connectivity(mut self, presume: bool) -> Self {
        self.presume_connectivity = presume;
        self
    }

    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    /// Check the invariants between flags.
    pub fn validate(&self) -> Result<(), UsageError> {
        if self.verbose && self.quiet {
            return Err(UsageError::MutuallyExclusive {
                first: "verbose",
                second: "quiet",
            });
        }
        Ok(())
    }

    /// Last recorded connectivity probe, if any.
    pub fn last_connectivity_check(&self) -> Option<ConnectivityCheck> {
        *self
            .connectivity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn record_connectivity_check(&self, check: ConnectivityCheck) {
        *self
            .connectivity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(check);
    }
}

/// Either no configuration yet, or the one installed by the entry point.
#[derive(Debug, Clone, Default)]
pub enum ConfigState {
    #[default]
    Uninitialized,
    Initialized(Arc<Config>),
}

impl ConfigState {
    /// The installed configuration.
    pub fn config(&self) -> Result<&Arc<Config>, UsageError> {
        match self {
            Self::Initialized(config) => Ok(config),
            Self::Uninitialized => Err(UsageError::Uninitialized),
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self, Self::Initialized(_))
    }

    pub fn pretend(&self) -> Result<bool, UsageError> {
        self.config().map(|c| c.pretend)
    }

    pub fn verbose(&self) -> Result<bool, UsageError> {
        self.config().map(|c| c.verbose)
    }

    pub fn quiet(&self) -> Result<bool, UsageError> {
        self.config().map(|c| c.quiet)
    }

    pub fn force(&self) -> Result<bool, UsageError> {
        self.config().map(|c| c.force)
    }

    pub fn presume_connectivity(&self) -> Result<bool, UsageError> {
        self.config().map(|c| c.presume_connectivity)
    }

    pub fn test_mode(&self) -> Result<bool, UsageError> {
        self.config().map(|c| c.test_mode)
    }
}

/// Single-writer, many-reader configuration slot.
#[derive(Debug)]
pub struct GlobalConfig {
    state: RwLock<ConfigState>,
}

impl GlobalConfig {
    pub const fn new() -> Self {
        Self {
            state: RwLock::new(ConfigState::Uninitialized),
        }
    }

    /// Install `config`. Only a test-mode call may replace an existing one.
    pub fn init(&self, config: Config, test_mode: bool) -> Result<Arc<Config>, UsageError> {
        let config = config.test_mode(test_mode);
        config.validate()?;

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.is_initialized() && !test_mode {
            return Err(UsageError::AlreadyInitialized);
        }
        let config = Arc::new(config);
        *state = ConfigState::Initialized(Arc::clone(&config));
        tracing::debug!(
            pretend = config.pretend,
            verbose = config.verbose,
            quiet = config.quiet,
            force = config.force,
            test_mode,
            "configuration initialized"
        );
        Ok(config)
    }

    /// Current state, initialized or not.
    pub fn get(&self) -> ConfigState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The installed configuration, or `UsageError::Uninitialized`.
    pub fn config(&self) -> Result<Arc<Config>, UsageError> {
        self.get().config().cloned()
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: GlobalConfig = GlobalConfig::new();

/// Install the process-wide configuration.
pub fn init_global_config(config: Config, test_mode: bool) -> Result<Arc<Config>, UsageError> {
    GLOBAL.init(config, test_mode)
}

/// The process-wide configuration state.
pub fn global_config() -> ConfigState {
    GLOBAL.get()
}
