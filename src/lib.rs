//! Operational runtime for build-orchestration command-line tools
//!
//! Provides the pieces every subcommand of a build tool leans on:
//!
//! - **config**: runtime mode flags (`pretend`, `verbose`, `quiet`, `force`)
//!   and the one process-wide slot they are installed into at startup
//! - **context**: labels such as "building qemu" attached to failures as they
//!   propagate, so the final report says where things went wrong
//! - **output**: status/warning/error/fatal reporting with dry-run semantics
//!   and yes/no prompts
//! - **connectivity**: a cached check for a working internet connection
//! - **threads**: background threads that are always joined before their
//!   scope ends
//! - **platform** / **host**: OS detection, install hints, CPU and port helpers
//!
//! # Example
//!
//! ```no_run
//! use buildrt::{Config, FatalOptions, Reporter, context};
//!
//! let config = buildrt::config::init_global_config(Config::new().pretend(true), false)?;
//! let reporter = Reporter::stdio();
//!
//! let result = context::with_context("building sysroot", || -> anyhow::Result<()> {
//!     reporter.status("Configuring sysroot");
//!     anyhow::bail!("compiler not found")
//! });
//! if let Err(err) = result {
//!     // Pretend mode: reported as a potential failure, the run goes on.
//!     reporter.report_failure(&err, FatalOptions::for_config(&config));
//! }
//! # Ok::<(), buildrt::UsageError>(())
//! ```

pub mod config;
pub mod connectivity;
pub mod context;
pub mod error;
pub mod host;
pub mod output;
pub mod platform;
pub mod strings;
pub mod threads;

pub use config::{Config, ConfigState, GlobalConfig};
pub use connectivity::{ConnectivityProbe, have_working_internet_connection};
pub use context::{ContextFrames, ResultExt, with_context};
pub use error::{ProbeError, UsageError};
pub use output::{FatalOptions, Message, Reporter};
pub use platform::{InstallInstructions, OsInfo, PackageNames};
pub use threads::{JoinGuard, Launch, ThreadJoiner};
