//! buildrt - host checks and diagnostics for build orchestration
//!
//! Usage:
//!   buildrt doctor                 Inspect the host in parallel
//!   buildrt net                    Check for a working internet connection
//!   buildrt confirm <prompt>       Ask a yes/no question
//!   buildrt install-hint <name>    Explain how to install a missing tool
//!   buildrt free-port              Find a free local TCP port
//!   buildrt fail <message>         Report a fatal error

use anyhow::{Context, Result};
use buildrt::config::file::ConfigFile;
use buildrt::config::{global_config, init_global_config};
use buildrt::{
    Config, FatalOptions, Message, OsInfo, PackageNames, Reporter, ThreadJoiner, host,
    have_working_internet_connection, with_context,
};
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, mpsc};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "buildrt")]
#[command(about = "Host checks and diagnostics for build orchestration")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show what would happen without doing it
    #[arg(short, long, global = true)]
    pretend: bool,

    /// Print debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Answer every prompt without asking
    #[arg(short, long, global = true)]
    force: bool,

    /// Assume a working internet connection without checking
    #[arg(long, global = true)]
    presume_connectivity: bool,

    /// Read defaults from this file instead of the XDG locations
    #[arg(long, global = true, env = "BUILDRT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the host: connectivity, platform, CPUs
    Doctor,

    /// Check for a working internet connection (exit 1 if there is none)
    Net,

    /// Ask a yes/no question (exit 1 for no)
    Confirm {
        prompt: String,

        /// Treat an empty reply as yes
        #[arg(long)]
        default_yes: bool,

        /// Answer given in pretend or force mode
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        force_answer: bool,
    },

    /// Print install instructions for a missing tool or library
    InstallHint {
        name: String,

        /// The dependency is a library
        #[arg(long)]
        lib: bool,

        /// Package name to use instead of a guess
        #[arg(long)]
        package: Option<String>,

        /// buildrt target that installs it locally
        #[arg(long)]
        target: Option<String>,

        /// Another way to get it
        #[arg(long)]
        alternative: Option<String>,
    },

    /// Find a free local TCP port
    FreePort {
        /// Port to try first
        #[arg(long)]
        preferred: Option<u16>,
    },

    /// Report a fatal error through the normal fatal path
    Fail {
        #[arg(required = true)]
        message: Vec<String>,

        /// Operation the error happened in
        #[arg(long)]
        context: Option<String>,

        /// Suggested fix
        #[arg(long)]
        fixit: Option<String>,

        #[arg(long, default_value_t = buildrt::output::DEFAULT_EXIT_CODE)]
        exit_code: i32,

        /// Exit even when pretending
        #[arg(long)]
        fatal_when_pretending: bool,

        /// Separator between message words
        #[arg(long, default_value = " ")]
        sep: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let reporter = Arc::new(Reporter::stdio());

    match run(cli, &reporter) {
        Ok(code) => code,
        Err(err) => {
            let pretend = global_config().pretend().unwrap_or(false);
            reporter.report_failure(&err, FatalOptions::new(pretend));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, reporter: &Arc<Reporter>) -> Result<ExitCode> {
    let file = match &cli.config {
        Some(path) => ConfigFile::read(path)?,
        None => ConfigFile::load()?,
    };
    let config = file.apply_to(
        Config::new()
            .pretend(cli.pretend)
            .verbose(cli.verbose)
            .quiet(cli.quiet)
            .force(cli.force)
            .presume_connectivity(cli.presume_connectivity),
    );
    init_tracing(&config);
    let config = init_global_config(config, false)?;

    match cli.command {
        Commands::Doctor => with_context("inspecting host", || doctor(&config, reporter)),

        Commands::Net => with_context("checking internet connection", || {
            if have_working_internet_connection(&config, reporter) {
                reporter.status("Internet connection: reachable");
                Ok(ExitCode::SUCCESS)
            } else {
                reporter.warning(
                    "No working internet connection",
                    Some("pass --presume-connectivity to skip this check"),
                );
                Ok(ExitCode::FAILURE)
            }
        }),

        Commands::Confirm {
            prompt,
            default_yes,
            force_answer,
        } => {
            let yes = reporter
                .query_yes_no(&config, &prompt, default_yes, force_answer)
                .context("Failed to read answer")?;
            Ok(if yes {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Commands::InstallHint {
            name,
            lib,
            package,
            target,
            alternative,
        } => {
            let packages = PackageNames {
                default: package,
                target,
                alternative,
                ..PackageNames::default()
            };
            let hint = OsInfo::detect()
                .install_instructions(&name, lib, &packages)
                .fixit_hint();
            reporter.status(hint);
            Ok(ExitCode::SUCCESS)
        }

        Commands::FreePort { preferred } => {
            let found = host::find_free_port(reporter, preferred)
                .context("Failed to bind a local port")?;
            reporter.status(found.port.to_string());
            Ok(ExitCode::SUCCESS)
        }

        Commands::Fail {
            message,
            context,
            fixit,
            exit_code,
            fatal_when_pretending,
            sep,
        } => {
            let options = FatalOptions::for_config(&config)
                .fatal_when_pretending(fatal_when_pretending)
                .exit_code(exit_code);
            reporter.fatal(
                Message::new(message).sep(sep),
                context.as_deref(),
                fixit.as_deref(),
                options,
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run the host checks on background threads and print what they found.
fn doctor(config: &Arc<Config>, reporter: &Arc<Reporter>) -> Result<ExitCode> {
    let (tx, rx) = mpsc::channel::<(usize, String)>();
    let mut joiner = ThreadJoiner::new();

    {
        let config = Arc::clone(config);
        let reporter = Arc::clone(reporter);
        let tx = tx.clone();
        joiner += ThreadJoiner::single("connectivity", move || {
            let reachable = have_working_internet_connection(&config, &reporter);
            let state = if reachable { "reachable" } else { "unreachable" };
            let _ = tx.send((0, format!("Internet connection: {state}")));
        });
    }

    {
        let tx = tx.clone();
        joiner += ThreadJoiner::single("platform", move || {
            let os = OsInfo::detect();
            let name = os
                .os_release
                .get("PRETTY_NAME")
                .map_or(std::env::consts::OS, String::as_str);
            let _ = tx.send((1, format!("Operating system: {name}")));
            let _ = tx.send((2, format!("Package manager: {}", os.package_manager(false))));
        });
    }

    {
        let pretend = config.pretend;
        joiner += ThreadJoiner::single("host", move || {
            let _ = tx.send((3, format!("Make jobs: {}", host::default_make_jobs_count())));
            let _ = tx.send((4, format!("Jenkins build: {}", host::is_jenkins_build())));
            let tmp = std::env::temp_dir();
            let case = if pretend {
                "not checked (pretend)".to_owned()
            } else {
                match host::is_case_sensitive_dir(&tmp, OsInfo::detect()) {
                    Ok(true) => "case sensitive".to_owned(),
                    Ok(false) => "case insensitive".to_owned(),
                    Err(e) => format!("unknown ({e})"),
                }
            };
            let _ = tx.send((5, format!("{}: {case}", tmp.display())));
        });
    }

    joiner
        .run(reporter, || reporter.status("Inspecting host..."))
        .context("Failed to start host checks")?;

    let mut facts: Vec<(usize, String)> = rx.into_iter().collect();
    facts.sort();
    for (_, fact) in facts {
        reporter.status(fact);
    }
    Ok(ExitCode::SUCCESS)
}

fn init_tracing(config: &Config) {
    let default_level = if config.verbose {
        "debug"
    } else if config.quiet {
        "error"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_env("BUILDRT_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}
