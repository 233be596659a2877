//! Facts about the machine the tool is running on.

use crate::output::Reporter;
use crate::platform::OsInfo;
use std::io;
use std::net::{Ipv4Addr, TcpListener};
use std::path::Path;

/// Set by the CI job definitions; only its presence matters.
pub const JENKINS_ENV_VAR: &str = "BUILDRT_JENKINS_BUILD";

/// Whether we are running inside a Jenkins job.
pub fn is_jenkins_build() -> bool {
    std::env::var_os(JENKINS_ENV_VAR).is_some()
}

/// Parallel jobs to use for make-style builds.
///
/// Shared build machines with many cores only get half of them; `-j` on the
/// command line still overrides this.
pub fn default_make_jobs_count() -> usize {
    jobs_for_cpus(num_cpus::get())
}

fn jobs_for_cpus(cpus: usize) -> usize {
    if cpus > 24 { cpus / 2 } else { cpus }
}

/// A bound listener and the port it holds.
#[derive(Debug)]
pub struct SocketAndPort {
    pub listener: TcpListener,
    pub port: u16,
}

/// Reserve a local TCP port, preferring `preferred` when it is free.
pub fn find_free_port(reporter: &Reporter, preferred: Option<u16>) -> io::Result<SocketAndPort> {
    if let Some(port) = preferred {
        match TcpListener::bind((Ipv4Addr::LOCALHOST, port)) {
            Ok(listener) => {
                let port = listener.local_addr()?.port();
                return Ok(SocketAndPort { listener, port });
            }
            Err(e) => {
                if e.kind() != io::ErrorKind::AddrInUse {
                    reporter.warning(
                        format!(
                            "Got unexpected error when checking whether port {port} is free: {e}"
                        ),
                        None,
                    );
                }
                reporter.status(format!(
                    "Port {port} is not available, falling back to using a random port"
                ));
            }
        }
    }
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    let port = listener.local_addr()?.port();
    Ok(SocketAndPort { listener, port })
}

/// Whether file names in `dir` are case sensitive.
///
/// A directory that does not exist is assumed to follow the platform
/// default: insensitive on macOS, sensitive elsewhere.
pub fn is_case_sensitive_dir(dir: &Path, os: &OsInfo) -> io::Result<bool> {
    if !dir.exists() {
        return Ok(!os.is_mac());
    }
    let upper = dir.join("TestDirCaseSensitive");
    let lower = dir.join("testdircasesensitive");
    if upper.exists() {
        std::fs::remove_dir(&upper)?;
    }
    if lower.exists() {
        std::fs::remove_dir(&lower)?;
    }

    std::fs::create_dir(&upper)?;
    if lower.exists() {
        // Both names resolve to the directory we just made.
        std::fs::remove_dir(&lower)?;
        return Ok(false);
    }
    std::fs::remove_dir(&upper)?;
    Ok(true)
}
