//! Cached internet reachability probe.
//!
//! Connects straight to a public resolver by IP. A DNS lookup is deliberately
//! not involved since DNS itself may be what is broken.

use crate::config::{Config, ConnectivityCheck};
use crate::error::ProbeError;
use crate::output::{FatalOptions, Reporter};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream};
use std::time::{Duration, Instant};

/// Google public DNS, TCP port 53.
pub const DEFAULT_PROBE_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(8, 8, 8, 8), 53));
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
/// How long a probe result is trusted.
pub const CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityProbe {
    pub addr: SocketAddr,
    pub timeout: Duration,
    pub ttl: Duration,
}

impl Default for ConnectivityProbe {
    fn default() -> Self {
        Self {
            addr: DEFAULT_PROBE_ADDR,
            timeout: DEFAULT_TIMEOUT,
            ttl: CACHE_TTL,
        }
    }
}

impl ConnectivityProbe {
    /// Probe a different address (tests, mirrors).
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            addr,
            ..Self::default()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether the internet is reachable, reusing a recent answer.
    pub fn check(&self, config: &Config, reporter: &Reporter) -> bool {
        self.check_at(config, reporter, Instant::now())
    }

    /// As [`check`](Self::check), with `now` as the current time.
    pub fn check_at(&self, config: &Config, reporter: &Reporter, now: Instant) -> bool {
        if config.test_mode || config.presume_connectivity {
            return true;
        }

        if let Some(last) = config.last_connectivity_check()
            && now.saturating_duration_since(last.checked_at) < self.ttl
        {
            tracing::debug!(reachable = last.reachable, "using cached connectivity result");
            return last.reachable;
        }

        let reachable = match self.connect() {
            Ok(()) => true,
            Err(ProbeError::Unreachable(e)) => {
                tracing::debug!(addr = %self.addr, error = %e, "connectivity probe failed");
                false
            }
            Err(ProbeError::Unexpected(reason)) => {
                let message =
                    format!("Something went wrong while checking for internet connection: {reason}");
                reporter.fatal(message, None, None, FatalOptions::for_config(config));
                false
            }
        };

        config.record_connectivity_check(ConnectivityCheck {
            checked_at: now,
            reachable,
        });
        reachable
    }

    fn connect(&self) -> Result<(), ProbeError> {
        if self.timeout.is_zero() {
            return Err(ProbeError::Unexpected("probe timeout must be non-zero"));
        }
        // The stream is closed when it goes out of scope, whatever happened.
        let _stream = TcpStream::connect_timeout(&self.addr, self.timeout)?;
        tracing::debug!(addr = %self.addr, "connectivity probe succeeded");
        Ok(())
    }
}

/// Probe the default resolver.
pub fn have_working_internet_connection(config: &Config, reporter: &Reporter) -> bool {
    ConnectivityProbe::default().check(config, reporter)
}
