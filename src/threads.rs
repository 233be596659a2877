//! Scoped background threads.
//!
//! A [`ThreadJoiner`] collects named thread launches without starting them.
//! [`ThreadJoiner::start`] spawns them in order and returns a [`JoinGuard`];
//! dropping the guard joins every thread in the same order, whether the scope
//! ended normally, with an error, or by unwinding.

use crate::output::{Message, Reporter};
use std::fmt;
use std::io;
use std::ops::{Add, AddAssign};
use std::thread::{self, JoinHandle};

type Body = Box<dyn FnOnce() + Send + 'static>;

/// A thread that has not been started yet.
pub struct Launch {
    name: String,
    body: Body,
}

impl Launch {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            name: name.into(),
            body: Box::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Launch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Launch").field("name", &self.name).finish()
    }
}

/// Ordered set of thread launches started and joined together.
#[derive(Debug, Default)]
pub struct ThreadJoiner {
    launches: Vec<Launch>,
}

impl ThreadJoiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A joiner holding one thread.
    pub fn single<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            launches: vec![Launch::new(name, body)],
        }
    }

    pub fn push(&mut self, launch: Launch) {
        self.launches.push(launch);
    }

    /// Thread names in start order.
    pub fn names(&self) -> Vec<&str> {
        self.launches.iter().map(Launch::name).collect()
    }

    pub fn len(&self) -> usize {
        self.launches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.launches.is_empty()
    }

    /// Spawn every thread in order.
    ///
    /// If spawning fails part way, the threads already running are joined
    /// before the error is returned.
    pub fn start(self, reporter: &Reporter) -> io::Result<JoinGuard<'_>> {
        let mut guard = JoinGuard {
            reporter,
            running: Vec::with_capacity(self.launches.len()),
        };
        for launch in self.launches {
            tracing::debug!(thread = %launch.name, "starting thread");
            let handle = thread::Builder::new()
                .name(launch.name.clone())
                .spawn(launch.body)?;
            guard.running.push((launch.name, handle));
        }
        Ok(guard)
    }

    /// Run `body` with every thread started; all of them are joined before
    /// this returns, even if `body` fails or panics.
    pub fn run<R>(self, reporter: &Reporter, body: impl FnOnce() -> R) -> io::Result<R> {
        let _guard = self.start(reporter)?;
        Ok(body())
    }
}

impl From<Launch> for ThreadJoiner {
    fn from(launch: Launch) -> Self {
        Self {
            launches: vec![launch],
        }
    }
}

impl From<Vec<Launch>> for ThreadJoiner {
    fn from(launches: Vec<Launch>) -> Self {
        Self { launches }
    }
}

impl FromIterator<Launch> for ThreadJoiner {
    fn from_iter<I: IntoIterator<Item = Launch>>(iter: I) -> Self {
        Self {
            launches: iter.into_iter().collect(),
        }
    }
}

impl Add for ThreadJoiner {
    type Output = ThreadJoiner;

    fn add(mut self, other: ThreadJoiner) -> ThreadJoiner {
        self += other;
        self
    }
}

impl AddAssign for ThreadJoiner {
    fn add_assign(&mut self, other: ThreadJoiner) {
        self.launches.extend(other.launches);
    }
}

/// Running threads; joined in start order on drop.
pub struct JoinGuard<'a> {
    reporter: &'a Reporter,
    running: Vec<(String, JoinHandle<()>)>,
}

impl JoinGuard<'_> {
    /// Names of the started threads, in start order.
    pub fn names(&self) -> Vec<&str> {
        self.running.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl fmt::Debug for JoinGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinGuard")
            .field("running", &self.names())
            .finish()
    }
}

impl Drop for JoinGuard<'_> {
    fn drop(&mut self) {
        for (name, handle) in self.running.drain(..) {
            if !handle.is_finished() {
                self.reporter.status(
                    Message::new(["Waiting for '", name.as_str(), "' to complete"]).sep(""),
                );
            }
            if handle.join().is_err() {
                tracing::warn!(thread = %name, "thread panicked");
                self.reporter
                    .warning(format!("Background thread '{name}' panicked"), None);
            } else {
                tracing::debug!(thread = %name, "joined thread");
            }
        }
    }
}
