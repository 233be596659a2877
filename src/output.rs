//! Leveled console reporting
//!
//! `status` goes to stdout, everything diagnostic goes to stderr. Each line is
//! flushed as soon as it is written. Fatal errors honour pretend mode: in a
//! dry run they are reported as "potential" failures and the run continues.

use crate::config::Config;
use owo_colors::{AnsiColors, OwoColorize};
use std::backtrace::Backtrace;
use std::fmt;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Exit code used by the fatal path unless the caller picks another.
pub const DEFAULT_EXIT_CODE: i32 = 3;

/// Called by the fatal path to end the process.
pub type ExitHook = fn(i32) -> !;

/// Message body: parts joined by a separator (a space unless overridden).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    parts: Vec<String>,
    sep: String,
}

impl Message {
    pub fn new<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: fmt::Display,
    {
        Self {
            parts: parts.into_iter().map(|p| p.to_string()).collect(),
            sep: " ".to_owned(),
        }
    }

    /// Join the parts with `sep` instead of a space.
    pub fn sep(mut self, sep: impl Into<String>) -> Self {
        self.sep = sep.into();
        self
    }

    /// Render after `prefix`. An empty separator still leaves one space
    /// between the prefix and the first part.
    fn with_prefix(&self, prefix: &str) -> String {
        let body = self.parts.join(&self.sep);
        if self.sep.is_empty() {
            format!("{prefix} {body}")
        } else {
            format!("{prefix}{}{body}", self.sep)
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join(&self.sep))
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Self::new([s])
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Self::new([s])
    }
}

impl From<&String> for Message {
    fn from(s: &String) -> Self {
        Self::new([s])
    }
}

/// How the fatal path behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatalOptions {
    pub pretend: bool,
    /// Terminate even in pretend mode, after printing the call stack
    pub fatal_when_pretending: bool,
    pub exit_code: i32,
}

impl FatalOptions {
    pub fn new(pretend: bool) -> Self {
        Self {
            pretend,
            fatal_when_pretending: false,
            exit_code: DEFAULT_EXIT_CODE,
        }
    }

    /// Options matching the pretend flag of `config`.
    pub fn for_config(config: &Config) -> Self {
        Self::new(config.pretend)
    }

    pub fn fatal_when_pretending(mut self, yes: bool) -> Self {
        self.fatal_when_pretending = yes;
        self
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }
}

type Stream = Mutex<Box<dyn Write + Send>>;

/// Console reporter. Shareable across threads.
pub struct Reporter {
    stdout: Stream,
    stderr: Stream,
    input: Mutex<Option<Box<dyn BufRead + Send>>>,
    color: bool,
    exit: ExitHook,
}

impl Reporter {
    /// Reporter over arbitrary streams, with no interactive input.
    pub fn new(stdout: impl Write + Send + 'static, stderr: impl Write + Send + 'static) -> Self {
        Self {
            stdout: Mutex::new(Box::new(stdout)),
            stderr: Mutex::new(Box::new(stderr)),
            input: Mutex::new(None),
            color: false,
            exit: std::process::exit,
        }
    }

    /// Reporter over the process's standard streams.
    ///
    /// Colour is enabled when stderr is a terminal; prompts are only
    /// interactive when stdin is one.
    pub fn stdio() -> Self {
        let stdin = io::stdin();
        let interactive = stdin.is_terminal();
        let reporter = Self::new(io::stdout(), io::stderr()).with_color(io::stderr().is_terminal());
        if interactive {
            reporter.with_input(BufReader::new(stdin))
        } else {
            reporter
        }
    }

    /// Answer prompts from `input`.
    pub fn with_input(self, input: impl BufRead + Send + 'static) -> Self {
        Self {
            input: Mutex::new(Some(Box::new(input))),
            ..self
        }
    }

    pub fn with_color(self, color: bool) -> Self {
        Self { color, ..self }
    }

    /// Replace process termination on the fatal path.
    pub fn with_exit_hook(self, exit: ExitHook) -> Self {
        Self { exit, ..self }
    }

    fn paint(&self, text: &str, colour: AnsiColors) -> String {
        if self.color {
            text.color(colour).to_string()
        } else {
            text.to_owned()
        }
    }

    fn write_line(stream: &Stream, line: &str) {
        let mut stream = stream.lock().unwrap_or_else(PoisonError::into_inner);
        // Console write failures (closed pipe) are not worth dying over.
        let _ = writeln!(stream, "{line}");
        let _ = stream.flush();
    }

    fn out(&self, line: &str) {
        Self::write_line(&self.stdout, line);
    }

    fn err(&self, line: &str) {
        Self::write_line(&self.stderr, line);
    }

    /// Informational progress line (cyan, stdout).
    pub fn status(&self, message: impl Into<Message>) {
        let message: Message = message.into();
        self.out(&self.paint(&message.to_string(), AnsiColors::Cyan));
    }

    /// "Possible solution: ..." line (blue, stderr).
    pub fn fixit(&self, hint: impl Into<Message>) {
        let hint: Message = hint.into();
        let line = hint.with_prefix("Possible solution:");
        self.err(&self.paint(&line, AnsiColors::Blue));
    }

    fn maybe_fixit(&self, hint: Option<&str>) {
        if let Some(hint) = hint.filter(|h| !h.is_empty()) {
            self.fixit(hint);
        }
    }

    /// Warning line (magenta, stderr), optionally followed by a fixit hint.
    pub fn warning(&self, message: impl Into<Message>, fixit_hint: Option<&str>) {
        let message: Message = message.into();
        let line = message.with_prefix("Warning:");
        self.err(&self.paint(&line, AnsiColors::Magenta));
        self.maybe_fixit(fixit_hint);
    }

    fn error_line(&self, severity: &str, context: Option<&str>, message: &Message) -> String {
        let prefix = match context {
            Some(ctx) => format!("{severity} {ctx}:"),
            None => format!("{severity}:"),
        };
        self.paint(&message.with_prefix(&prefix), AnsiColors::Red)
    }

    /// Error line (red, stderr) labelled with `context` when given.
    pub fn error(
        &self,
        message: impl Into<Message>,
        context: Option<&str>,
        fixit_hint: Option<&str>,
    ) {
        let message: Message = message.into();
        self.err(&self.error_line("Error", context, &message));
        self.maybe_fixit(fixit_hint);
    }

    /// Report a fatal error.
    ///
    /// Outside pretend mode this never returns. In pretend mode it returns
    /// unless `fatal_when_pretending` is set, in which case the call stack is
    /// printed before exiting.
    pub fn fatal(
        &self,
        message: impl Into<Message>,
        context: Option<&str>,
        fixit_hint: Option<&str>,
        options: FatalOptions,
    ) {
        let message: Message = message.into();
        if options.pretend {
            self.err(&self.error_line("Potential fatal error", context, &message));
            self.maybe_fixit(fixit_hint);
            if options.fatal_when_pretending {
                self.err(&Backtrace::force_capture().to_string());
                self.terminate(options.exit_code);
            }
            return;
        }
        self.err(&self.error_line("Fatal error", context, &message));
        self.maybe_fixit(fixit_hint);
        self.terminate(options.exit_code);
    }

    /// Report a propagated failure through the fatal path, labelled with its
    /// most specific context.
    pub fn report_failure(&self, err: &anyhow::Error, options: FatalOptions) {
        let context = crate::context::context_of(err);
        self.fatal(crate::context::failure_message(err), context, None, options);
    }

    fn terminate(&self, code: i32) -> ! {
        tracing::debug!(code, "terminating");
        (self.exit)(code)
    }

    /// Ask a yes/no question.
    ///
    /// Pretend and force modes answer `force_result` without reading. With no
    /// interactive input `default_result` is returned without prompting.
    pub fn query_yes_no(
        &self,
        config: &Config,
        prompt: &str,
        default_result: bool,
        force_result: bool,
    ) -> io::Result<bool> {
        let choices = if default_result { " [Y]/n " } else { " y/[N] " };

        if config.pretend || config.force {
            let answer = if force_result { "y" } else { "n" };
            self.out(&format!(
                "{prompt}{choices}{}",
                self.paint(answer, AnsiColors::Green)
            ));
            return Ok(force_result);
        }

        let mut input = self.input.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(reader) = input.as_mut() else {
            return Ok(default_result);
        };

        {
            let mut out = self.stdout.lock().unwrap_or_else(PoisonError::into_inner);
            write!(out, "{prompt}{choices}")?;
            out.flush()?;
        }

        let mut reply = String::new();
        if reader.read_line(&mut reply)? == 0 {
            return Ok(default_result);
        }
        Ok(parse_reply(reply.trim(), default_result))
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

/// Interpret a reply: with a yes default anything not starting with "n" is
/// yes; with a no default only replies starting with "y" are.
///
/// Case is ignored in both directions, so "No" declines a yes default just
/// as "Yes" accepts a no default.
pub fn parse_reply(reply: &str, default_result: bool) -> bool {
    let reply = reply.to_lowercase();
    if default_result {
        !reply.starts_with('n')
    } else {
        reply.starts_with('y')
    }
}

/// In-memory sink for capturing reporter output.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer(Arc<Mutex<Vec<u8>>>);

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
