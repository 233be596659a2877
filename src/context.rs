//! Context labels for failures.
//!
//! A label names the logical operation in progress ("building qemu",
//! "installing sysroot"). Labels are attached to a failure only as it
//! propagates out of the labelled scope; a scope that succeeds leaves nothing
//! behind.
//!
//! Labels ride on anyhow's own context layering, so the wrapped failure stays
//! where it was: `err.downcast_ref::<io::Error>()` still finds it, and its
//! message and sources still follow in `err.chain()`. All labels of one
//! failure share a single layer, [`ContextFrames`].

use std::fmt;

/// The labels of the scopes a failure escaped from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextFrames {
    /// Outermost first, most specific last.
    labels: Vec<String>,
    /// Length of the error chain underneath this layer.
    below: usize,
}

impl ContextFrames {
    /// Context labels, outermost first.
    pub fn frames(&self) -> &[String] {
        &self.labels
    }

    /// The most specific label.
    pub fn top(&self) -> Option<&str> {
        self.labels.last().map(String::as_str)
    }
}

impl fmt::Display for ContextFrames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.top().unwrap_or_default())
    }
}

/// Record that `err` escaped a scope labelled `description`.
fn wrap(mut err: anyhow::Error, description: String) -> anyhow::Error {
    if let Some(frames) = err.downcast_mut::<ContextFrames>() {
        frames.labels.insert(0, description);
        return err;
    }
    let below = err.chain().count();
    err.context(ContextFrames {
        labels: vec![description],
        below,
    })
}

/// Run `f` under the label `description`.
///
/// On success the label is discarded. On failure it is added to the error,
/// which is otherwise returned untouched.
pub fn with_context<T, F>(description: impl Into<String>, f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    f().map_err(|err| wrap(err, description.into()))
}

/// The context frames attached to `err`, if any.
pub fn context_frames(err: &anyhow::Error) -> Option<&ContextFrames> {
    err.downcast_ref::<ContextFrames>()
}

/// The most specific context label attached to `err`.
pub fn context_of(err: &anyhow::Error) -> Option<&str> {
    context_frames(err).and_then(ContextFrames::top)
}

/// `err` and its causes joined by `": "`, without the context labels.
///
/// Same shape as `{:#}`; reporters print the label separately.
pub fn failure_message(err: &anyhow::Error) -> String {
    let total = err.chain().count();
    let skip = context_frames(err).and_then(|frames| total.checked_sub(frames.below + 1));
    err.chain()
        .enumerate()
        .filter(|(i, _)| Some(*i) != skip)
        .map(|(_, cause)| cause.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}

/// Attach a context label at a `?` site.
pub trait ResultExt<T> {
    fn in_context(self, description: impl Into<String>) -> anyhow::Result<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn in_context(self, description: impl Into<String>) -> anyhow::Result<T> {
        self.map_err(|err| wrap(err.into(), description.into()))
    }
}
