//! Per-call execution context threaded through dispatch

use std::cell::{RefCell, RefMut};
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

use crate::command::Node;
use crate::dispatch::EXIT_USAGE;
use crate::flags::{FlagSet, FlagValue, FlagValues};
use crate::help;

/// Output and error streams shared by every context of one run
pub struct Streams {
    out: RefCell<Box<dyn Write>>,
    err: RefCell<Box<dyn Write>>,
}

impl Streams {
    pub fn new(out: impl Write + 'static, err: impl Write + 'static) -> Self {
        Self {
            out: RefCell::new(Box::new(out)),
            err: RefCell::new(Box::new(err)),
        }
    }

    /// The process's standard output and standard error
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }

    /// In-memory streams, returned with handles for reading them back
    pub fn buffered() -> (Self, Buffer, Buffer) {
        let out = Buffer::default();
        let err = Buffer::default();
        (Self::new(out.clone(), err.clone()), out, err)
    }

    pub(crate) fn write_out(&self, text: &str) {
        emit(&self.out, text);
    }

    pub(crate) fn write_err(&self, text: &str) {
        emit(&self.err, text);
    }
}

impl fmt::Debug for Streams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Streams").finish_non_exhaustive()
    }
}

/// Write a whole block at once. Failures are logged, not propagated: there
/// is nowhere left to report them.
fn emit(target: &RefCell<Box<dyn Write>>, text: &str) {
    let Ok(mut writer) = target.try_borrow_mut() else {
        tracing::warn!("output stream is already borrowed, dropping {} bytes", text.len());
        return;
    };
    if let Err(err) = writer
        .write_all(text.as_bytes())
        .and_then(|_| writer.flush())
    {
        tracing::warn!(error = %err, "failed to write output");
    }
}

/// Cloneable in-memory sink
#[derive(Debug, Clone, Default)]
pub struct Buffer(Rc<RefCell<Vec<u8>>>);

impl Buffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Values every context of a run shares
pub(crate) struct Shared<'a, S> {
    pub(crate) version: &'a str,
    pub(crate) scope: &'a S,
    pub(crate) streams: &'a Streams,
}

impl<S> Clone for Shared<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Shared<'_, S> {}

/// Everything a command sees while it runs: its full path, its parsed flags,
/// a usage printer bound to this command, the output streams and the scope
/// value the caller passed to [`Tree::run`](crate::Tree::run).
///
/// A fresh context is built for every command on the resolved path; child
/// contexts can read their ancestors through [`ExecutionContext::parent`].
pub struct ExecutionContext<'a, S = ()> {
    pub(crate) full_path: String,
    pub(crate) node: &'a Node<S>,
    pub(crate) flag_set: FlagSet,
    pub(crate) flags: FlagValues,
    pub(crate) parent: Option<&'a ExecutionContext<'a, S>>,
    pub(crate) shared: Shared<'a, S>,
}

impl<'a, S> ExecutionContext<'a, S> {
    pub(crate) fn new(
        full_path: String,
        node: &'a Node<S>,
        flag_set: FlagSet,
        parent: Option<&'a ExecutionContext<'a, S>>,
        shared: Shared<'a, S>,
    ) -> Self {
        Self {
            full_path,
            node,
            flag_set,
            flags: FlagValues::default(),
            parent,
            shared,
        }
    }

    /// Space-joined command names from the root to this command
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    /// This command's parsed flags
    pub fn flags(&self) -> &FlagValues {
        &self.flags
    }

    /// Look a flag up on this command, then on each ancestor in turn
    pub fn lookup_flag(&self, name: &str) -> Option<&FlagValue> {
        self.flags
            .get(name)
            .or_else(|| self.parent.and_then(|p| p.lookup_flag(name)))
    }

    pub fn parent(&self) -> Option<&'a ExecutionContext<'a, S>> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn version(&self) -> &'a str {
        self.shared.version
    }

    /// Caller-supplied scope (cancellation, timeouts, runtime handles).
    /// Passed through untouched.
    pub fn scope(&self) -> &'a S {
        self.shared.scope
    }

    /// Standard output of this run
    ///
    /// # Panics
    ///
    /// Panics if the stream is already borrowed.
    pub fn stdout(&self) -> RefMut<'a, Box<dyn Write>> {
        self.shared.streams.out.borrow_mut()
    }

    /// Standard error of this run
    ///
    /// # Panics
    ///
    /// Panics if the stream is already borrowed.
    pub fn stderr(&self) -> RefMut<'a, Box<dyn Write>> {
        self.shared.streams.err.borrow_mut()
    }

    /// Help text for this command
    pub fn help_text(&self) -> String {
        let version = self.is_root().then_some(self.shared.version);
        help::render(self.node, &self.flag_set, &self.full_path, version)
    }

    /// Print this command's help to the error stream
    pub fn usage(&self) {
        self.shared.streams.write_err(&self.help_text());
    }

    /// Print `msg`, a blank line and this command's help to the error
    /// stream. Returns the usage-error status, so leaves can
    /// `return ctx.help("...")`.
    pub fn help(&self, msg: impl fmt::Display) -> i32 {
        self.shared
            .streams
            .write_err(&format!("{}\n\n{}", msg, self.help_text()));
        EXIT_USAGE
    }
}

impl<S> fmt::Debug for ExecutionContext<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("full_path", &self.full_path)
            .field("flags", &self.flags)
            .field("root", &self.is_root())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_streams() {
        let (streams, out, err) = Streams::buffered();
        streams.write_out("hello\n");
        streams.write_err("oops\n");
        streams.write_err("again\n");
        assert_eq!(out.contents(), "hello\n");
        assert_eq!(err.contents(), "oops\nagain\n");
    }

    #[test]
    fn test_write_while_borrowed_is_dropped() {
        let (streams, _out, err) = Streams::buffered();
        let guard = streams.err.borrow_mut();
        streams.write_err("lost\n");
        drop(guard);
        streams.write_err("kept\n");
        assert_eq!(err.contents(), "kept\n");
    }
}
