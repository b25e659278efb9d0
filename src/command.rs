//! Per-stage state of a command pipeline.
//!
//! One [`Stage`] exists per command on the line. A stage carries its
//! argument vector, its topological [`Position`] in the pipeline, and
//! the two [`StreamHandle`]s describing where its standard input and
//! output come from. Stages are built fresh for every input line and
//! consumed by the launcher; nothing survives into the next line.

use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::unistd;

/// Topological role of a stage within its pipeline.
///
/// The role decides which of the stage's standard streams get
/// redirected in the child: the first stage keeps its inherited stdin,
/// the last keeps its inherited stdout, and a single command keeps
/// both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// The only command on the line (no pipes at all).
    Single,
    /// First of two or more commands; writes into a pipe.
    First,
    /// Interior command; reads from one pipe and writes into another.
    Middle,
    /// Last of two or more commands; reads from a pipe.
    Last,
}

impl Position {
    /// Classify the stage at `index` within a pipeline of `len`
    /// commands. Total over every valid pair: `index < len`, `len > 0`.
    pub fn classify(index: usize, len: usize) -> Position {
        debug_assert!(len > 0 && index < len);
        if len == 1 {
            Position::Single
        } else if index == 0 {
            Position::First
        } else if index == len - 1 {
            Position::Last
        } else {
            Position::Middle
        }
    }
}

/// Where a stage's standard input or output is connected.
#[derive(Debug)]
pub enum StreamHandle {
    /// The orchestrating process's own stdin/stdout, passed through
    /// unchanged across the fork.
    Inherit,
    /// One end of a kernel pipe. Dropping the handle closes the
    /// descriptor, so an abandoned pipe end can never leak.
    Pipe(OwnedFd),
}

impl StreamHandle {
    pub fn is_inherited(&self) -> bool {
        matches!(self, StreamHandle::Inherit)
    }

    /// Duplicate the pipe end onto the standard descriptor `slot` and
    /// close the original; a no-op for [`StreamHandle::Inherit`].
    ///
    /// Only meaningful in a forked child, before exec.
    pub fn install(self, slot: RawFd) -> nix::Result<()> {
        if let StreamHandle::Pipe(fd) = self {
            unistd::dup2(fd.as_raw_fd(), slot)?;
            // `fd` drops here, closing the pre-dup descriptor.
        }
        Ok(())
    }
}

/// One stage of a pipeline: a command waiting to be launched.
#[derive(Debug)]
pub struct Stage {
    /// The command and its arguments; `argv[0]` is the program name.
    /// Never empty.
    pub argv: Vec<String>,
    /// `None` until classification has run. A stage reaching the
    /// launcher with `None` is an internal error, fatal to the child
    /// only.
    pub position: Option<Position>,
    /// Standard input source. [`StreamHandle::Inherit`] until the
    /// orchestrator assigns a pipe read end.
    pub stdin: StreamHandle,
    /// Standard output sink. [`StreamHandle::Inherit`] until the
    /// orchestrator assigns a pipe write end.
    pub stdout: StreamHandle,
}

impl Stage {
    /// A fresh, unclassified stage with inherited standard streams.
    pub fn new(argv: Vec<String>) -> Self {
        debug_assert!(!argv.is_empty());
        Self {
            argv,
            position: None,
            stdin: StreamHandle::Inherit,
            stdout: StreamHandle::Inherit,
        }
    }
}
