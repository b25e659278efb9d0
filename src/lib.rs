//! A small interactive pipeline executor.
//!
//! Each input line is split on `|` into commands, the commands are
//! connected with kernel pipes, one child process is forked per
//! command with its standard streams redirected to the right pipe
//! ends, and the loop waits for every child before reading the next
//! line. There are no built-ins, no redirections and no job control:
//! the interesting part is the descriptor plumbing, and everything
//! else is delegated to `execvp` and the OS scheduler.
//!
//! The main entry point is [`Interpreter`], which owns the
//! read/parse/execute loop. The [`command`], [`parser`] and
//! [`pipeline`] modules expose the stage model, the line parser and
//! the fork/pipe/reap machinery for direct use.

pub mod command;
pub mod parser;
pub mod pipeline;
mod interpreter;

/// Convenient re-export of the interactive pipeline loop.
pub use interpreter::Interpreter;
