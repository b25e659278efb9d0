//! The interactive pipeline loop.

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::command::Stage;
use crate::{parser, pipeline};

const PROMPT: &str = "pipesh> ";

/// Reads lines, turns each into a pipeline of [`Stage`]s and runs it
/// to completion before prompting again.
///
/// Errors from a single line — a parse error, pipe exhaustion, a fork
/// failure — are reported on stderr and the loop keeps going; only
/// Ctrl-C, Ctrl-D or a broken line source ends it. Exec failures never
/// reach this type at all: they are reported by the affected child
/// itself.
pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Self
    }

    /// Parse and execute one input line.
    ///
    /// A blank line is a no-op. All stages are launched in order and
    /// every launched child is reaped before this returns, so two
    /// consecutive lines can never overlap.
    pub fn run_line(&mut self, line: &str) -> Result<()> {
        let pipeline = parser::parse(line)?;
        if pipeline.is_empty() {
            return Ok(());
        }
        let stages: Vec<Stage> = pipeline.into_iter().map(Stage::new).collect();
        pipeline::run(stages)
    }

    /// Prompt/read/execute until end of input.
    pub fn repl(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;
        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    if let Err(err) = self.run_line(&line) {
                        eprintln!("pipesh: {err}");
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
