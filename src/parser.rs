//! Splitting one input line into a pipeline of argument vectors.
//!
//! The parser understands exactly two pieces of syntax: the pipe
//! operator `|` between commands, and single/double quotes inside
//! words. Everything else on the line is opaque text that ends up in
//! some command's `argv` unchanged.

use std::fmt;

/// Upper bound on the number of commands in one pipeline.
pub const MAX_STAGES: usize = 64;

/// Errors that can occur while splitting a line into a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A pipe operator with no command on one of its sides
    /// (e.g. `| cmd`, `cmd |`, or `a || b`).
    EmptyStage,
    /// A single or double quote was opened but never closed.
    UnterminatedQuote,
    /// The line contains more than [`MAX_STAGES`] commands.
    TooManyStages,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::EmptyStage => write!(f, "empty command in pipeline"),
            ParseError::UnterminatedQuote => write!(f, "unterminated quote"),
            ParseError::TooManyStages => {
                write!(f, "pipeline exceeds {} commands", MAX_STAGES)
            }
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Between words; whitespace is skipped.
    Blank,
    /// Inside an unquoted word.
    Word,
    /// Inside '...'
    SingleQuote,
    /// Inside "..."
    DoubleQuote,
}

/// Split `line` on unquoted `|` into argument vectors, splitting each
/// command on unquoted whitespace.
///
/// A blank (or all-whitespace) line parses to an empty pipeline, which
/// callers are expected to skip. Quotes group text into a single
/// argument and may produce an empty one (`echo ""`); the quote
/// characters themselves are not part of the argument.
pub fn parse(line: &str) -> Result<Vec<Vec<String>>, ParseError> {
    let mut pipeline: Vec<Vec<String>> = Vec::new();
    let mut argv: Vec<String> = Vec::new();
    let mut word = String::new();
    // Distinguishes "no word in progress" from an empty quoted word.
    let mut in_word = false;
    let mut state = State::Blank;

    fn finish_word(argv: &mut Vec<String>, word: &mut String, in_word: &mut bool) {
        if *in_word {
            argv.push(std::mem::take(word));
            *in_word = false;
        }
    }

    for c in line.chars() {
        match state {
            State::Blank | State::Word => match c {
                '|' => {
                    finish_word(&mut argv, &mut word, &mut in_word);
                    if argv.is_empty() {
                        return Err(ParseError::EmptyStage);
                    }
                    pipeline.push(std::mem::take(&mut argv));
                    state = State::Blank;
                }
                '\'' => {
                    in_word = true;
                    state = State::SingleQuote;
                }
                '"' => {
                    in_word = true;
                    state = State::DoubleQuote;
                }
                c if c.is_whitespace() => {
                    finish_word(&mut argv, &mut word, &mut in_word);
                    state = State::Blank;
                }
                c => {
                    in_word = true;
                    word.push(c);
                    state = State::Word;
                }
            },
            State::SingleQuote => match c {
                '\'' => state = State::Word,
                c => word.push(c),
            },
            State::DoubleQuote => match c {
                '"' => state = State::Word,
                c => word.push(c),
            },
        }
    }

    match state {
        State::SingleQuote | State::DoubleQuote => {
            return Err(ParseError::UnterminatedQuote);
        }
        _ => {}
    }
    finish_word(&mut argv, &mut word, &mut in_word);

    if argv.is_empty() {
        // Either a blank line (no commands at all) or a trailing pipe.
        if pipeline.is_empty() {
            return Ok(pipeline);
        }
        return Err(ParseError::EmptyStage);
    }
    pipeline.push(argv);

    if pipeline.len() > MAX_STAGES {
        return Err(ParseError::TooManyStages);
    }
    Ok(pipeline)
}
