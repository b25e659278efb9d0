//! Pipe orchestration, process launching and reaping.
//!
//! One input line becomes a `Vec<Stage>`; this module wires adjacent
//! stages together with kernel pipes, forks one child per stage in
//! index order, and blocks until every child has terminated. The
//! orchestrating process never holds a pipe end longer than the launch
//! of the stage it belongs to: each [`Stage`] is moved into
//! [`launch`], so its ends close in the parent as soon as the call
//! returns. A stray write end held here would keep a downstream reader
//! blocked forever.

use std::ffi::CString;

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::libc;
use nix::sys::wait;
use nix::unistd::{self, ForkResult, Pid};

use crate::command::{Position, Stage, StreamHandle};

/// Exit status of a child whose executable could not be found.
const EXIT_NOT_FOUND: i32 = 127;
/// Exit status of a child that failed between fork and exec.
const EXIT_LAUNCH_FAILED: i32 = 126;
/// Exit status of a child forked without a position tag; this is a
/// classifier bug, not a user error, and must stay distinguishable.
const EXIT_UNCLASSIFIED: i32 = 125;

/// Tag every stage with its topological role.
pub fn classify(stages: &mut [Stage]) {
    let len = stages.len();
    for (index, stage) in stages.iter_mut().enumerate() {
        stage.position = Some(Position::classify(index, len));
    }
}

/// Create one pipe per adjacent pair of stages and hand out its ends:
/// stage i writes into it, stage i + 1 reads from it.
///
/// Must run before any stage is launched. Every end is created
/// close-on-exec: a forked child inherits the parent's still-open ends
/// of every later pipe, and without the flag those copies would
/// survive its `exec` and keep downstream readers from ever seeing
/// end-of-stream. The child's own ends lose the flag when
/// [`StreamHandle::install`] dup2s them onto fd 0/1.
///
/// If `pipe2()` fails the pipeline is abandoned; ends already handed
/// out are owned by their stages and close when the stages drop, so
/// nothing leaks into the next line.
pub fn plumb(stages: &mut [Stage]) -> Result<()> {
    for i in 1..stages.len() {
        let (read_end, write_end) =
            unistd::pipe2(OFlag::O_CLOEXEC).context("failed to create pipe")?;
        stages[i - 1].stdout = StreamHandle::Pipe(write_end);
        stages[i].stdin = StreamHandle::Pipe(read_end);
    }
    Ok(())
}

/// Fork one child for `stage`.
///
/// The child redirects its standard streams according to the stage's
/// position and execs `argv[0]`, resolved through `PATH`; it reports
/// its own failures on stderr and `_exit`s, never returning into
/// orchestrator code. The parent returns the child's pid; `stage` is
/// consumed, so the parent's copies of its pipe ends are closed by the
/// time the call returns.
pub fn launch(stage: Stage) -> Result<Pid> {
    match unsafe { unistd::fork() }.context("failed to fork")? {
        ForkResult::Parent { child } => Ok(child),
        ForkResult::Child => exec_stage(stage),
    }
}

fn exec_stage(stage: Stage) -> ! {
    let status = redirect_and_exec(stage);
    // Skip atexit handlers and stdio flushing inherited from the
    // parent's address space.
    unsafe { libc::_exit(status) }
}

/// Child-side half of [`launch`]: redirect, then exec. Only ever
/// returns an exit status, on failure.
fn redirect_and_exec(stage: Stage) -> libc::c_int {
    let Stage {
        argv,
        position,
        stdin,
        stdout,
    } = stage;
    let name = &argv[0];

    let Some(position) = position else {
        eprintln!("pipesh: internal error: stage `{name}` was never classified");
        return EXIT_UNCLASSIFIED;
    };

    let redirected = match position {
        // Keeps the orchestrator's stdin and stdout untouched.
        Position::Single => Ok(()),
        Position::First => stdout.install(libc::STDOUT_FILENO),
        Position::Middle => stdin
            .install(libc::STDIN_FILENO)
            .and_then(|()| stdout.install(libc::STDOUT_FILENO)),
        Position::Last => stdin.install(libc::STDIN_FILENO),
    };
    if let Err(err) = redirected {
        eprintln!("pipesh: failed to redirect stdio for `{name}`: {err}");
        return EXIT_LAUNCH_FAILED;
    }

    let argv_c: Vec<CString> = match argv.iter().map(|a| CString::new(a.as_str())).collect() {
        Ok(argv_c) => argv_c,
        Err(_) => {
            eprintln!("pipesh: argument of `{name}` contains a NUL byte");
            return EXIT_LAUNCH_FAILED;
        }
    };

    match unistd::execvp(&argv_c[0], &argv_c) {
        Err(Errno::ENOENT) => {
            eprintln!("pipesh: command not found: {name}");
            EXIT_NOT_FOUND
        }
        Err(err) => {
            eprintln!("pipesh: failed to exec `{name}`: {err}");
            EXIT_LAUNCH_FAILED
        }
        Ok(never) => match never {},
    }
}

/// Block until `n` children have terminated, discarding statuses.
///
/// Completion order among the children is irrelevant; correctness
/// rests on the pipe plumbing alone. An interrupted wait is retried so
/// a signal cannot leave terminated children unreaped; only "no
/// children left" ends reaping early.
pub fn reap_all(n: usize) {
    let mut reaped = 0;
    while reaped < n {
        match wait::wait() {
            Ok(_) => reaped += 1,
            Err(Errno::EINTR) => continue,
            Err(_) => break,
        }
    }
}

/// Execute one pipeline to completion: classify, plumb, launch every
/// stage in index order, then reap every child that was launched.
///
/// A pipe or fork failure aborts only this pipeline: stages not yet
/// launched are dropped (closing their pipe ends, so children already
/// running see end-of-stream), the launched children are still reaped,
/// and the error is returned for the caller to report. The interactive
/// loop stays alive.
pub fn run(mut stages: Vec<Stage>) -> Result<()> {
    debug_assert!(!stages.is_empty());

    classify(&mut stages);
    plumb(&mut stages)?;

    let mut children: Vec<Pid> = Vec::with_capacity(stages.len());
    let mut failure = None;
    for stage in stages {
        match launch(stage) {
            Ok(pid) => children.push(pid),
            Err(err) => {
                // Breaking drops the remaining stages along with the
                // iterator, closing their pipe ends.
                failure = Some(err);
                break;
            }
        }
    }

    reap_all(children.len());

    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
