// crates/cli/src/exec.rs
#![allow(unsafe_code)]

use std::ffi::CString;
use std::process::ExitCode;

use anyhow::{Context, Result};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, execvp};
use observers::FreezeGuard;
use oracle::{ForkError, Oracle};
use tracing::{debug, error};

use crate::{EXIT_UNSAFE, ExecOpts};

/// Status the child exits with when the command cannot be executed.
const EXIT_EXEC_FAILED: i32 = 127;

pub(crate) fn run(opts: &ExecOpts) -> Result<ExitCode> {
    let argv = opts
        .command
        .iter()
        .map(|arg| CString::new(arg.as_bytes()))
        .collect::<Result<Vec<_>, _>>()
        .context("command arguments must not contain NUL bytes")?;
    let Some(program) = argv.first() else {
        anyhow::bail!("no command given");
    };

    let _freeze = opts.oracle.freeze.then(FreezeGuard::new);
    let oracle = Oracle::new(opts.oracle.oracle_config());
    match oracle.fork() {
        Ok(ForkResult::Child) => {
            let err = match execvp(program, &argv) {
                Ok(never) => match never {},
                Err(err) => err,
            };
            error!(command = %opts.command[0], "exec failed: {err}");
            // SAFETY: `_exit` skips the parent's atexit handlers and stdio
            // buffers, which belong to the parent, and never returns.
            unsafe { libc::_exit(EXIT_EXEC_FAILED) }
        }
        Ok(ForkResult::Parent { child }) => wait_for(child),
        Err(ForkError::Unsafe) => {
            eprintln!("safefork: unsafe to fork");
            Ok(ExitCode::from(EXIT_UNSAFE))
        }
        Err(err) => Err(err.into()),
    }
}

fn wait_for(child: Pid) -> Result<ExitCode> {
    loop {
        let status = waitpid(child, None).context("waitpid failed")?;
        debug!(target: "safefork::fork", ?status, "child status");
        match status {
            WaitStatus::Exited(_, code) => return Ok(ExitCode::from(code as u8)),
            WaitStatus::Signaled(_, signal, _) => {
                return Ok(ExitCode::from(128u8.wrapping_add(signal as u8)));
            }
            _ => continue,
        }
    }
}
