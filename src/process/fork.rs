//! fork/exec launcher backed by libc.

use std::ffi::CString;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::ptr;

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

use super::{ChildId, ChildLauncher, Reaped};

/// Exit status of a child whose `execvp` failed.
pub const EXEC_FAILED_STATUS: i32 = 127;

/// Launches terminals with `fork` + `execvp` and reaps them with `waitpid`.
#[derive(Debug, Default)]
pub struct ForkLauncher;

impl ChildLauncher for ForkLauncher {
    fn launch(&mut self, argv: &[String]) -> Result<ChildId> {
        if argv.is_empty() {
            bail!("cannot launch an empty command");
        }
        let args = argv
            .iter()
            .map(|arg| {
                CString::new(arg.as_str())
                    .with_context(|| format!("terminal argument contains NUL byte: {arg}"))
            })
            .collect::<Result<Vec<_>>>()?;
        let mut arg_ptrs: Vec<*const libc::c_char> = args.iter().map(|s| s.as_ptr()).collect();
        arg_ptrs.push(ptr::null());

        // SAFETY: args and arg_ptrs outlive the call and arg_ptrs is NULL-terminated.
        // The child only performs async-signal-safe calls before exec.
        let pid = unsafe { spawn_child(&args[0], &arg_ptrs)? };
        debug!(pid, program = %argv[0], "terminal launched");
        Ok(ChildId(pid))
    }

    fn try_reap(&mut self, child: ChildId) -> Result<Reaped> {
        loop {
            let mut status = 0;
            // SAFETY: waitpid with WNOHANG only inspects the state of this specific pid.
            let ret = unsafe { libc::waitpid(child.0, &mut status, libc::WNOHANG) };
            if ret == 0 {
                return Ok(Reaped::Running);
            }
            if ret == child.0 {
                return Ok(Reaped::Exited(ExitStatus::from_raw(status)));
            }
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) => continue,
                Some(libc::ECHILD) => return Ok(Reaped::Gone),
                _ => return Err(anyhow!("waitpid({child}) failed: {err}")),
            }
        }
    }

    fn terminate(&mut self, child: ChildId) -> Result<()> {
        send_signal(child, libc::SIGTERM, "SIGTERM")
    }

    fn kill(&mut self, child: ChildId) -> Result<()> {
        send_signal(child, libc::SIGKILL, "SIGKILL")
    }
}

fn send_signal(child: ChildId, signal: libc::c_int, name: &str) -> Result<()> {
    // SAFETY: kill only targets the pid we launched.
    if unsafe { libc::kill(child.0, signal) } == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        debug!(pid = child.0, signal = name, "child already gone");
        return Ok(());
    }
    Err(errno_error(&format!("{name} to pid {child} failed")))
}

/// Fork and exec `argv`.
///
/// # Safety
///
/// `arg_ptrs` must be a NULL-terminated array of pointers into live C strings
/// with `program` as its first element.
unsafe fn spawn_child(program: &CString, arg_ptrs: &[*const libc::c_char]) -> Result<i32> {
    // SAFETY: everything the child touches was allocated before fork.
    let pid = libc::fork();
    if pid < 0 {
        return Err(errno_error("fork failed"));
    }
    if pid == 0 {
        child_exec(program, arg_ptrs);
    }
    Ok(pid)
}

/// Runs in the forked child. Never returns: either execs or exits with
/// [`EXEC_FAILED_STATUS`].
///
/// # Safety
///
/// Must only be called in the child process after `fork()`.
unsafe fn child_exec(program: &CString, arg_ptrs: &[*const libc::c_char]) -> ! {
    libc::execvp(program.as_ptr(), arg_ptrs.as_ptr());

    // Only raw writes from here on; allocating after fork in a threaded
    // process is not safe.
    let name = program.as_bytes();
    let chunks: [&[u8]; 3] = [b"dropconsole: failed to exec ", name, b"\n"];
    for chunk in chunks {
        // SAFETY: write is async-signal-safe and stderr is a valid fd in the child.
        let _ = libc::write(
            libc::STDERR_FILENO,
            chunk.as_ptr() as *const libc::c_void,
            chunk.len(),
        );
    }
    libc::_exit(EXEC_FAILED_STATUS);
}

/// Helper that formats OS errors with additional context.
fn errno_error(context: &str) -> anyhow::Error {
    anyhow!("{context}: {}", io::Error::last_os_error())
}
