//! Spawn Module
//!
//! Fire-and-forget launching of external commands and reaping of the
//! children they leave behind.

use anyhow::{Context, Result, bail};
use std::io;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Launch `argv` in its own session and return without waiting for it.
pub fn spawn(argv: &[String]) -> Result<()> {
    let Some((program, args)) = argv.split_first() else {
        bail!("Cannot spawn an empty command");
    };

    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null());
    // SAFETY: setsid is async-signal-safe and touches no Rust state.
    unsafe {
        cmd.pre_exec(|| {
            if libc::setsid() < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let child = cmd
        .spawn()
        .with_context(|| format!("Failed to launch {}", program))?;
    debug!("Launched {} (pid {})", program, child.id());
    Ok(())
}

/// Collect every child that has exited, without blocking.
///
/// Returns how many were reaped.
pub fn reap_children() -> usize {
    let mut reaped = 0;
    loop {
        let mut status = 0;
        // SAFETY: waitpid only writes to the status integer we own.
        let pid = unsafe { libc::waitpid(-1, &mut status, libc::WNOHANG) };
        if pid > 0 {
            debug!("Reaped child {} (status {:#x})", pid, status);
            reaped += 1;
            continue;
        }
        if pid == 0 {
            break;
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EINTR) => continue,
            Some(libc::ECHILD) => break,
            _ => {
                warn!("waitpid failed: {}", err);
                break;
            }
        }
    }
    reaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(spawn(&[]).is_err());
    }

    // Launch failures and reaping share one test: reap_children waits on any
    // child, which would race with the wait std performs after a failed exec.
    #[test]
    fn test_launch_and_reap() {
        let err = spawn(&["/nonexistent/ringwm-test-binary".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Failed to launch"));

        spawn(&["true".to_string()]).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut reaped = 0;
        while reaped == 0 && Instant::now() < deadline {
            reaped += reap_children();
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(reaped >= 1);
    }
}
