//! Process-group helpers so a single signal to the worker kills the
//! whole child subtree (spec §4.4 "Launch the child in its own process
//! group", §9 "spawn_group(argv) whose shutdown kills the whole tree").
//! On non-Unix targets these are no-ops; the worker still functions, it
//! just can't guarantee grandchildren are reaped on shutdown.

use std::io;

#[cfg(unix)]
use tokio::process::Command;

/// Re-exported so callers don't need a direct `libc` dependency just to
/// name a signal.
#[cfg(unix)]
pub const SIGTERM: i32 = libc::SIGTERM;
#[cfg(not(unix))]
pub const SIGTERM: i32 = 15;

#[cfg(unix)]
/// Put the child in its own session/process group in `pre_exec`, so it
/// survives the worker's controlling terminal and can be signaled as a
/// unit.
pub fn detach_into_own_group(cmd: &mut Command) {
    unsafe {
        cmd.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
pub fn detach_into_own_group(_cmd: &mut tokio::process::Command) {}

#[cfg(unix)]
/// Send `signal` to the whole process group led by `pid` (best-effort).
pub fn signal_group(pid: u32, signal: i32) -> io::Result<()> {
    let pgid = pid as libc::pid_t;
    let result = unsafe { libc::killpg(pgid, signal) };
    if result == -1 {
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::NotFound {
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn signal_group(_pid: u32, _signal: i32) -> io::Result<()> {
    Ok(())
}
