//! Signal plumbing between the launcher and the wrapped process (Unix only)
//!
//! The handler only touches an atomic and calls sigaction(2), kill(2) or
//! raise(3), all async-signal-safe.

use std::sync::atomic::{AtomicI32, Ordering};

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::Pid;

use crate::error::{Result, ShimError};

/// Signals relayed from the launcher to the child.
pub const FORWARDED: [Signal; 3] = [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP];

/// Pid of the running child; 0 while there is none.
static CHILD_PID: AtomicI32 = AtomicI32::new(0);

extern "C" fn forward(sig: i32) {
    let Ok(sig) = Signal::try_from(sig) else {
        return;
    };
    let pid = CHILD_PID.load(Ordering::SeqCst);
    if pid > 0 {
        let _ = signal::kill(Pid::from_raw(pid), sig);
        return;
    }
    // No child yet or any more: take the default action ourselves.
    // The signal stays blocked until the handler returns, then kills us.
    // SAFETY: restoring SIG_DFL and raise(3) are async-signal-safe.
    let _ = unsafe { signal::signal(sig, SigHandler::SigDfl) };
    let _ = signal::raise(sig);
}

/// Install the relay handlers for [`FORWARDED`].
///
/// Done before spawning so the child starts with default dispositions
/// even if the launcher inherited ignored ones.
pub fn install() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(forward),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for sig in FORWARDED {
        // SAFETY: `forward` only touches an atomic and calls kill(2).
        unsafe { signal::sigaction(sig, &action) }.map_err(|e| {
            ShimError::Io(std::io::Error::other(format!(
                "failed to install {sig} handler: {e}"
            )))
        })?;
    }
    Ok(())
}

/// Relay signals to `child` until [`clear_child`] is called.
pub fn set_child(child: u32) {
    // Pids always fit in pid_t; anything else disables relaying
    let pid = i32::try_from(child).unwrap_or(0);
    CHILD_PID.store(pid, Ordering::SeqCst);
}

/// Stop relaying signals.
pub fn clear_child() {
    CHILD_PID.store(0, Ordering::SeqCst);
}

/// Terminate this process with `signo`, the way the child died.
///
/// Restores the default disposition first so the signal is not caught by
/// our own relay handler. Falls back to `exit(128 + signo)` if the process
/// survives (for example a signal whose default action is to ignore).
pub fn reraise(signo: i32) -> ! {
    if let Ok(sig) = Signal::try_from(signo) {
        // SAFETY: restoring the default disposition has no handler side effects.
        let _ = unsafe { signal::signal(sig, SigHandler::SigDfl) };

        let mut unblock = SigSet::empty();
        unblock.add(sig);
        let _ = unblock.thread_unblock();

        let _ = signal::raise(sig);
    }
    std::process::exit(128 + signo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_without_child_takes_default_action() {
        use nix::sys::wait::{WaitStatus, waitpid};
        use nix::unistd::{ForkResult, fork};

        // SAFETY: the forked child only makes async-signal-safe calls.
        match unsafe { fork() }.unwrap() {
            ForkResult::Child => {
                if install().is_ok() {
                    clear_child();
                    let _ = signal::raise(Signal::SIGTERM);
                }
                // Reached only if the signal was swallowed
                unsafe { nix::libc::_exit(0) }
            }
            ForkResult::Parent { child } => {
                let status = waitpid(child, None).unwrap();
                assert_eq!(status, WaitStatus::Signaled(child, Signal::SIGTERM, false));
            }
        }
    }

    #[test]
    fn forwarded_set_matches_job_control_signals() {
        assert!(FORWARDED.contains(&Signal::SIGINT));
        assert!(FORWARDED.contains(&Signal::SIGHUP));
        assert!(!FORWARDED.contains(&Signal::SIGKILL));
    }
}
