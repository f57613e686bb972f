//! Signal handling.
//!
//! Handlers mutate nothing but atomic flags; every consequence (break
//! out of the loop, print statistics, re-arm the alarm, reap a child)
//! happens on the main thread at the next packet boundary or poll tick.

use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(unix)]
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::dissect::dispatch;

/// A break from the capture loop was requested (SIGINT and friends).
pub static BREAK_REQUESTED: AtomicBool = AtomicBool::new(false);
/// Statistics were requested and can be printed at the next boundary.
pub static INFO_REQUESTED: AtomicBool = AtomicBool::new(false);
/// The one-second verbose counter is due.
pub static ALARM_TICK: AtomicBool = AtomicBool::new(false);

extern "C" fn on_break(_sig: libc::c_int) {
    BREAK_REQUESTED.store(true, Ordering::Relaxed);
}

#[cfg(unix)]
extern "C" fn on_child(_sig: libc::c_int) {
    // Reap one exited post-rotate child; waitpid is async-signal-safe.
    unsafe {
        libc::waitpid(-1, std::ptr::null_mut(), libc::WNOHANG);
    }
}

extern "C" fn on_info(_sig: libc::c_int) {
    if dispatch::dispatch_depth() == 0 {
        INFO_REQUESTED.store(true, Ordering::Relaxed);
    } else {
        // Mid-dispatch: park it so statistics never interleave with a
        // half-printed packet line.
        dispatch::defer_info();
    }
}

#[cfg(unix)]
extern "C" fn on_alarm(_sig: libc::c_int) {
    ALARM_TICK.store(true, Ordering::Relaxed);
    unsafe {
        libc::alarm(1);
    }
}

#[cfg(unix)]
fn install(sig: Signal, handler: extern "C" fn(libc::c_int)) -> nix::Result<SigAction> {
    let action = SigAction::new(SigHandler::Handler(handler), SaFlags::empty(), SigSet::empty());
    // SAFETY: the handlers above only touch atomics and async-signal-safe
    // libc calls.
    unsafe { sigaction(sig, &action) }
}

/// Installs the clean-break handlers: SIGINT, SIGTERM, SIGPIPE, and
/// SIGHUP unless the process inherited an ignored SIGHUP (so running
/// under nohup keeps working).
#[cfg(unix)]
pub fn install_break_handlers() -> nix::Result<()> {
    install(Signal::SIGINT, on_break)?;
    install(Signal::SIGTERM, on_break)?;
    install(Signal::SIGPIPE, on_break)?;
    let old = install(Signal::SIGHUP, on_break)?;
    if matches!(old.handler(), SigHandler::SigIgn) {
        // SAFETY: restoring the previous disposition.
        unsafe { sigaction(Signal::SIGHUP, &old)? };
    }
    Ok(())
}

/// Installs the SIGCHLD reaper for post-rotate children.
#[cfg(unix)]
pub fn install_child_reaper() -> nix::Result<()> {
    install(Signal::SIGCHLD, on_child).map(|_| ())
}

/// Installs the statistics-request handler (SIGUSR1).  Live captures
/// only; savefile reads have no kernel counters to report.
#[cfg(unix)]
pub fn install_info_handler() -> nix::Result<()> {
    install(Signal::SIGUSR1, on_info).map(|_| ())
}

/// Arms the one-second verbose packet counter.
#[cfg(unix)]
pub fn install_alarm() -> nix::Result<()> {
    install(Signal::SIGALRM, on_alarm)?;
    unsafe {
        libc::alarm(1);
    }
    Ok(())
}

/// Clears every flag; used when a new session starts in-process (tests).
pub fn reset_flags() {
    BREAK_REQUESTED.store(false, Ordering::Relaxed);
    INFO_REQUESTED.store(false, Ordering::Relaxed);
    ALARM_TICK.store(false, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn break_flag_sets() {
        reset_flags();
        on_break(0);
        assert!(BREAK_REQUESTED.swap(false, Ordering::Relaxed));
    }

    #[cfg(unix)]
    #[test]
    fn alarm_flag_sets_and_rearms() {
        reset_flags();
        on_alarm(0);
        assert!(ALARM_TICK.swap(false, Ordering::Relaxed));
        // Cancel the alarm the handler re-armed.
        unsafe {
            libc::alarm(0);
        }
    }
}
