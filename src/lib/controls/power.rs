//! The supervised-restart exit path.
//!
//! A qualifying long press terminates the process with a distinguished exit
//! code that the external supervisor interprets as "relaunch me". The latch
//! guarantees the action fires at most once per process, no matter how the
//! caller misbehaves.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::*;

/// Exit code the supervisor maps to a relaunch.
pub const RESTART_EXIT_CODE: i32 = 42;

static REQUESTED: AtomicBool = AtomicBool::new(false);

/// Terminate for a supervised relaunch. A second call is a no-op.
pub fn restart_for_supervisor() {
    if REQUESTED.swap(true, Ordering::SeqCst) {
        warn!("Supervised restart already requested, ignoring");
        return;
    }

    info!("Exiting with code {RESTART_EXIT_CODE} for supervised restart");
    std::process::exit(RESTART_EXIT_CODE);
}

/// Whether the restart path was already taken. Exposed for tests.
pub fn is_requested() -> bool {
    REQUESTED.load(Ordering::SeqCst)
}
