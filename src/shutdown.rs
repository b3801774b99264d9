//! Ctrl-C handling for blocking sessions.
//!
//! A live camera never runs out of frames, so the only way out of a headless
//! session is a signal. The first SIGINT or SIGTERM raises a flag that the
//! session's quit hook polls once per frame; the loop then ends after the
//! current frame and the sinks are closed normally. A second signal while the
//! flag is already set exits at once.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;

#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
}

impl StopSignal {
    /// A flag with no signal handlers attached; [`trigger`](Self::trigger)
    /// is the only way to set it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs SIGINT and SIGTERM handlers that set the flag
    pub fn install() -> io::Result<Self> {
        let stop = Self::new();
        for signal in [SIGINT, SIGTERM] {
            // Registered before the flag so it only fires on a repeated signal.
            flag::register_conditional_shutdown(signal, 130, Arc::clone(&stop.requested))?;
            flag::register(signal, Arc::clone(&stop.requested))?;
        }
        tracing::debug!("stop signal handlers installed");
        Ok(stop)
    }

    pub fn requested(&self) -> bool {
        self.requested.load(Ordering::Relaxed)
    }

    pub fn trigger(&self) {
        self.requested.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let stop = StopSignal::new();
        let hook = stop.clone();
        assert!(!hook.requested());
        stop.trigger();
        assert!(hook.requested());
    }

    #[cfg(unix)]
    #[test]
    fn interrupt_sets_the_flag() {
        let stop = StopSignal::install().unwrap();
        assert!(!stop.requested());
        signal_hook::low_level::raise(SIGINT).unwrap();
        assert!(stop.requested());
    }
}
