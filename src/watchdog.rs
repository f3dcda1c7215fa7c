//! Liveness guard around the hardware reset timer.
//!
//! Once armed, the timer resets the chip unless it is refreshed within the
//! timeout. The control loop refreshes it exactly once per iteration, so a
//! loop that stops making progress ends in a reboot rather than a dark jacket.

use log::{debug, info};

/// Hardware countdown timer that resets the board on expiry
pub trait Watchdog {
    /// Start the countdown; expiry performs an unconditional reset
    fn arm(&mut self, timeout_ms: u32);

    /// Restart the countdown
    fn feed(&mut self);
}

pub struct LivenessGuard<W> {
    watchdog: W,
    timeout_ms: u32,
    armed: bool,
    refreshes: u32,
}

impl<W: Watchdog> LivenessGuard<W> {
    pub fn new(watchdog: W) -> Self {
        Self {
            watchdog,
            timeout_ms: 0,
            armed: false,
            refreshes: 0,
        }
    }

    /// Arm the reset timer. Re-arming only changes the timeout.
    pub fn arm(&mut self, timeout_ms: u32) {
        info!("[WDT] Arming watchdog with {} ms timeout", timeout_ms);
        self.watchdog.arm(timeout_ms);
        self.timeout_ms = timeout_ms;
        self.armed = true;
    }

    pub fn refresh(&mut self) {
        self.watchdog.feed();
        self.refreshes = self.refreshes.wrapping_add(1);
        debug!("[WDT] Refreshed ({} total)", self.refreshes);
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Refreshes since boot
    pub fn refreshes(&self) -> u32 {
        self.refreshes
    }

    pub fn watchdog(&self) -> &W {
        &self.watchdog
    }
}
