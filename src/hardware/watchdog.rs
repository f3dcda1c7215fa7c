//! RTC watchdog driver

use esp_hal::rtc_cntl::{Rwdt, RwdtStage, RwdtStageAction};
use esp_hal::time::Duration;

use crate::watchdog::Watchdog;

/// The RTC watchdog; stage 0 expiry resets the whole system
pub struct RtcWatchdog {
    rwdt: Rwdt,
}

impl RtcWatchdog {
    pub fn new(rwdt: Rwdt) -> Self {
        Self { rwdt }
    }
}

impl Watchdog for RtcWatchdog {
    fn arm(&mut self, timeout_ms: u32) {
        self.rwdt
            .set_stage_action(RwdtStage::Stage0, RwdtStageAction::ResetSystem);
        self.rwdt
            .set_timeout(RwdtStage::Stage0, Duration::from_millis(timeout_ms as u64));
        self.rwdt.enable();
        self.rwdt.feed();
    }

    fn feed(&mut self) {
        self.rwdt.feed();
    }
}
