//! The device control loop.
//!
//! One iteration: make sure the link is up, poll the color service if it is,
//! paint the resulting display state, refresh the watchdog, then sleep for the
//! fixed poll interval. The interval is also the retry policy: a failed
//! iteration is simply followed by the next one.

use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};
use smart_leds::SmartLedsWrite;

use crate::color::Color;
use crate::color_client::{ColorClient, HttpTransport, PollOutcome};
use crate::config::Settings;
use crate::led_control::LedRenderer;
use crate::state_machine::{self, DisplayState};
use crate::watchdog::{LivenessGuard, Watchdog};
use crate::wifi::{ConnectivityManager, ConnectivityState, WifiLink};

/// State carried from one iteration to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopState {
    pub connectivity: ConnectivityState,
    pub display: DisplayState,
}

impl Default for LoopState {
    fn default() -> Self {
        Self {
            connectivity: ConnectivityState::Disconnected,
            display: DisplayState::Startup,
        }
    }
}

/// What one iteration observed and painted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub connectivity: ConnectivityState,
    /// `None` when no fetch was attempted
    pub outcome: Option<PollOutcome>,
    pub display: DisplayState,
}

pub struct ControlLoop<'a, L, T, S, W, D> {
    settings: Settings<'a>,
    wifi: ConnectivityManager<L, D>,
    client: ColorClient<T>,
    renderer: LedRenderer<S>,
    guard: LivenessGuard<W>,
    delay: D,
    state: LoopState,
    cycles: u32,
}

impl<'a, L, T, S, W, D> ControlLoop<'a, L, T, S, W, D>
where
    L: WifiLink,
    T: HttpTransport,
    S: SmartLedsWrite,
    S::Color: From<Color>,
    S::Error: Debug,
    W: Watchdog,
    D: DelayNs + Clone,
{
    pub fn new(settings: Settings<'a>, link: L, transport: T, strip: S, watchdog: W, delay: D) -> Self {
        Self {
            wifi: ConnectivityManager::new(link, delay.clone(), settings.timing.connect_timeout_ms),
            client: ColorClient::new(transport),
            renderer: LedRenderer::new(strip),
            guard: LivenessGuard::new(watchdog),
            delay,
            settings,
            state: LoopState::default(),
            cycles: 0,
        }
    }

    /// Arm the watchdog and show the boot flash
    pub fn startup(&mut self) {
        let timing = self.settings.timing;
        self.guard.arm(timing.watchdog_timeout_ms);

        if let Err(e) = self.settings.validate() {
            error!("[MAIN] Configuration problem: {}; the board will keep retrying", e);
        }

        info!("[MAIN] Startup signal for {} ms", timing.startup_flash_ms);
        self.paint(DisplayState::Startup);
        self.state.display = DisplayState::Startup;
        self.delay.delay_ms(timing.startup_flash_ms);
        self.guard.refresh();
    }

    /// Run one full iteration, sleep included
    pub fn run_cycle(&mut self) -> CycleReport {
        let connectivity = self.wifi.ensure_connected(&self.settings.credentials);

        let outcome = match connectivity {
            ConnectivityState::Connected => Some(
                self.client
                    .fetch_color(self.settings.server_url, self.settings.api_key),
            ),
            _ => None,
        };

        let display = state_machine::next_display(connectivity, outcome);
        state_machine::log_transition(self.state.display, display);
        self.paint(display);
        self.state = LoopState {
            connectivity,
            display,
        };

        self.guard.refresh();
        self.cycles = self.cycles.wrapping_add(1);
        self.delay.delay_ms(self.settings.timing.poll_interval_ms);

        CycleReport {
            connectivity,
            outcome,
            display,
        }
    }

    /// Boot and loop forever; only a reset or power loss ends this
    pub fn run(mut self) -> ! {
        self.startup();
        loop {
            self.run_cycle();
        }
    }

    fn paint(&mut self, display: DisplayState) {
        // A failed push is retried by the next iteration's render
        if let Err(e) = self.renderer.render(display.color()) {
            warn!("[LED] Could not show {:?}: {}", display, e);
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Completed iterations since boot
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn renderer(&self) -> &LedRenderer<S> {
        &self.renderer
    }

    pub fn guard(&self) -> &LivenessGuard<W> {
        &self.guard
    }

    pub fn wifi(&self) -> &ConnectivityManager<L, D> {
        &self.wifi
    }

    pub fn wifi_mut(&mut self) -> &mut ConnectivityManager<L, D> {
        &mut self.wifi
    }

    pub fn client(&self) -> &ColorClient<T> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut ColorClient<T> {
        &mut self.client
    }
}
