//! Error-display state machine
//!
//! Decides what the jacket shows for one loop iteration. The decision depends
//! only on the current iteration's connectivity and poll outcome; the only
//! thing carried between iterations is the color already painted.

use log::{info, warn};

use crate::color::Color;
use crate::color_client::PollOutcome;
use crate::wifi::ConnectivityState;

/// Display states, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SystemState {
    /// Boot flash before the first poll; never re-entered
    StartupSignal,
    /// No link, or the request never got a response
    NetworkFault,
    /// Link is up but the service answered with something unusable
    ServerFault,
    /// Showing the color supplied by the service
    Normal,
}

/// The value painted on every LED
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    Startup,
    Fetched(Color),
    NetworkFault,
    ServerFault,
}

impl DisplayState {
    pub fn color(&self) -> Color {
        match self {
            DisplayState::Startup => Color::STARTUP,
            DisplayState::Fetched(color) => *color,
            DisplayState::NetworkFault => Color::NETWORK_FAULT,
            DisplayState::ServerFault => Color::SERVER_FAULT,
        }
    }

    pub fn system_state(&self) -> SystemState {
        match self {
            DisplayState::Startup => SystemState::StartupSignal,
            DisplayState::Fetched(_) => SystemState::Normal,
            DisplayState::NetworkFault => SystemState::NetworkFault,
            DisplayState::ServerFault => SystemState::ServerFault,
        }
    }

    /// Check if the display signals an error
    pub fn is_error_state(&self) -> bool {
        matches!(self, DisplayState::NetworkFault | DisplayState::ServerFault)
    }
}

/// What to display after an iteration observed `connectivity` and, when the
/// link was up, the poll `outcome`.
///
/// Network faults outrank server faults; a fetched color is shown only when
/// both the link and the service are healthy.
pub fn next_display(connectivity: ConnectivityState, outcome: Option<PollOutcome>) -> DisplayState {
    if connectivity != ConnectivityState::Connected {
        return DisplayState::NetworkFault;
    }
    match outcome {
        Some(PollOutcome::Success(color)) => DisplayState::Fetched(color),
        Some(PollOutcome::ServerError) => DisplayState::ServerFault,
        Some(PollOutcome::NetworkError) | None => DisplayState::NetworkFault,
    }
}

/// Log a display change; unchanged states stay silent
pub fn log_transition(previous: DisplayState, next: DisplayState) {
    if previous == next {
        return;
    }
    match next {
        DisplayState::Fetched(color) => {
            if previous.system_state() != SystemState::Normal {
                info!("[STATE] System operational");
            }
            info!("[STATE] Showing color {}", color);
        }
        DisplayState::NetworkFault | DisplayState::ServerFault => {
            warn!("[STATE] Error state: {:?}", next.system_state());
        }
        DisplayState::Startup => {}
    }
}
