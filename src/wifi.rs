//! WiFi module for ESP32-C3 board
//!
//! Keeps the station associated with the configured network. The manager is
//! driven once per control-loop iteration and never retries on its own: a
//! failed attempt is reported as [`ConnectivityState::Disconnected`] and the
//! next iteration tries again.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::BoardError;
use crate::config::{Credentials, LINK_POLL_STEP_MS};

/// Association state as seen by the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Disconnected,
    Connecting,
    Connected,
}

/// Radio and IP stack of the board
pub trait WifiLink {
    /// Start associating with the given network. Must not block for long.
    fn begin_association(&mut self, credentials: &Credentials<'_>) -> Result<(), BoardError>;

    /// Associated and holding an IP address
    fn is_link_up(&mut self) -> bool;

    /// Give the IP stack a chance to run (DHCP, ARP)
    fn poll(&mut self);
}

/// WiFi manager for handling network connectivity
pub struct WiFiManager<L, D> {
    link: L,
    delay: D,
    state: ConnectivityState,
    connect_timeout_ms: u32,
    association_attempts: u32,
}

impl<L: WifiLink, D: DelayNs> WiFiManager<L, D> {
    /// Create a new WiFi manager instance
    pub fn new(link: L, delay: D, connect_timeout_ms: u32) -> Self {
        Self {
            link,
            delay,
            state: ConnectivityState::Disconnected,
            connect_timeout_ms,
            association_attempts: 0,
        }
    }

    /// Make sure the link is up, associating if needed.
    ///
    /// Returns at once when already connected; otherwise blocks for at most
    /// the connect timeout.
    pub fn ensure_connected(&mut self, credentials: &Credentials<'_>) -> ConnectivityState {
        if self.state == ConnectivityState::Connected {
            self.link.poll();
            if self.link.is_link_up() {
                return self.state;
            }
            warn!("[WIFI] WiFi connection lost!");
        }

        self.state = ConnectivityState::Connecting;
        self.association_attempts = self.association_attempts.wrapping_add(1);
        info!(
            "[WIFI] Connecting to WiFi network: {} (attempt {})",
            credentials.ssid, self.association_attempts
        );

        if let Err(e) = self.link.begin_association(credentials) {
            warn!("[WIFI] Failed to start association: {}", e);
            self.state = ConnectivityState::Disconnected;
            return self.state;
        }

        let steps = self.connect_timeout_ms.div_ceil(LINK_POLL_STEP_MS).max(1);
        for _ in 0..steps {
            self.link.poll();
            if self.link.is_link_up() {
                info!("[WIFI] Successfully connected to WiFi network");
                self.state = ConnectivityState::Connected;
                return self.state;
            }
            self.delay.delay_ms(LINK_POLL_STEP_MS);
        }

        warn!(
            "[WIFI] Failed to connect to WiFi network within {} ms",
            self.connect_timeout_ms
        );
        self.state = ConnectivityState::Disconnected;
        self.state
    }

    /// Last state reported by [`Self::ensure_connected`]
    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    /// Number of association attempts since boot
    pub fn association_attempts(&self) -> u32 {
        self.association_attempts
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}

/// The name used by the rest of the firmware
pub type ConnectivityManager<L, D> = WiFiManager<L, D>;
