#![cfg_attr(not(test), no_std)]

//! ESP32-C3 Jacket Light Board Library
//!
//! This library implements a WiFi-connected LED jacket controller that polls a
//! color service and paints the returned color onto chained WS2812 strips,
//! with an RTC watchdog guaranteeing the board never stays hung.
//!
//! Everything outside [`hardware`] is hardware-agnostic and talks to the
//! board through small traits, so the control loop runs on the host in tests.

pub mod color;
pub mod color_client;
pub mod control_loop;
pub mod http;
pub mod led_control;
pub mod state_machine;
pub mod watchdog;
pub mod wifi;

#[cfg(feature = "device")]
pub mod hardware;

/// Project version information
pub const VERSION: &str = "0.1.0-dev";

/// Default configuration constants
pub mod config {
    use crate::BoardError;

    /// WiFi and color service configuration
    /// Read from environment variables at compile time
    pub const WIFI_SSID: &str = env!("WIFI_SSID");
    pub const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");
    pub const SERVER_URL: &str = env!("SERVER_URL");
    pub const API_KEY: &str = env!("API_KEY");

    /// GPIO wired to the strip data line; the firmware binaries assert
    /// that the peripheral they hand to the RMT adapter matches
    pub const LED_DATA_PIN: u8 = 2;

    /// Physical strips chained on the data line
    pub const STRIP_COUNT: usize = 6;

    /// LEDs on each strip
    pub const LEDS_PER_STRIP: usize = 14;

    /// Total LEDs driven by the board
    pub const LED_COUNT: usize = STRIP_COUNT * LEDS_PER_STRIP;

    /// Color service endpoint, appended to the base URL
    pub const COLOR_PATH: &str = "/api/v1/color";

    /// Header carrying the API key
    pub const API_KEY_HEADER: &str = "X-API-Key";

    /// Fixed cadence of the control loop; also the retry interval
    pub const POLL_INTERVAL_MS: u32 = 5000;

    /// Upper bound for one color request, DNS and connect included
    pub const HTTP_TIMEOUT_MS: u32 = 10000;

    /// WiFi connection timeout in milliseconds
    pub const WIFI_CONNECT_TIMEOUT_MS: u32 = 10000;

    /// Step between link checks while waiting for association
    pub const LINK_POLL_STEP_MS: u32 = 100;

    /// Duration of the boot flash
    pub const STARTUP_FLASH_MS: u32 = 500;

    /// Network name and passphrase
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Credentials<'a> {
        pub ssid: &'a str,
        pub password: &'a str,
    }

    /// Timing budget of one loop iteration
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Timing {
        pub poll_interval_ms: u32,
        pub connect_timeout_ms: u32,
        pub http_timeout_ms: u32,
        pub startup_flash_ms: u32,
        pub watchdog_timeout_ms: u32,
    }

    impl Timing {
        /// Longest possible iteration: a full association attempt, a full
        /// request and the sleep.
        pub const fn worst_case_period_ms(&self) -> u32 {
            self.connect_timeout_ms
                .saturating_add(self.http_timeout_ms)
                .saturating_add(self.poll_interval_ms)
        }

        /// Watchdog timeout giving a slow iteration the same slack again
        pub const fn default_watchdog_timeout_ms(&self) -> u32 {
            self.worst_case_period_ms().saturating_mul(2)
        }

        /// The watchdog must never fire during a legitimately slow iteration
        pub fn validate(&self) -> Result<(), BoardError> {
            if self.poll_interval_ms == 0 || self.watchdog_timeout_ms <= self.worst_case_period_ms() {
                return Err(BoardError::ConfigError);
            }
            Ok(())
        }
    }

    impl Default for Timing {
        fn default() -> Self {
            let mut timing = Self {
                poll_interval_ms: POLL_INTERVAL_MS,
                connect_timeout_ms: WIFI_CONNECT_TIMEOUT_MS,
                http_timeout_ms: HTTP_TIMEOUT_MS,
                startup_flash_ms: STARTUP_FLASH_MS,
                watchdog_timeout_ms: 0,
            };
            timing.watchdog_timeout_ms = timing.default_watchdog_timeout_ms();
            timing
        }
    }

    /// Everything loaded once at boot; immutable afterwards
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Settings<'a> {
        pub credentials: Credentials<'a>,
        pub server_url: &'a str,
        pub api_key: &'a str,
        pub led_count: usize,
        pub timing: Timing,
    }

    impl Settings<'static> {
        /// Settings baked in by the build script
        pub fn from_build_env() -> Self {
            Self {
                credentials: Credentials {
                    ssid: WIFI_SSID,
                    password: WIFI_PASSWORD,
                },
                server_url: SERVER_URL,
                api_key: API_KEY,
                led_count: LED_COUNT,
                timing: Timing::default(),
            }
        }
    }

    impl Settings<'_> {
        pub fn validate(&self) -> Result<(), BoardError> {
            if self.credentials.ssid.is_empty() || self.server_url.is_empty() {
                return Err(BoardError::ConfigError);
            }
            if self.led_count != LED_COUNT {
                return Err(BoardError::ConfigError);
            }
            self.timing.validate()
        }
    }
}

/// Error types for the jacket light board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    /// No or lost network association
    WiFiError,
    /// Request sent but no usable response
    TransportError,
    /// Response received but malformed or non-success
    ProtocolError,
    /// LED control error
    LedError,
    /// Invalid compile-time configuration
    ConfigError,
    /// System error
    SystemError,
}

impl core::fmt::Display for BoardError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            BoardError::WiFiError => "wifi association failed",
            BoardError::TransportError => "color request failed in transport",
            BoardError::ProtocolError => "color service returned an unusable response",
            BoardError::LedError => "led push failed",
            BoardError::ConfigError => "invalid configuration",
            BoardError::SystemError => "system error",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for BoardError {}
