//! ESP32-C3 drivers behind the board traits
//!
//! - [`net`]: esp-wifi station plus a blocking smoltcp stack, providing
//!   [`crate::wifi::WifiLink`] and [`crate::color_client::HttpTransport`]
//! - [`watchdog`]: the RTC watchdog as [`crate::watchdog::Watchdog`]
//!
//! The LED chain needs no wrapper: `esp_hal_smartled::SmartLedsAdapter`
//! already implements `smart_leds::SmartLedsWrite`.

pub mod net;
pub mod watchdog;

/// Milliseconds since boot, as the network stack expects
pub fn now_millis() -> u64 {
    esp_hal::time::Instant::now()
        .duration_since_epoch()
        .as_millis()
}
