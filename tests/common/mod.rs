//! Host fakes for the board seams. Time is simulated: delays and slow
//! requests advance a shared clock, and the fake watchdog checks it.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use jacket_board::BoardError;
use jacket_board::color::Color;
use jacket_board::color_client::{HttpTransport, TransportError};
use jacket_board::config::{Credentials, LED_COUNT, Settings, Timing};
use jacket_board::http::Request;
use jacket_board::watchdog::Watchdog;
use jacket_board::wifi::WifiLink;
use smart_leds::SmartLedsWrite;

pub const SERVER_URL: &str = "http://192.168.1.100:5000";

pub fn settings() -> Settings<'static> {
    Settings {
        credentials: Credentials {
            ssid: "jacket-net",
            password: "hunter2",
        },
        server_url: SERVER_URL,
        api_key: "test-key",
        led_count: LED_COUNT,
        timing: Timing::default(),
    }
}

/// Simulated monotonic clock in nanoseconds
#[derive(Clone, Default)]
pub struct SimClock(Rc<Cell<u64>>);

impl SimClock {
    pub fn now_ms(&self) -> u64 {
        self.0.get() / 1_000_000
    }

    pub fn advance_ms(&self, ms: u64) {
        self.0.set(self.0.get() + ms * 1_000_000);
    }

    fn advance_ns(&self, ns: u64) {
        self.0.set(self.0.get() + ns);
    }
}

#[derive(Clone)]
pub struct SimDelay(pub SimClock);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.advance_ns(ns as u64);
    }
}

/// Station that associates on the first poll while the access point is reachable
#[derive(Default)]
pub struct FakeLink {
    pub reachable: bool,
    pub up: bool,
    pub associations: u32,
    associating: bool,
}

impl FakeLink {
    pub fn reachable() -> Self {
        Self {
            reachable: true,
            ..Default::default()
        }
    }

    pub fn drop_link(&mut self) {
        self.reachable = false;
        self.up = false;
    }

    pub fn restore(&mut self) {
        self.reachable = true;
    }
}

impl WifiLink for FakeLink {
    fn begin_association(&mut self, _: &Credentials<'_>) -> Result<(), BoardError> {
        self.associations += 1;
        self.associating = true;
        Ok(())
    }

    fn is_link_up(&mut self) -> bool {
        self.up
    }

    fn poll(&mut self) {
        if self.associating && self.reachable {
            self.up = true;
            self.associating = false;
        }
    }
}

/// Answers requests from a queue; an empty queue behaves like a dead server
pub struct FakeTransport {
    replies: VecDeque<Result<Vec<u8>, TransportError>>,
    clock: SimClock,
    pub latency_ms: u64,
    pub requests: Vec<String>,
}

impl FakeTransport {
    pub fn new(clock: SimClock) -> Self {
        Self {
            replies: VecDeque::new(),
            clock,
            latency_ms: 0,
            requests: Vec::new(),
        }
    }

    pub fn push_json(&mut self, status: u16, body: &str) {
        let raw = format!(
            "HTTP/1.0 {} STATUS\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        self.replies.push_back(Ok(raw.into_bytes()));
    }

    pub fn push_color(&mut self, r: u8, g: u8, b: u8) {
        self.push_json(200, &format!("{{\"color\": {{\"rgb\": [{}, {}, {}]}}}}", r, g, b));
    }

    pub fn push_error(&mut self, error: TransportError) {
        self.replies.push_back(Err(error));
    }
}

impl HttpTransport for FakeTransport {
    fn get(&mut self, request: &Request<'_>, response: &mut [u8]) -> Result<usize, TransportError> {
        let mut encoded = String::new();
        request.encode(&mut encoded).map_err(|_| TransportError::Io)?;
        self.requests.push(encoded);
        self.clock.advance_ms(self.latency_ms);

        let raw = self.replies.pop_front().unwrap_or(Err(TransportError::Timeout))?;
        response[..raw.len()].copy_from_slice(&raw);
        Ok(raw.len())
    }
}

/// Records every frame pushed
#[derive(Default)]
pub struct FakeStrip {
    pub frames: Vec<Vec<Color>>,
}

impl FakeStrip {
    /// Solid color of the latest frame; panics on mixed frames
    pub fn shown(&self) -> Color {
        let frame = self.frames.last().expect("nothing rendered yet");
        assert_eq!(frame.len(), LED_COUNT);
        assert!(frame.iter().all(|&c| c == frame[0]), "frame is not uniform");
        frame[0]
    }
}

impl SmartLedsWrite for FakeStrip {
    type Error = ();
    type Color = Color;

    fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        self.frames.push(iterator.into_iter().map(Into::into).collect());
        Ok(())
    }
}

/// Reset timer over the simulated clock; remembers whether it ever expired
pub struct SimWatchdog {
    clock: SimClock,
    timeout_ms: Option<u64>,
    last_feed_ms: u64,
    pub feeds: u32,
    expired: Cell<bool>,
}

impl SimWatchdog {
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            timeout_ms: None,
            last_feed_ms: 0,
            feeds: 0,
            expired: Cell::new(false),
        }
    }

    /// Would the hardware have reset the chip by now?
    pub fn check(&self) -> bool {
        if let Some(timeout) = self.timeout_ms {
            if self.clock.now_ms() - self.last_feed_ms > timeout {
                self.expired.set(true);
            }
        }
        self.expired.get()
    }
}

impl Watchdog for SimWatchdog {
    fn arm(&mut self, timeout_ms: u32) {
        self.timeout_ms = Some(timeout_ms as u64);
        self.last_feed_ms = self.clock.now_ms();
    }

    fn feed(&mut self) {
        self.check();
        self.feeds += 1;
        self.last_feed_ms = self.clock.now_ms();
    }
}
