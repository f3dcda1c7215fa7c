//! Color service client
//!
//! One call, one request: `GET {base_url}/api/v1/color` with the API key
//! header. Retrying is the control loop's job.

use heapless::Vec;
use log::{debug, info, warn};
use serde::Deserialize;

use crate::color::Color;
use crate::config::{API_KEY_HEADER, COLOR_PATH};
use crate::http::{self, HttpError, Request, Url};

/// Receive buffer for the whole response, head included; matches the TCP
/// receive window so anything the socket can hold is also parsed
pub const RESPONSE_BUFFER_SIZE: usize = 1536;

/// Failures below HTTP: nothing usable came back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Host name could not be resolved
    Dns,
    /// TCP connection refused or could not be opened
    Connect,
    /// The per-request deadline passed
    Timeout,
    /// Socket reset or write/read failure
    Io,
    /// The server closed without sending a byte
    NoResponse,
}

/// Performs a single bounded GET and fills `response` with the raw bytes
pub trait HttpTransport {
    fn get(&mut self, request: &Request<'_>, response: &mut [u8]) -> Result<usize, TransportError>;
}

/// Progress of one non-blocking step of a transport phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<T> {
    Pending,
    Done(T),
    Failed(TransportError),
}

/// Repeat `step` until it finishes or the clock passes `deadline`.
///
/// Transports build connect, send and receive out of this so no phase can
/// outlive the request deadline, whatever the socket does.
pub fn poll_until<T>(
    deadline_ms: u64,
    mut now_ms: impl FnMut() -> u64,
    mut step: impl FnMut() -> Step<T>,
) -> Result<T, TransportError> {
    loop {
        match step() {
            Step::Done(value) => return Ok(value),
            Step::Failed(error) => return Err(error),
            Step::Pending => {}
        }
        if now_ms() > deadline_ms {
            return Err(TransportError::Timeout);
        }
    }
}

/// Result of one poll of the color service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Success(Color),
    NetworkError,
    ServerError,
}

/// Why a fetch did not produce a color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchError {
    /// Base URL cannot be used for a request
    Url(HttpError),
    Transport(TransportError),
    /// Bytes arrived but do not form an HTTP response
    MalformedResponse(HttpError),
    /// Non-2xx status code
    Status(u16),
    /// Body is not `{"color": {"rgb": [r, g, b]}}` with integer channels
    InvalidBody,
}

impl From<Result<Color, FetchError>> for PollOutcome {
    fn from(result: Result<Color, FetchError>) -> Self {
        match result {
            Ok(color) => PollOutcome::Success(color),
            Err(FetchError::Url(_) | FetchError::Transport(_)) => PollOutcome::NetworkError,
            Err(
                FetchError::MalformedResponse(_) | FetchError::Status(_) | FetchError::InvalidBody,
            ) => PollOutcome::ServerError,
        }
    }
}

#[derive(Deserialize)]
struct ColorResponse<C> {
    color: ColorField<C>,
}

#[derive(Deserialize)]
struct ColorField<C> {
    rgb: Vec<C, 3>,
}

/// Decode the service body; integer channels are clamped, anything else is rejected
pub fn decode_color(body: &[u8]) -> Result<Color, FetchError> {
    if let Ok((response, _)) = serde_json_core::from_slice::<ColorResponse<i64>>(body) {
        return match response.color.rgb.as_slice() {
            &[r, g, b] => Ok(Color::from_clamped(r, g, b)),
            _ => Err(FetchError::InvalidBody),
        };
    }

    // Integers past the i64 range only parse as floats
    let (response, _) =
        serde_json_core::from_slice::<ColorResponse<f64>>(body).map_err(|_| FetchError::InvalidBody)?;
    match response.color.rgb.as_slice() {
        &[r, g, b] => Ok(Color::from_clamped(
            saturate_channel(r)?,
            saturate_channel(g)?,
            saturate_channel(b)?,
        )),
        _ => Err(FetchError::InvalidBody),
    }
}

fn saturate_channel(value: f64) -> Result<i64, FetchError> {
    if value >= i64::MAX as f64 {
        Ok(i64::MAX)
    } else if value <= i64::MIN as f64 {
        Ok(i64::MIN)
    } else if (value as i64) as f64 == value {
        Ok(value as i64)
    } else {
        Err(FetchError::InvalidBody)
    }
}

/// HTTP client for the color service
pub struct ColorClient<T> {
    transport: T,
    buffer: [u8; RESPONSE_BUFFER_SIZE],
    requests_sent: u32,
}

impl<T: HttpTransport> ColorClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            buffer: [0; RESPONSE_BUFFER_SIZE],
            requests_sent: 0,
        }
    }

    /// Fetch the current target color and classify the outcome
    pub fn fetch_color(&mut self, base_url: &str, api_key: &str) -> PollOutcome {
        let result = self.fetch(base_url, api_key);
        match &result {
            Ok(color) => info!("[HTTP] Color received: {}", color),
            Err(e) => warn!("[HTTP] Color fetch failed: {:?}", e),
        }
        result.into()
    }

    /// Same as [`Self::fetch_color`] but keeps the failure reason
    pub fn fetch(&mut self, base_url: &str, api_key: &str) -> Result<Color, FetchError> {
        let url = Url::parse(base_url).map_err(FetchError::Url)?;
        let headers = [(API_KEY_HEADER, api_key), ("Accept", "application/json")];
        let request = Request {
            url,
            path: COLOR_PATH,
            headers: &headers,
        };

        self.requests_sent = self.requests_sent.wrapping_add(1);
        let len = self
            .transport
            .get(&request, &mut self.buffer)
            .map_err(FetchError::Transport)?;
        if len == 0 {
            return Err(FetchError::Transport(TransportError::NoResponse));
        }
        let len = len.min(self.buffer.len());
        debug!("[HTTP] Received {} bytes", len);

        let response = http::parse_response(&self.buffer[..len]).map_err(FetchError::MalformedResponse)?;
        if !response.is_success() {
            return Err(FetchError::Status(response.status));
        }
        decode_color(response.body)
    }

    /// Requests issued since boot
    pub fn requests_sent(&self) -> u32 {
        self.requests_sent
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
