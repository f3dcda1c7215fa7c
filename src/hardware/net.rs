//! WiFi station and blocking HTTP transport
//!
//! Uses esp-wifi for the radio and blocking-network-stack (smoltcp) for
//! DHCP, DNS and TCP. Nothing here spawns tasks: the stack only runs when
//! `work()` is called from the control loop.

use blocking_network_stack::Stack;
use esp_wifi::wifi::{AuthMethod, ClientConfiguration, Configuration, WifiController};
use heapless::String;
use log::{debug, info, warn};
use smoltcp::iface::SocketHandle;
use smoltcp::phy::Device;
use smoltcp::socket::tcp::{self, State};
use smoltcp::time::Duration;
use smoltcp::wire::{DnsQueryType, IpAddress, Ipv4Address};

use super::now_millis;
use crate::BoardError;
use crate::color_client::{HttpTransport, Step, TransportError, poll_until};
use crate::config::Credentials;
use crate::http::{Host, Request};
use crate::wifi::WifiLink;

/// Largest request head we send
const MAX_REQUEST_SIZE: usize = 512;

/// Time given to the server to see our FIN before the socket is reused
const DISCONNECT_GRACE_MS: u64 = 200;

/// WiFi station with the IP stack on top
pub struct EspWifiLink<'a, 's, 'n, D: Device> {
    controller: WifiController<'a>,
    stack: &'s Stack<'n, D>,
    started: bool,
    was_up: bool,
}

impl<'a, 's, 'n, D: Device> EspWifiLink<'a, 's, 'n, D> {
    pub fn new(controller: WifiController<'a>, stack: &'s Stack<'n, D>) -> Self {
        Self {
            controller,
            stack,
            started: false,
            was_up: false,
        }
    }

    fn log_ip_info(&self) {
        match self.stack.get_ip_info() {
            Ok(info) => info!("[DHCP] IP address obtained: {:?}", info.ip),
            Err(e) => warn!("[DHCP] IP configuration not available: {:?}", e),
        }
    }
}

impl<D: Device> WifiLink for EspWifiLink<'_, '_, '_, D> {
    fn begin_association(&mut self, credentials: &Credentials<'_>) -> Result<(), BoardError> {
        if !self.started {
            let client_config = ClientConfiguration {
                ssid: credentials.ssid.try_into().map_err(|_| BoardError::WiFiError)?,
                password: credentials
                    .password
                    .try_into()
                    .map_err(|_| BoardError::WiFiError)?,
                auth_method: AuthMethod::WPA2Personal,
                ..Default::default()
            };
            self.controller
                .set_configuration(&Configuration::Client(client_config))
                .map_err(|_| BoardError::WiFiError)?;
            self.controller.start().map_err(|_| BoardError::WiFiError)?;
            self.started = true;
        } else {
            // Drop a half-open association before trying again
            let _ = self.controller.disconnect();
        }

        self.was_up = false;
        self.controller.connect().map_err(|e| {
            warn!("[WIFI] Connect request rejected: {:?}", e);
            BoardError::WiFiError
        })
    }

    fn is_link_up(&mut self) -> bool {
        let up = self.controller.is_connected().unwrap_or(false) && self.stack.is_iface_up();
        if up && !self.was_up {
            self.log_ip_info();
        }
        self.was_up = up;
        up
    }

    fn poll(&mut self) {
        self.stack.work();
    }
}

/// First ephemeral port handed to outgoing connections
const LOCAL_PORT_BASE: u16 = 49152;

/// HTTP GETs over one TCP socket registered in the stack's socket set.
///
/// The socket is driven directly through smoltcp: connect, send and receive
/// are each stepped with [`poll_until`] against one deadline per request, so
/// a refused or unanswered connection ends as an error instead of a hang.
pub struct EspHttpTransport<'s, 'n, D: Device> {
    stack: &'s Stack<'n, D>,
    handle: SocketHandle,
    timeout_ms: u64,
    local_port: u16,
}

impl<'s, 'n, D: Device> EspHttpTransport<'s, 'n, D> {
    /// `handle` must name a TCP socket added to the stack's socket set
    pub fn new(stack: &'s Stack<'n, D>, handle: SocketHandle, timeout_ms: u32) -> Self {
        Self {
            stack,
            handle,
            timeout_ms: timeout_ms as u64,
            local_port: LOCAL_PORT_BASE + (now_millis() % 8192) as u16,
        }
    }

    fn with_socket<R>(&self, f: impl FnOnce(&mut tcp::Socket<'n>) -> R) -> R {
        let handle = self.handle;
        self.stack
            .with_mut(|_, _, sockets| f(sockets.get_mut::<tcp::Socket<'n>>(handle)))
    }

    fn next_local_port(&mut self) -> u16 {
        self.local_port = match self.local_port.checked_add(1) {
            Some(port) => port,
            None => LOCAL_PORT_BASE,
        };
        self.local_port
    }

    fn resolve(&self, host: Host<'_>) -> Result<IpAddress, TransportError> {
        match host {
            Host::Ipv4(ip) => {
                let [a, b, c, d] = ip.octets();
                Ok(IpAddress::Ipv4(Ipv4Address::new(a, b, c, d)))
            }
            Host::Name(name) => {
                let addresses = self.stack.dns_query(name, DnsQueryType::A).map_err(|e| {
                    warn!("[HTTP] DNS lookup for {} failed: {:?}", name, e);
                    TransportError::Dns
                })?;
                addresses.first().copied().ok_or(TransportError::Dns)
            }
        }
    }

    fn connect(&mut self, addr: IpAddress, port: u16, deadline: u64) -> Result<(), TransportError> {
        let local_port = self.next_local_port();
        let handle = self.handle;
        // smoltcp closes the socket on its own if nothing is acknowledged in time
        let idle = Duration::from_millis(deadline.saturating_sub(now_millis()).max(1));

        self.stack
            .with_mut(|iface, _, sockets| {
                let socket = sockets.get_mut::<tcp::Socket<'n>>(handle);
                socket.abort();
                socket.set_timeout(Some(idle));
                socket.connect(iface.context(), (addr, port), local_port)
            })
            .map_err(|e| {
                warn!("[HTTP] Connect to {}:{} rejected: {:?}", addr, port, e);
                TransportError::Connect
            })?;

        poll_until(deadline, now_millis, || {
            self.stack.work();
            self.with_socket(|socket| match socket.state() {
                State::Established => Step::Done(()),
                State::SynSent | State::SynReceived => Step::Pending,
                // Reset by the peer, or given up by smoltcp
                _ => Step::Failed(TransportError::Connect),
            })
        })?;
        debug!("[HTTP] Connected to {}:{}", addr, port);
        Ok(())
    }

    fn send(&self, bytes: &[u8], deadline: u64) -> Result<(), TransportError> {
        let mut sent = 0;
        poll_until(deadline, now_millis, || {
            self.stack.work();
            self.with_socket(|socket| {
                if !socket.may_send() {
                    return Step::Failed(TransportError::Io);
                }
                if socket.can_send() {
                    match socket.send_slice(&bytes[sent..]) {
                        Ok(len) => sent += len,
                        Err(_) => return Step::Failed(TransportError::Io),
                    }
                }
                if sent == bytes.len() {
                    Step::Done(())
                } else {
                    Step::Pending
                }
            })
        })
    }

    /// Read until the server closes, the buffer is full or the deadline passes
    fn receive(&self, response: &mut [u8], deadline: u64) -> Result<usize, TransportError> {
        let mut total = 0;
        poll_until(deadline, now_millis, || {
            self.stack.work();
            self.with_socket(|socket| {
                if socket.can_recv() {
                    match socket.recv_slice(&mut response[total..]) {
                        Ok(len) => total += len,
                        Err(_) => return Step::Failed(TransportError::Io),
                    }
                    if total == response.len() {
                        return Step::Done(());
                    }
                    Step::Pending
                } else if !socket.may_recv() {
                    Step::Done(())
                } else {
                    Step::Pending
                }
            })
        })?;

        if total == 0 {
            return Err(TransportError::NoResponse);
        }
        Ok(total)
    }

    fn exchange(
        &mut self,
        request: &Request<'_>,
        response: &mut [u8],
        deadline: u64,
    ) -> Result<usize, TransportError> {
        let addr = self.resolve(request.url.host)?;

        let mut head: String<MAX_REQUEST_SIZE> = String::new();
        request.encode(&mut head).map_err(|_| TransportError::Io)?;

        self.connect(addr, request.url.port, deadline)?;
        self.send(head.as_bytes(), deadline)?;
        self.receive(response, deadline)
    }

    fn release(&self) {
        self.with_socket(|socket| socket.close());
        let grace = now_millis() + DISCONNECT_GRACE_MS;
        while now_millis() < grace && self.with_socket(|socket| socket.state() != State::Closed) {
            self.stack.work();
        }
        self.with_socket(|socket| socket.abort());
        self.stack.work();
    }
}

impl<D: Device> HttpTransport for EspHttpTransport<'_, '_, D> {
    fn get(&mut self, request: &Request<'_>, response: &mut [u8]) -> Result<usize, TransportError> {
        let deadline = now_millis() + self.timeout_ms;
        let result = self.exchange(request, response, deadline);

        // Always release the connection so the next poll starts clean
        self.release();

        result
    }
}
