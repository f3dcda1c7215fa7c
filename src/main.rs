#![no_std]
#![no_main]

use blocking_network_stack::Stack;
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::rmt::Rmt;
use esp_hal::rng::Rng;
use esp_hal::rtc_cntl::Rtc;
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_hal_smartled::{SmartLedsAdapter, smart_led_buffer};
use esp_wifi::wifi::{self, WifiDevice};
use log::{LevelFilter, error, info};
use smoltcp::iface::{Config, Interface, SocketSet, SocketStorage};
use smoltcp::socket::{dhcpv4, dns, tcp};
use smoltcp::wire::{EthernetAddress, HardwareAddress};

use jacket_board::color_client::RESPONSE_BUFFER_SIZE;
use jacket_board::config::{self, Settings};
use jacket_board::control_loop::ControlLoop;
use jacket_board::hardware::net::{EspHttpTransport, EspWifiLink};
use jacket_board::hardware::now_millis;
use jacket_board::hardware::watchdog::RtcWatchdog;

extern crate alloc;

// The strip is wired to GPIO2 below
const _: () = assert!(config::LED_DATA_PIN == 2);

// Add app descriptor for espflash compatibility
esp_bootloader_esp_idf::esp_app_desc!();

// Once the loop is running the watchdog turns a panic into a reset
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    error!("[MAIN] Panic: {}", info);
    loop {}
}

/// Park the board after an unrecoverable init failure
fn halt(what: &str) -> ! {
    error!("[MAIN] {} failed, halting", what);
    loop {}
}

fn create_interface(device: &mut WifiDevice<'_>) -> Interface {
    Interface::new(
        Config::new(HardwareAddress::Ethernet(EthernetAddress::from_bytes(
            &device.mac_address(),
        ))),
        device,
        smoltcp::time::Instant::from_millis(now_millis() as i64),
    )
}

#[esp_hal::main]
fn main() -> ! {
    esp_println::logger::init_logger(LevelFilter::Info);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Initialize heap allocator for WiFi (72KB)
    esp_alloc::heap_allocator!(size: 72 * 1024);

    info!("[MAIN] Jacket board v{} starting", jacket_board::VERSION);

    let rtc = Rtc::new(peripherals.LPWR);
    let watchdog = RtcWatchdog::new(rtc.rwdt);

    // Initialize WiFi driver
    let timer_group1 = TimerGroup::new(peripherals.TIMG1);
    let mut rng = Rng::new(peripherals.RNG);
    let seed = rng.random();
    let wifi_init = match esp_wifi::init(timer_group1.timer0, rng, peripherals.RADIO_CLK) {
        Ok(init) => init,
        Err(e) => {
            error!("[WIFI] Driver init error: {:?}", e);
            halt("WiFi driver init")
        }
    };
    let (wifi_controller, wifi_interfaces) = match wifi::new(&wifi_init, peripherals.WIFI) {
        Ok(parts) => parts,
        Err(e) => {
            error!("[WIFI] Controller error: {:?}", e);
            halt("WiFi controller creation")
        }
    };
    let mut wifi_device = wifi_interfaces.sta;
    info!("[WIFI] WiFi driver initialized successfully");

    // The receive window holds a whole response, so nothing the client can
    // parse is left sitting in the socket
    let mut rx_buffer = [0u8; RESPONSE_BUFFER_SIZE];
    let mut tx_buffer = [0u8; 1024];
    let mut dns_queries: [Option<dns::DnsQuery>; 1] = Default::default();

    // DHCP configures the address and the DNS server for lookups
    let iface = create_interface(&mut wifi_device);
    let mut socket_entries: [SocketStorage; 3] = Default::default();
    let mut socket_set = SocketSet::new(&mut socket_entries[..]);
    socket_set.add(dhcpv4::Socket::new());
    socket_set.add(dns::Socket::new(&[], &mut dns_queries[..]));
    let http_socket = socket_set.add(tcp::Socket::new(
        tcp::SocketBuffer::new(&mut rx_buffer[..]),
        tcp::SocketBuffer::new(&mut tx_buffer[..]),
    ));
    let stack = Stack::new(iface, wifi_device, socket_set, now_millis, seed);
    info!("[WIFI] Network stack created with DHCP configuration");

    let settings = Settings::from_build_env();
    let link = EspWifiLink::new(wifi_controller, &stack);
    let transport = EspHttpTransport::new(&stack, http_socket, settings.timing.http_timeout_ms);

    info!(
        "[LED] Driving {} LEDs on GPIO{}",
        config::LED_COUNT,
        config::LED_DATA_PIN
    );
    let rmt = match Rmt::new(peripherals.RMT, Rate::from_mhz(80)) {
        Ok(rmt) => rmt,
        Err(e) => {
            error!("[LED] Failed to initialize RMT: {:?}", e);
            halt("RMT init")
        }
    };
    let strip = SmartLedsAdapter::new(
        rmt.channel0,
        peripherals.GPIO2,
        smart_led_buffer!(config::LED_COUNT),
    );

    info!("[MAIN] Entering control loop");
    ControlLoop::new(settings, link, transport, strip, watchdog, Delay::new()).run()
}
