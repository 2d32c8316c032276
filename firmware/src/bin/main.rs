//! Matrix Clock Firmware - ESP32 HUB75 date/time and affirmation ticker
//!
//! Environment variables required:
//! - WIFI_SSID: WiFi network name
//! - WIFI_PASS: WiFi password
//!
//! Optional:
//! - TIME_URL: time endpoint (timeapi.io, Europe/Dublin by default)
//! - TEXT_URL: text endpoint (affirmations.dev by default)

#![no_std]
#![no_main]

extern crate alloc;

use embassy_executor::Spawner;
use embassy_net::{
    Runner, Stack, StackResources,
    dns::DnsSocket,
    tcp::client::{TcpClient, TcpClientState},
};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Timer};
use esp_alloc as _;
use esp_backtrace as _;
use esp_hal::{
    clock::CpuClock,
    gpio::{Level, Output, OutputConfig},
    ram,
    rng::Rng,
    rtc_cntl::Rtc,
    system::{CpuControl, Stack as CoreStack},
    timer::timg::TimerGroup,
};
use esp_println::println;
use esp_radio::{
    Controller,
    wifi::{ClientConfig, Config as WifiConfig, ModeConfig, WifiController, WifiDevice, WifiEvent},
};
use matrix_clock_core::config::{DEFAULT_TEXT_URL, DEFAULT_TIME_URL};
use matrix_clock_core::fetch::BODY_BUF_SIZE;
use matrix_clock_core::workers::{carousel_worker, clock_worker};
use matrix_clock_core::{ClockConfig, DisplayArbiter, FetchBroker};
use matrix_clock_firmware::framebuffer::{Framebuffer, FramebufferWriter};
use matrix_clock_firmware::panel::{Hub75, Hub75Pins};
use matrix_clock_firmware::platform::{DeepSleep, EmbassyTimebase};
use matrix_clock_firmware::transport::{HttpsTransport, TCP_BUF_SIZE, TCP_SOCKETS, Tcp};

esp_bootloader_esp_idf::esp_app_desc!();

macro_rules! mk_static {
    ($t:ty,$val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write(($val));
        x
    }};
}

const SSID: &str = env!("WIFI_SSID");
const PASSWORD: &str = env!("WIFI_PASS");

const TIME_URL: &str = match option_env!("TIME_URL") {
    Some(url) => url,
    None => DEFAULT_TIME_URL,
};
const TEXT_URL: &str = match option_env!("TEXT_URL") {
    Some(url) => url,
    None => DEFAULT_TEXT_URL,
};

/// Stack for the panel scan-out on the app core
const SCAN_STACK_SIZE: usize = 4096;

type Broker = FetchBroker<CriticalSectionRawMutex>;
type Arbiter = DisplayArbiter<CriticalSectionRawMutex, FramebufferWriter<'static>>;

/// Pixels scanned out by the app core
static FRAMEBUFFER: Framebuffer = Framebuffer::new();
/// The only way to draw on [`FRAMEBUFFER`]
static ARBITER: Arbiter = DisplayArbiter::new(FRAMEBUFFER.writer());
/// Single owner of the network fetches
static BROKER: Broker = FetchBroker::new();

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    // Init logger first so we can see any early crashes
    esp_println::logger::init_logger_from_env();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    println!("Boot! Wake reason: {:?}", esp_hal::rtc_cntl::wakeup_cause());

    esp_alloc::heap_allocator!(#[ram(reclaimed)] size: 64 * 1024);
    esp_alloc::heap_allocator!(size: 36 * 1024);

    println!("Starting RTOS...");
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // ==================== HUB75 Panel ====================
    // R1=25 G1=26 B1=27 R2=21 G2=22 B2=23 A=12 B=16 C=17 D=18 CLK=15 LAT=32 OE=33
    let pins = Hub75Pins {
        r1: Output::new(peripherals.GPIO25, Level::Low, OutputConfig::default()),
        g1: Output::new(peripherals.GPIO26, Level::Low, OutputConfig::default()),
        b1: Output::new(peripherals.GPIO27, Level::Low, OutputConfig::default()),
        r2: Output::new(peripherals.GPIO21, Level::Low, OutputConfig::default()),
        g2: Output::new(peripherals.GPIO22, Level::Low, OutputConfig::default()),
        b2: Output::new(peripherals.GPIO23, Level::Low, OutputConfig::default()),
        a: Output::new(peripherals.GPIO12, Level::Low, OutputConfig::default()),
        b: Output::new(peripherals.GPIO16, Level::Low, OutputConfig::default()),
        c: Output::new(peripherals.GPIO17, Level::Low, OutputConfig::default()),
        d: Output::new(peripherals.GPIO18, Level::Low, OutputConfig::default()),
        clk: Output::new(peripherals.GPIO15, Level::Low, OutputConfig::default()),
        lat: Output::new(peripherals.GPIO32, Level::Low, OutputConfig::default()),
        oe: Output::new(peripherals.GPIO33, Level::High, OutputConfig::default()),
    };

    // The panel must be refreshed continuously; give it the whole app core
    let mut cpu_control = CpuControl::new(peripherals.CPU_CTRL);
    let scan_stack = mk_static!(CoreStack<SCAN_STACK_SIZE>, CoreStack::new());
    let _scan_guard = cpu_control
        .start_app_core(scan_stack, move || Hub75::new(pins).run(&FRAMEBUFFER))
        .expect("App core start failed");
    println!("Panel scan-out running on app core");

    // ==================== RTC for Deep Sleep ====================
    let hibernator = DeepSleep::new(Rtc::new(peripherals.LPWR));

    let clock_config: &'static ClockConfig = mk_static!(
        ClockConfig,
        ClockConfig {
            time_url: TIME_URL,
            text_url: TEXT_URL,
            ..ClockConfig::default()
        }
    );
    println!("Time URL: {}", TIME_URL);
    println!("Text URL: {}", TEXT_URL);

    // Draw and tick right away; fetches queue until the network is up
    spawner.spawn(clock_task(clock_config, hibernator)).ok();
    spawner.spawn(carousel_task(clock_config)).ok();

    // ==================== WiFi Setup ====================
    println!("Initializing WiFi...");
    let rng = Rng::new();
    let radio = mk_static!(Controller<'static>, esp_radio::init().expect("Radio init failed"));
    let (wifi_controller, interfaces) =
        esp_radio::wifi::new(radio, peripherals.WIFI, WifiConfig::default()).expect("WiFi init failed");

    let net_config = embassy_net::Config::dhcpv4(Default::default());
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        net_config,
        mk_static!(StackResources<3>, StackResources::<3>::new()),
        rng.random() as u64,
    );
    spawner.spawn(net_task(runner)).ok();
    spawner.spawn(connection_task(wifi_controller)).ok();

    let tcp_state = mk_static!(
        TcpClientState<TCP_SOCKETS, TCP_BUF_SIZE, TCP_BUF_SIZE>,
        TcpClientState::new()
    );
    let tcp = mk_static!(Tcp, TcpClient::new(stack, tcp_state));
    let dns = mk_static!(DnsSocket<'static>, DnsSocket::new(stack));
    let tls_seed = (rng.random() as u64) << 32 | rng.random() as u64;
    let transport = HttpsTransport::new(tcp, dns, tls_seed);
    let body_buf = mk_static!([u8; BODY_BUF_SIZE], [0u8; BODY_BUF_SIZE]);

    spawner.spawn(fetch_task(stack, clock_config, transport, body_buf)).ok();

    loop {
        Timer::after(Duration::from_secs(3600)).await;
    }
}

/// Keep the date/time current, hibernating at night
#[embassy_executor::task]
async fn clock_task(config: &'static ClockConfig, mut hibernator: DeepSleep) {
    clock_worker(config, &EmbassyTimebase, &ARBITER, &BROKER, &mut hibernator).await;
}

/// Scroll affirmations on the bottom row
#[embassy_executor::task]
async fn carousel_task(config: &'static ClockConfig) {
    carousel_worker(config, &EmbassyTimebase, &ARBITER, &BROKER).await
}

/// Serve fetch requests from both workers, one at a time
#[embassy_executor::task]
async fn fetch_task(
    stack: Stack<'static>,
    config: &'static ClockConfig,
    mut transport: HttpsTransport,
    body_buf: &'static mut [u8; BODY_BUF_SIZE],
) {
    println!("Waiting for IP...");
    stack.wait_config_up().await;
    if let Some(ip) = stack.config_v4() {
        println!("Got IP: {}", ip.address);
    }
    BROKER.serve(config, &mut transport, body_buf).await
}

/// Connect to WiFi and reconnect whenever the link drops
#[embassy_executor::task]
async fn connection_task(mut controller: WifiController<'static>) {
    let client_config = ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(SSID.into())
            .with_password(PASSWORD.into()),
    );

    loop {
        if !matches!(controller.is_started(), Ok(true)) {
            if let Err(e) = controller.set_config(&client_config) {
                println!("WiFi config error: {:?}", e);
            }
            println!("Starting WiFi...");
            if let Err(e) = controller.start_async().await {
                println!("WiFi start error: {:?}", e);
                Timer::after(Duration::from_secs(5)).await;
                continue;
            }
            println!("WiFi started!");
        }

        println!("Connecting to {}...", SSID);
        match controller.connect_async().await {
            Ok(_) => {
                println!("WiFi connected!");
                controller.wait_for_event(WifiEvent::StaDisconnected).await;
                println!("WiFi disconnected");
            }
            Err(e) => {
                println!("Failed to connect: {e:?}, retrying...");
                Timer::after(Duration::from_secs(5)).await;
            }
        }
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}
