#[cfg(target_os = "espidf")]
mod device;

#[cfg(target_os = "espidf")]
use device::{clock::SntpClock, wifi::WifiManager};

/// Connect, sync time and register; each step is shown on the panel
#[cfg(target_os = "espidf")]
fn bring_up(
    config: &stoppedclocks::Config,
    panel: &mut device::panel::Panel,
    api: &device::http::HttpApi,
    modem: esp_idf_svc::hal::modem::Modem,
) -> anyhow::Result<(WifiManager, SntpClock, String)> {
    use anyhow::Context;
    use std::time::Duration;

    panel.show_status("Connecting to WiFi...")?;
    let credentials = config.wifi.context("WIFI_SSID was not set at build time")?;
    let mut wifi = WifiManager::new(vec![credentials.into()], modem)?;
    wifi.connect()?;
    let screen_id = stoppedclocks::config::screen_id(wifi.mac()?);
    log::info!("Screen id: {}", screen_id);

    panel.show_status("Syncing time...")?;
    let clock = SntpClock::start(config.timezone)?;
    clock.wait_for_sync(Duration::from_secs(30))?;

    panel.show_status("Registering device...")?;
    if let Err(e) = api.register(&screen_id) {
        log::warn!("Registration failed: {:#}", e);
    }

    panel.show_status("Loading clock index...")?;
    Ok((wifi, clock, screen_id))
}

// https://docs.esp-rs.org/esp-idf-svc/esp_idf_svc/
#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use std::thread;
    use std::time::{Duration, Instant};

    use esp_idf_svc::hal::delay::Delay;
    use esp_idf_svc::hal::gpio::{self, InputPin, OutputPin, PinDriver, Pull};
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::prelude::*;
    use esp_idf_svc::hal::spi;
    use rand::{rngs::StdRng, SeedableRng};

    use device::button::Button;
    use device::http::HttpApi;
    use device::panel::{Panel, PANEL_SIZE};
    use device::pins::Pins;
    use stoppedclocks::{Config, DisplayCycle};

    const WIFI_CHECK_MS: u64 = 60_000;

    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    let reset_reason = esp_idf_svc::hal::reset::ResetReason::get();
    log::info!("Reset reason: {:?}", reset_reason);

    let config = Config::for_panel(PANEL_SIZE);

    let peripherals = Peripherals::take().expect("Could not take peripherals");
    let pins = peripherals.pins;

    let driver = spi::SpiDeviceDriver::new_single(
        peripherals.spi2,
        pins.gpio12,                    // SCK - Pins::SCK
        pins.gpio11,                    // MOSI - Pins::MOSI
        Option::<gpio::AnyIOPin>::None, // No MISO needed for display
        Some(pins.gpio45),              // CS - Pins::CS
        &spi::SpiDriverConfig::new(),
        &spi::SpiConfig::new().baudrate(4.MHz().into()),
    )?;

    log::info!("Enabling display power (pin {})", Pins::DISPLAY_POWER);
    let mut power = PinDriver::output(pins.gpio7.downgrade_output())?;
    power.set_high()?;
    Delay::default().delay_ms(100); // Wait for power to stabilize

    let api = HttpApi::new(&config);
    let mut panel = Panel::new(
        driver,
        PinDriver::input(pins.gpio48.downgrade_input())?,  // Pins::BSY
        PinDriver::output(pins.gpio46.downgrade_output())?, // Pins::DC
        PinDriver::output(pins.gpio47.downgrade_output())?, // Pins::RST
        power,
        api.clone(),
    )?;

    let mut button_pin = PinDriver::input(pins.gpio5)?; // Pins::BTN_CONF
    button_pin.set_pull(Pull::Up)?;
    let mut button = Button::new(button_pin);
    log::info!("Button on pin {}", Pins::BTN_CONF);

    let (mut wifi, clock, screen_id) = match bring_up(&config, &mut panel, &api, peripherals.modem) {
        Ok(parts) => parts,
        Err(e) => {
            log::error!("Bring-up failed: {:#}", e);
            if let Err(e) = panel.show_status("Error, restarting soon") {
                log::error!("Could not show error: {:#}", e);
            }
            thread::sleep(Duration::from_secs(60));
            esp_idf_svc::hal::reset::restart();
        }
    };
    if let Some(network) = wifi.current_network() {
        log::info!("Running on {}", network.ssid);
    }

    let poll_interval = Duration::from_millis(config.button.poll_interval_ms);
    let mut cycle = DisplayCycle::new(
        config,
        screen_id,
        api.clone(),
        api,
        clock,
        panel,
        StdRng::from_entropy(),
    );

    let started = Instant::now();
    let mut last_wifi_check = 0;
    loop {
        let now_ms = started.elapsed().as_millis() as u64;
        cycle.tick(now_ms, button.sample());

        if now_ms.saturating_sub(last_wifi_check) >= WIFI_CHECK_MS {
            last_wifi_check = now_ms;
            if let Err(e) = wifi.ensure_connected() {
                log::warn!("WiFi reconnect failed: {:#}", e);
            }
        }

        thread::sleep(poll_interval);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    anyhow::bail!("stoppedclocks runs on the ESP32 e-paper board, build it for an espidf target")
}
