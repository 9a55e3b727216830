use anyhow::{bail, Context, Result};
use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::nvs::{EspNvsPartition, NvsDefault};
use esp_idf_svc::wifi::{BlockingWifi, EspWifi, WifiDeviceId};
use log::{info, warn};

use stoppedclocks::config::WifiCredentials;

#[derive(Debug)]
pub struct WifiNetwork<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
    pub auth_method: AuthMethod,
}

impl<'a> WifiNetwork<'a> {
    pub const fn new(ssid: &'a str, password: &'a str) -> Self {
        Self {
            ssid,
            password,
            auth_method: AuthMethod::WPA2Personal,
        }
    }

    pub const fn with_auth(mut self, auth_method: AuthMethod) -> Self {
        self.auth_method = auth_method;
        self
    }
}

impl From<WifiCredentials> for WifiNetwork<'static> {
    fn from(credentials: WifiCredentials) -> Self {
        let network = WifiNetwork::new(credentials.ssid, credentials.password);
        if credentials.password.is_empty() {
            network.with_auth(AuthMethod::None)
        } else {
            network
        }
    }
}

pub struct WifiManager {
    networks: Vec<WifiNetwork<'static>>,
    wifi: BlockingWifi<EspWifi<'static>>,
    current_network: Option<usize>,
}

impl WifiManager {
    pub fn new(networks: Vec<WifiNetwork<'static>>, modem: Modem) -> Result<Self> {
        let sys_loop = EspSystemEventLoop::take()?;
        let nvs = EspNvsPartition::<NvsDefault>::take()?;

        let wifi = BlockingWifi::wrap(EspWifi::new(modem, sys_loop.clone(), Some(nvs))?, sys_loop)?;

        Ok(Self {
            networks,
            wifi,
            current_network: None,
        })
    }

    pub fn connect(&mut self) -> Result<()> {
        // First, scan for available networks
        let available_networks = self.scan_networks()?;
        info!("Found {} available networks", available_networks.len());

        // Try to connect to any of the known networks that are available
        for index in 0..self.networks.len() {
            let ssid = self.networks[index].ssid;
            if !available_networks.iter().any(|available| available == ssid) {
                continue;
            }

            info!("Attempting to connect to network: {}", ssid);
            if let Err(e) = self.connect_to_network(index) {
                warn!("Failed to connect to {}: {}", ssid, e);
                continue;
            }

            self.current_network = Some(index);
            info!("Successfully connected to {}", ssid);

            let ip_info = self.wifi.wifi().sta_netif().get_ip_info()?;
            info!("IP: {}", ip_info.ip);

            return Ok(());
        }

        bail!("No known networks available")
    }

    /// Reconnect after the access point dropped us
    pub fn ensure_connected(&mut self) -> Result<()> {
        if self.wifi.is_connected()? {
            return Ok(());
        }
        warn!("WiFi connection lost");
        self.current_network = None;
        self.wifi.disconnect().ok();
        self.connect()
    }

    fn scan_networks(&mut self) -> Result<Vec<String>> {
        // Start WiFi in station mode for scanning
        if !self.wifi.is_started()? {
            self.wifi
                .set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
            self.wifi.start()?;
        }

        // Scan for available networks
        let ap_infos = self.wifi.scan()?;
        let available_networks: Vec<String> = ap_infos.iter().map(|ap| ap.ssid.to_string()).collect();

        Ok(available_networks)
    }

    fn connect_to_network(&mut self, index: usize) -> Result<()> {
        let network = &self.networks[index];
        let wifi_config = Configuration::Client(ClientConfiguration {
            ssid: network
                .ssid
                .try_into()
                .map_err(|_| anyhow::anyhow!("SSID {} is too long", network.ssid))?,
            password: network
                .password
                .try_into()
                .map_err(|_| anyhow::anyhow!("Password is too long"))?,
            auth_method: network.auth_method,
            ..Default::default()
        });

        self.wifi.set_configuration(&wifi_config)?;
        self.wifi.connect()?;
        self.wifi.wait_netif_up()?;

        Ok(())
    }

    /// Station MAC, the basis of the screen identifier
    pub fn mac(&self) -> Result<[u8; 6]> {
        self.wifi
            .wifi()
            .get_mac(WifiDeviceId::Sta)
            .context("Could not read station MAC")
    }

    pub fn current_network(&self) -> Option<&WifiNetwork<'static>> {
        self.current_network.map(|index| &self.networks[index])
    }
}
