//! Settings the firmware ships with
//!
//! Secrets are read at build time, e.g.
//! `WIFI_SSID=home WIFI_PASS=... POEM_API_TOKEN=... cargo build --release`

use embedded_graphics::prelude::{Point, Size};
use embedded_graphics::primitives::Rectangle;

use crate::catalog::{CatalogLimits, SOURCE_HEIGHT, SOURCE_WIDTH};
use crate::input::ButtonTiming;
use crate::layout::{FixedCellMetrics, LayoutConfig};

pub const POEM_COMPOSE_URL: &str = "https://poem.town/api/v1/clock/compose";
pub const POEM_STATUS_URL: &str = "https://poem.town/api/v1/clock/status";
pub const POEM_LIKE_URL: &str = "https://poem.town/api/v1/clock/like";
pub const CLOCK_INDEX_URL: &str = "https://stoppedclocks.org/living-clock/living-clock-index.json";
pub const BUILD_ID: &str = "living-clock-v1";

const HOUR_MS: u64 = 60 * 60 * 1000;

/// Text fill for panels smaller than the photographs, where strips shrink to a few pixel rows
pub const SMALL_PANEL_FILL_PERCENT: u32 = 75;

/// Maps catalog coordinates onto the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub source: Size,
    pub panel: Size,
}

impl DisplayGeometry {
    pub const fn new(panel: Size) -> Self {
        Self {
            source: Size::new(SOURCE_WIDTH, SOURCE_HEIGHT),
            panel,
        }
    }

    /// Scale each axis independently, rounding down
    pub fn map_zone(&self, zone: Rectangle) -> Rectangle {
        let scale = |value: i64, to: u32, from: u32| -> i64 {
            if from == 0 {
                value
            } else {
                value * i64::from(to) / i64::from(from)
            }
        };
        let x = scale(i64::from(zone.top_left.x), self.panel.width, self.source.width);
        let y = scale(i64::from(zone.top_left.y), self.panel.height, self.source.height);
        let w = scale(i64::from(zone.size.width), self.panel.width, self.source.width);
        let h = scale(i64::from(zone.size.height), self.panel.height, self.source.height);
        Rectangle::new(
            Point::new(x as i32, y as i32),
            Size::new(w.max(0) as u32, h.max(0) as u32),
        )
    }
}

impl Default for DisplayGeometry {
    fn default() -> Self {
        Self::new(Size::new(SOURCE_WIDTH, SOURCE_HEIGHT))
    }
}

/// Credentials for one access point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: &'static str,
    pub password: &'static str,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub compose_url: &'static str,
    pub status_url: &'static str,
    pub like_url: &'static str,
    pub index_url: &'static str,
    pub build_id: &'static str,
    pub api_token: Option<&'static str>,
    pub wifi: Option<WifiCredentials>,
    /// POSIX TZ string applied before reading local time
    pub timezone: &'static str,
    pub http_timeout_ms: u64,

    pub layout: LayoutConfig,
    /// Used when the renderer has no metrics for the requested font
    pub fallback_font: FixedCellMetrics,
    pub button: ButtonTiming,
    pub geometry: DisplayGeometry,
    pub catalog_limits: CatalogLimits,
    pub catalog_refresh_ms: u64,
    /// Wait before retrying a failed catalog fetch or render
    pub retry_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        let wifi = match (option_env!("WIFI_SSID"), option_env!("WIFI_PASS")) {
            (Some(ssid), password) if !ssid.is_empty() => Some(WifiCredentials {
                ssid,
                password: password.unwrap_or(""),
            }),
            _ => None,
        };

        Self {
            compose_url: POEM_COMPOSE_URL,
            status_url: POEM_STATUS_URL,
            like_url: POEM_LIKE_URL,
            index_url: CLOCK_INDEX_URL,
            build_id: BUILD_ID,
            api_token: option_env!("POEM_API_TOKEN").filter(|token| !token.is_empty()),
            wifi,
            timezone: option_env!("CLOCK_TZ").unwrap_or("UTC0"),
            http_timeout_ms: 20_000,

            layout: LayoutConfig::default(),
            fallback_font: FixedCellMetrics::default(),
            button: ButtonTiming::default(),
            geometry: DisplayGeometry::default(),
            catalog_limits: CatalogLimits::default(),
            catalog_refresh_ms: 6 * HOUR_MS,
            retry_ms: 10_000,
        }
    }
}

impl Config {
    /// Defaults with catalog zones mapped onto `panel`
    pub fn for_panel(panel: Size) -> Self {
        let mut config = Self {
            geometry: DisplayGeometry::new(panel),
            ..Self::default()
        };
        if panel.width < SOURCE_WIDTH || panel.height < SOURCE_HEIGHT {
            config.layout.fill_percent = SMALL_PANEL_FILL_PERCENT;
        }
        config
    }
}

/// Screen identifier sent to the poem service: the station MAC as upper-case hex
pub fn screen_id(mac: [u8; 6]) -> String {
    mac.iter().map(|byte| format!("{:02X}", byte)).collect()
}

#[cfg(test)]
mod tests {
    use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_5X8, FONT_6X10, FONT_7X13, FONT_8X13, FONT_9X15};

    use super::*;
    use crate::catalog::Strip;
    use crate::layout::{self, MonoFontBook};

    #[test]
    fn screen_id_is_twelve_upper_hex_digits() {
        assert_eq!(screen_id([0xa0, 0xb1, 0x02, 0xd3, 0x0e, 0xff]), "A0B102D30EFF");
    }

    #[test]
    fn zones_scale_per_axis() {
        let geometry = DisplayGeometry::new(Size::new(296, 128));
        let zone = Rectangle::new(Point::new(240, 135), Size::new(240, 135));
        let mapped = geometry.map_zone(zone);
        assert_eq!(mapped.top_left, Point::new(148, 64));
        assert_eq!(mapped.size, Size::new(148, 64));
    }

    #[test]
    fn identity_geometry_keeps_zones() {
        let zone = Rectangle::new(Point::new(20, 95), Size::new(440, 80));
        assert_eq!(DisplayGeometry::default().map_zone(zone), zone);
    }

    #[test]
    fn defaults_match_shipped_constants() {
        let config = Config::default();
        assert_eq!(config.catalog_refresh_ms, 21_600_000);
        assert_eq!(config.button.note_timeout_ms, 10_000);
        assert_eq!(config.layout.max_lines, 6);
        assert_eq!(config.build_id, "living-clock-v1");
        assert_eq!(
            config.index_url,
            "https://stoppedclocks.org/living-clock/living-clock-index.json"
        );
        assert_eq!(config.compose_url, "https://poem.town/api/v1/clock/compose");
        assert_eq!(config.status_url, "https://poem.town/api/v1/clock/status");
    }

    #[test]
    fn small_panel_fits_a_short_poem_in_a_strip() {
        let book = MonoFontBook::new(vec![&FONT_10X20, &FONT_9X15, &FONT_8X13, &FONT_7X13, &FONT_6X10, &FONT_5X8]).unwrap();
        let poem = "The hands stopped here long ago and still they point at something true";
        let panel = Size::new(296, 128);

        let config = Config::for_panel(panel);
        assert_eq!(config.layout.fill_percent, SMALL_PANEL_FILL_PERCENT);
        let zone = config.geometry.map_zone(Strip::Middle.rect());
        assert_eq!(zone.size, Size::new(271, 37));

        let result = layout::fit(poem, zone, &book, &config.layout);
        assert!(!result.overflowed);
        assert_eq!(result.font_size, 9);
        assert_eq!(result.lines.len(), 2);

        // the full-size fill leaves too few rows for the same poem
        let cramped = layout::fit(poem, zone, &book, &LayoutConfig::default());
        assert!(cramped.overflowed);
    }

    #[test]
    fn full_size_panel_keeps_default_fill() {
        let config = Config::for_panel(Size::new(SOURCE_WIDTH, SOURCE_HEIGHT));
        assert_eq!(config.layout, LayoutConfig::default());
        assert_eq!(config.geometry, DisplayGeometry::default());
    }
}
