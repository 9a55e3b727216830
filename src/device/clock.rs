use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use esp_idf_svc::sntp::{EspSntp, SyncStatus};
use log::info;

use stoppedclocks::clock::WallTime;
use stoppedclocks::source::ClockSource;

/// Anything earlier means the RTC was never set
const FIRST_VALID_YEAR: i32 = 2024;

/// Local time from the RTC, kept in step by SNTP
pub struct SntpClock {
    sntp: EspSntp<'static>,
}

impl SntpClock {
    /// Apply the POSIX `timezone` and start SNTP
    pub fn start(timezone: &str) -> Result<Self> {
        std::env::set_var("TZ", timezone);
        unsafe {
            esp_idf_svc::sys::tzset();
        }

        let sntp = EspSntp::new_default()?;
        info!("SNTP started, timezone {}", timezone);
        Ok(Self { sntp })
    }

    pub fn wait_for_sync(&self, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        while self.sntp.get_sync_status() != SyncStatus::Completed {
            if started.elapsed() > timeout {
                bail!("Time not synced after {} s", timeout.as_secs());
            }
            thread::sleep(Duration::from_millis(500));
        }
        info!("Time synced");
        Ok(())
    }
}

impl ClockSource for SntpClock {
    fn now(&self) -> Option<WallTime> {
        use core::mem::MaybeUninit;
        use esp_idf_svc::sys::{localtime_r, time, time_t, tm};

        let timeinfo = unsafe {
            let mut now: time_t = 0;
            time(&mut now as *mut _);

            let mut timeinfo = MaybeUninit::<tm>::uninit();
            localtime_r(&now as *const _, timeinfo.as_mut_ptr());
            timeinfo.assume_init()
        };

        // tm_year is years since 1900
        if 1900 + timeinfo.tm_year < FIRST_VALID_YEAR {
            return None;
        }
        WallTime::new(
            u8::try_from(timeinfo.tm_hour).ok()?,
            u8::try_from(timeinfo.tm_min).ok()?,
        )
    }
}
