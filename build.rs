use std::env;

/// Build-time settings read by `src/config.rs` through `option_env!`
const SETTINGS: [&str; 4] = ["WIFI_SSID", "WIFI_PASS", "POEM_API_TOKEN", "CLOCK_TZ"];

fn main() {
    // Only the device build links against ESP-IDF, host builds run the tests
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    } else {
        println!("cargo:warning=Not an esp-idf target, the firmware binary will refuse to start");
    }

    for setting in SETTINGS {
        println!("cargo:rerun-if-env-changed={}", setting);
    }
}
