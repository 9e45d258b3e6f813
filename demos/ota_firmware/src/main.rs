/// Set by the build script, empty when unset at build time
const OTA_SERVER_BASE_URL: &str = env!("OTA_SERVER_BASE_URL");

const WIFI_SSID: Option<&str> = option_env!("PIO_WIFI_SSID");

fn main() {
    println!("OTA server: {}", or_unset(OTA_SERVER_BASE_URL));
    println!("Wi-Fi network: {}", WIFI_SSID.unwrap_or("<unset>"));
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "<unset>"
    } else {
        value
    }
}
