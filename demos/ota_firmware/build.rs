//! Forwards the OTA settings and every `PIO_` variable into the firmware.
//!
//! Values are read from the environment first and from a `.env` file next
//! to this manifest second:
//!
//!   OTA_SERVER_BASE_URL=https://ota.example.com \
//!   PIO_WIFI_SSID=MyWiFi \
//!   cargo build -p ota_firmware

use std::path::PathBuf;

use envdefs::{CargoDirectives, Environment, Injector, InjectorConfig};

fn main() -> Result<(), envdefs::Error> {
    let env_file = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap_or_default())
        .join(".env");

    let mut env = Environment::from_os();
    env.overlay_dotenv_file(&env_file)?;

    let mut directives = CargoDirectives::stdout();
    Injector::new(InjectorConfig::fixed_keys()).inject(&env, &mut directives);
    Injector::new(InjectorConfig::prefix_scan()).inject(&env, &mut directives);
    if env_file.exists() {
        directives.rerun_if_changed(&env_file)?;
    }

    Ok(())
}
