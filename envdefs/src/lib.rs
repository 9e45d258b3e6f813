//! # envdefs
//!
//! envdefs is a library which forwards environment variables into native
//! builds as preprocessor definitions, optionally reading a `.env` file at the
//! build root first.

#![warn(missing_docs, unused_import_braces, missing_debug_implementations)]

/// Precondition checks for the `.env` parsing capability
pub mod capability;
/// Build configuration objects that accumulate definitions
pub mod config;
/// Preprocessor definition entries and value stringification
pub mod definition;
/// The resolved environment mapping and its `.env` overlay
pub mod environment;
/// The environment injector and its configuration presets
pub mod injector;
/// Rendering of accumulated definitions for build tools
pub mod render;

pub use capability::{Capability, CapabilityProbe, CompiledProbe, HostPlatform};
pub use config::{BuildConfig, CargoDirectives, DefineSet};
pub use definition::{stringify_macro, Definition};
pub use environment::Environment;
pub use injector::{Injector, InjectorConfig, Selection};

/// Prefix scanned by the prefix-scan preset
pub const DEFAULT_PREFIX: &str = "PIO_";

/// Keys forwarded by the fixed-key presets
pub const DEFAULT_FIXED_KEYS: [&str; 2] = ["OTA_SERVER_BASE_URL", "OTA_PASSWORD"];

/// Keys printed by the diagnostic preset
pub const DEFAULT_DIAGNOSTIC_KEYS: [&str; 2] = ["WIFI_SSID", "WIFI_PASSWORD"];

#[derive(thiserror::Error, Debug)]
/// An error type representing possible errors when injecting definitions
pub enum Error {
    /// The `.env` parser is missing and may not be installed automatically
    #[error("The .env parser is not available: {instruction}")]
    MissingCapability {
        /// What the operator has to run to make the parser available
        instruction: String,
    },
    /// A definition name is not a valid preprocessor identifier
    #[error("Invalid macro name `{0}`")]
    InvalidMacroName(String),
    /// There was an error while writing output or reading a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// There was an error while serializing definitions
    #[error("Error while serializing JSON")]
    Json(#[from] serde_json::Error),
    /// The `.env` file could not be read
    #[cfg(feature = "dotenv")]
    #[error("Unable to read .env overlay: {0}")]
    Dotenv(#[from] dotenvy::Error),
}
