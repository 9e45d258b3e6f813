use tracing::{info, instrument, warn};

use crate::config::BuildConfig;
use crate::definition::{loggable, Definition};
use crate::environment::Environment;
use crate::{DEFAULT_DIAGNOSTIC_KEYS, DEFAULT_FIXED_KEYS, DEFAULT_PREFIX};

/// Which variables an injection pass forwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Forward these keys, with an empty value when unset
    Fixed(Vec<String>),
    /// Forward every key starting with this prefix
    Prefix(String),
}

/// Settings for one injection pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectorConfig {
    /// Selections applied in order; a later one overrides an earlier one
    pub selections: Vec<Selection>,
    /// Keys logged before injection, secrets redacted
    pub diagnostic_keys: Vec<String>,
    /// Whether to log the accumulated definitions after injection
    pub log_definitions: bool,
}

impl InjectorConfig {
    /// Forwards `OTA_SERVER_BASE_URL` and `OTA_PASSWORD`
    pub fn fixed_keys() -> InjectorConfig {
        InjectorConfig {
            selections: vec![Selection::Fixed(to_strings(&DEFAULT_FIXED_KEYS))],
            diagnostic_keys: Vec::new(),
            log_definitions: false,
        }
    }

    /// Like [`InjectorConfig::fixed_keys`], also logging the Wi-Fi settings
    pub fn fixed_keys_with_diagnostics() -> InjectorConfig {
        InjectorConfig {
            diagnostic_keys: to_strings(&DEFAULT_DIAGNOSTIC_KEYS),
            ..InjectorConfig::fixed_keys()
        }
    }

    /// Forwards every `PIO_` variable and logs the result
    pub fn prefix_scan() -> InjectorConfig {
        InjectorConfig {
            selections: vec![Selection::Prefix(DEFAULT_PREFIX.to_string())],
            diagnostic_keys: Vec::new(),
            log_definitions: true,
        }
    }
}

fn to_strings(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

/// Forwards environment variables into a build configuration
#[derive(Debug, Clone)]
pub struct Injector {
    config: InjectorConfig,
}

impl Injector {
    /// Creates an injector
    pub fn new(config: InjectorConfig) -> Injector {
        Injector { config }
    }

    /// Returns the settings of this injector
    pub fn config(&self) -> &InjectorConfig {
        &self.config
    }

    /// Runs one injection pass
    ///
    /// Missing variables are never an error: fixed keys are forwarded with an
    /// empty value and prefix scans simply do not see them.
    #[instrument(skip_all, fields(selections = self.config.selections.len()))]
    pub fn inject<C: BuildConfig + ?Sized>(&self, env: &Environment, build: &mut C) {
        self.log_diagnostics(env);

        for selection in &self.config.selections {
            match selection {
                Selection::Fixed(keys) => {
                    for key in keys {
                        forward(build, key, env.get(key).unwrap_or_default());
                    }
                }
                Selection::Prefix(prefix) => {
                    for (key, value) in env.with_prefix(prefix) {
                        forward(build, key, value);
                    }
                }
            }
        }

        if self.config.log_definitions {
            let definitions = build.definitions();
            info!(count = definitions.len(), "Build configuration definitions");
            for definition in definitions {
                info!("  {}={}", definition.name, definition.loggable_value());
            }
        }
    }

    fn log_diagnostics(&self, env: &Environment) {
        for key in &self.config.diagnostic_keys {
            info!("{}: {}", key, loggable(key, env.get(key)));
        }
    }
}

fn forward<C: BuildConfig + ?Sized>(build: &mut C, key: &str, value: &str) {
    match Definition::new(key, value) {
        Ok(definition) => build.define(definition),
        Err(err) => warn!(key = %key, "Skipping variable: {}", err),
    }
}
