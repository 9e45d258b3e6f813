use std::path::PathBuf;
use std::str::FromStr;

use anyhow::bail;
use envdefs::capability::{InstallCommand, InstallSource};
use envdefs::{Environment, InjectorConfig, Selection};
use tracing::warn;

/// One of the injection modes `ENVDEFS_MODE` can name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Fixed,
    FixedDiagnostic,
    Prefix,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "fixed" => Ok(Mode::Fixed),
            "fixed-diagnostic" => Ok(Mode::FixedDiagnostic),
            "prefix" => Ok(Mode::Prefix),
            other => Err(format!("unknown mode `{}`", other)),
        }
    }
}

/// How the accumulated definitions are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Flags,
    Cargo,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "flags" => Ok(OutputFormat::Flags),
            "cargo" => Ok(OutputFormat::Cargo),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format `{}`", other)),
        }
    }
}

/// What to do when the `.env` parser is missing but installable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPolicy {
    Auto,
    Confirm,
    Never,
}

impl FromStr for InstallPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auto" => Ok(InstallPolicy::Auto),
            "confirm" => Ok(InstallPolicy::Confirm),
            "never" => Ok(InstallPolicy::Never),
            other => Err(format!("unknown install policy `{}`", other)),
        }
    }
}

/// Where to find the `.env` overlay and how to get a parser for it
///
/// Read from the OS environment only, since it is needed before the
/// overlay is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub env_file: PathBuf,
    pub install: InstallPolicy,
    /// What cargo rebuilds the client from, defaulting to the checkout it was built from
    pub install_source: Option<InstallSource>,
    /// The cargo install root the rebuilt client lands in
    pub install_root: Option<PathBuf>,
}

impl Location {
    pub fn from_env(env: &Environment) -> anyhow::Result<Location> {
        let mut failed = false;

        let root = env
            .get("ENVDEFS_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let file = env.get("ENVDEFS_ENV_FILE").unwrap_or(".env");
        let install = parse_var(env, "ENVDEFS_INSTALL", InstallPolicy::Auto, &mut failed);

        let install_source = match env.get("ENVDEFS_INSTALL_SOURCE") {
            Some(value) if value.trim().is_empty() => {
                warn!("Variable `ENVDEFS_INSTALL_SOURCE` must not be empty");
                failed = true;
                None
            }
            Some(value) => Some(InstallSource::parse(value)),
            None => build_checkout(),
        };

        if failed {
            bail!("Some environment variables are invalid!");
        }

        Ok(Location {
            env_file: root.join(file),
            install,
            install_source,
            install_root: install_root(env),
        })
    }

    /// The command that installs a client with `.env` support, if one can be built
    pub fn install_command(&self) -> Option<InstallCommand> {
        Some(InstallCommand::cargo(
            self.install_source.as_ref()?,
            self.install_root.as_deref()?,
        ))
    }
}

/// The source checkout this binary was built from, if it is still there
fn build_checkout() -> Option<InstallSource> {
    let checkout = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    checkout
        .join("Cargo.toml")
        .is_file()
        .then_some(InstallSource::Path(checkout))
}

/// Resolves the cargo install root the way cargo does
fn install_root(env: &Environment) -> Option<PathBuf> {
    if let Some(root) = env.get("CARGO_INSTALL_ROOT") {
        return Some(PathBuf::from(root));
    }
    if let Some(home) = env.get("CARGO_HOME") {
        return Some(PathBuf::from(home));
    }

    env.get("HOME")
        .or_else(|| env.get("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".cargo"))
}

/// What to inject and how to print it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub modes: Vec<Mode>,
    pub prefix: String,
    pub keys: Vec<String>,
    pub diagnostic_keys: Vec<String>,
    pub format: OutputFormat,
}

impl Settings {
    /// Reads the settings, warning about every invalid variable before failing
    pub fn from_env(env: &Environment) -> anyhow::Result<Settings> {
        let mut failed = false;

        let modes = match env.get("ENVDEFS_MODE") {
            None => vec![Mode::Prefix],
            Some(value) => match value
                .split('+')
                .map(Mode::from_str)
                .collect::<Result<Vec<_>, _>>()
            {
                Ok(modes) => modes,
                Err(err) => {
                    warn!("Variable `ENVDEFS_MODE` is invalid: {}", err);
                    failed = true;
                    Vec::new()
                }
            },
        };

        let prefix = env
            .get("ENVDEFS_PREFIX")
            .unwrap_or(envdefs::DEFAULT_PREFIX)
            .to_string();
        if prefix.is_empty() {
            warn!("Variable `ENVDEFS_PREFIX` must not be empty");
            failed = true;
        }

        let keys = list_var(env, "ENVDEFS_KEYS", &envdefs::DEFAULT_FIXED_KEYS);
        let diagnostic_keys = list_var(
            env,
            "ENVDEFS_DIAGNOSTIC_KEYS",
            &envdefs::DEFAULT_DIAGNOSTIC_KEYS,
        );
        let format = parse_var(env, "ENVDEFS_FORMAT", OutputFormat::Flags, &mut failed);

        if failed {
            bail!("Some environment variables are invalid!");
        }

        Ok(Settings {
            modes,
            prefix,
            keys,
            diagnostic_keys,
            format,
        })
    }

    /// Builds the injector settings for the selected modes, in order
    pub fn injector_config(&self) -> InjectorConfig {
        let mut config = InjectorConfig {
            selections: Vec::new(),
            diagnostic_keys: Vec::new(),
            log_definitions: false,
        };

        for mode in &self.modes {
            match mode {
                Mode::Fixed => config.selections.push(Selection::Fixed(self.keys.clone())),
                Mode::FixedDiagnostic => {
                    config.selections.push(Selection::Fixed(self.keys.clone()));
                    config.diagnostic_keys = self.diagnostic_keys.clone();
                }
                Mode::Prefix => {
                    config.selections.push(Selection::Prefix(self.prefix.clone()));
                    config.log_definitions = true;
                }
            }
        }

        config
    }
}

fn parse_var<T: FromStr<Err = String>>(
    env: &Environment,
    var: &str,
    default: T,
    failed: &mut bool,
) -> T {
    match env.get(var).map(T::from_str) {
        None => default,
        Some(Ok(value)) => value,
        Some(Err(err)) => {
            warn!("Variable `{}` is invalid: {}", var, err);
            *failed = true;
            default
        }
    }
}

fn list_var(env: &Environment, var: &str, default: &[&str]) -> Vec<String> {
    match env.get(var) {
        Some(value) => value
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(String::from)
            .collect(),
        None => default.iter().map(|key| key.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Environment {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_env(&Environment::new()).unwrap();
        assert_eq!(settings.modes, vec![Mode::Prefix]);
        assert_eq!(settings.prefix, "PIO_");
        assert_eq!(settings.format, OutputFormat::Flags);
        assert_eq!(settings.injector_config(), InjectorConfig::prefix_scan());

        let location = Location::from_env(&Environment::new()).unwrap();
        assert_eq!(location.env_file, PathBuf::from("./.env"));
        assert_eq!(location.install, InstallPolicy::Auto);
    }

    #[test]
    fn test_presets_match_library() {
        let fixed = Settings::from_env(&env(&[("ENVDEFS_MODE", "fixed")])).unwrap();
        assert_eq!(fixed.injector_config(), InjectorConfig::fixed_keys());

        let diagnostic =
            Settings::from_env(&env(&[("ENVDEFS_MODE", "fixed-diagnostic")])).unwrap();
        assert_eq!(
            diagnostic.injector_config(),
            InjectorConfig::fixed_keys_with_diagnostics()
        );
    }

    #[test]
    fn test_combined_modes() {
        let settings = Settings::from_env(&env(&[
            ("ENVDEFS_MODE", "prefix+fixed"),
            ("ENVDEFS_KEYS", "OTA_SERVER_BASE_URL, PIO_BOARD_ID,"),
        ]))
        .unwrap();

        let config = settings.injector_config();
        assert_eq!(
            config.selections,
            vec![
                Selection::Prefix("PIO_".to_string()),
                Selection::Fixed(vec![
                    "OTA_SERVER_BASE_URL".to_string(),
                    "PIO_BOARD_ID".to_string()
                ]),
            ]
        );
        assert!(config.log_definitions);
    }

    #[test]
    fn test_invalid_settings() {
        assert!(Settings::from_env(&env(&[("ENVDEFS_MODE", "everything")])).is_err());
        assert!(Settings::from_env(&env(&[("ENVDEFS_FORMAT", "yaml")])).is_err());
        assert!(Settings::from_env(&env(&[("ENVDEFS_PREFIX", "")])).is_err());
        assert!(Location::from_env(&env(&[("ENVDEFS_INSTALL", "maybe")])).is_err());
        assert!(Location::from_env(&env(&[("ENVDEFS_INSTALL_SOURCE", " ")])).is_err());
    }

    #[test]
    fn test_location() {
        let location = Location::from_env(&env(&[
            ("ENVDEFS_ROOT", "/work/firmware"),
            ("ENVDEFS_ENV_FILE", "ci.env"),
            ("ENVDEFS_INSTALL", "never"),
        ]))
        .unwrap();

        assert_eq!(location.env_file, PathBuf::from("/work/firmware/ci.env"));
        assert_eq!(location.install, InstallPolicy::Never);
    }

    #[test]
    fn test_install_source_and_root() {
        let location = Location::from_env(&env(&[
            ("ENVDEFS_INSTALL_SOURCE", "https://example.com/envdefs.git"),
            ("CARGO_HOME", "/opt/cargo"),
            ("HOME", "/home/dev"),
        ]))
        .unwrap();

        assert_eq!(
            location.install_source,
            Some(InstallSource::Git("https://example.com/envdefs.git".to_string()))
        );
        assert_eq!(location.install_root, Some(PathBuf::from("/opt/cargo")));

        let command = location.install_command().unwrap();
        assert!(command.args.contains(&"--git".to_string()));
        assert!(command.binary.starts_with("/opt/cargo/bin"));
    }

    #[test]
    fn test_install_root_resolution() {
        let root = |pairs: &[(&str, &str)]| Location::from_env(&env(pairs)).unwrap().install_root;

        assert_eq!(
            root(&[("CARGO_INSTALL_ROOT", "/srv/tools"), ("CARGO_HOME", "/opt/cargo")]),
            Some(PathBuf::from("/srv/tools"))
        );
        assert_eq!(
            root(&[("HOME", "/home/dev")]),
            Some(PathBuf::from("/home/dev/.cargo"))
        );
        assert_eq!(root(&[]), None);
    }

    #[test]
    fn test_no_install_command_without_root() {
        let location = Location::from_env(&env(&[(
            "ENVDEFS_INSTALL_SOURCE",
            "/work/envdefs/envdefs_client",
        )]))
        .unwrap();

        assert_eq!(location.install_root, None);
        assert_eq!(location.install_command(), None);
    }

    #[test]
    fn test_defaults_to_build_checkout() {
        let location = Location::from_env(&Environment::new()).unwrap();
        assert_eq!(
            location.install_source,
            Some(InstallSource::Path(PathBuf::from(env!("CARGO_MANIFEST_DIR"))))
        );
    }
}
