//! Precondition check for the `.env` parsing capability
//!
//! The `.env` parser is compiled in through the `dotenv` feature. When it is
//! missing, this module works out what the operator can do about it: on a
//! host where the tool was installed by hand it can be rebuilt with cargo,
//! while a copy installed by the system package manager must be fixed through
//! that package manager instead. Nothing here installs anything; the caller
//! decides whether to run the command, ask first or abort.

use std::path::{Path, PathBuf};

use crate::Error;

/// Package that provides the `envdefs` binary
pub const CLIENT_PACKAGE: &str = "envdefs_client";

/// Directories owned by the system package manager
const SYSTEM_PREFIXES: [&str; 5] = ["/usr/bin", "/usr/sbin", "/bin", "/sbin", "/usr/libexec"];

/// Reports whether the `.env` parser is available
pub trait CapabilityProbe {
    /// Returns `true` if `.env` files can be parsed
    fn dotenv_available(&self) -> bool;
}

/// Probe backed by the features this crate was compiled with
#[derive(Debug, Clone, Copy, Default)]
pub struct CompiledProbe;

impl CapabilityProbe for CompiledProbe {
    fn dotenv_available(&self) -> bool {
        cfg!(feature = "dotenv")
    }
}

/// The fields of `/etc/os-release` relevant to picking a package manager
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    /// The distribution id, e.g. `arch` or `debian`
    pub id: Option<String>,
    /// Ids of the distributions this one derives from
    pub id_like: Vec<String>,
}

impl OsRelease {
    /// Parses the `KEY=value` content of an os-release file
    pub fn parse(content: &str) -> OsRelease {
        let mut release = OsRelease::default();

        for line in content.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches(|c: char| c == '"' || c == '\'');

            match key {
                "ID" => release.id = Some(value.to_lowercase()),
                "ID_LIKE" => {
                    release.id_like = value
                        .split_whitespace()
                        .map(str::to_lowercase)
                        .collect()
                }
                _ => {}
            }
        }

        release
    }

    /// Reads `/etc/os-release`, falling back to `/usr/lib/os-release`
    pub fn detect() -> Option<OsRelease> {
        ["/etc/os-release", "/usr/lib/os-release"]
            .iter()
            .find_map(|path| std::fs::read_to_string(path).ok())
            .map(|content| OsRelease::parse(&content))
    }

    fn is_like(&self, distro: &str) -> bool {
        self.id.as_deref() == Some(distro) || self.id_like.iter().any(|id| id == distro)
    }
}

/// The system package managers an install instruction can name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    /// Debian, Ubuntu and derivatives
    Apt,
    /// Arch Linux and derivatives
    Pacman,
    /// Fedora, RHEL and derivatives
    Dnf,
    /// openSUSE
    Zypper,
    /// Alpine Linux
    Apk,
    /// Homebrew on macOS
    Brew,
}

impl PackageManager {
    /// Picks the package manager for a host
    pub fn for_host(os: &str, release: Option<&OsRelease>) -> Option<PackageManager> {
        if os == "macos" {
            return Some(PackageManager::Brew);
        }

        let release = release?;
        [
            ("arch", PackageManager::Pacman),
            ("debian", PackageManager::Apt),
            ("ubuntu", PackageManager::Apt),
            ("fedora", PackageManager::Dnf),
            ("rhel", PackageManager::Dnf),
            ("suse", PackageManager::Zypper),
            ("opensuse", PackageManager::Zypper),
            ("alpine", PackageManager::Apk),
        ]
        .into_iter()
        .find(|(distro, _)| release.is_like(distro))
        .map(|(_, manager)| manager)
    }

    /// The command that installs `package` with this package manager
    pub fn install_command(&self, package: &str) -> String {
        match self {
            PackageManager::Apt => format!("sudo apt install {}", package),
            PackageManager::Pacman => format!("sudo pacman -S {}", package),
            PackageManager::Dnf => format!("sudo dnf install {}", package),
            PackageManager::Zypper => format!("sudo zypper install {}", package),
            PackageManager::Apk => format!("sudo apk add {}", package),
            PackageManager::Brew => format!("brew install {}", package),
        }
    }
}

/// The host the tool runs on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    /// The operating system, as in `std::env::consts::OS`
    pub os: String,
    /// The parsed os-release file, if there is one
    pub release: Option<OsRelease>,
    /// The path of the running executable
    pub executable: Option<PathBuf>,
}

impl HostPlatform {
    /// Inspects the running host
    pub fn detect() -> HostPlatform {
        HostPlatform {
            os: std::env::consts::OS.to_string(),
            release: OsRelease::detect(),
            executable: std::env::current_exe().ok(),
        }
    }

    /// Returns whether the tool is owned by the system package manager
    pub fn is_restricted(&self) -> bool {
        self.executable
            .as_deref()
            .is_some_and(is_system_managed_path)
    }

    /// Returns the package manager the instruction should name
    pub fn package_manager(&self) -> Option<PackageManager> {
        PackageManager::for_host(&self.os, self.release.as_ref())
    }
}

fn is_system_managed_path(path: &Path) -> bool {
    SYSTEM_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

/// Name of the installed client binary
pub const CLIENT_BINARY: &str = "envdefs";

/// What to tell the operator when no install source is known
const MANUAL_INSTALL: &str =
    "cargo install --locked --path <envdefs checkout>/envdefs_client --features dotenv";

/// Where cargo builds the client from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSource {
    /// A local checkout of the client crate
    Path(PathBuf),
    /// A git repository holding the workspace
    Git(String),
}

impl InstallSource {
    /// Reads a source setting: URLs are git repositories, anything else a path
    pub fn parse(value: &str) -> InstallSource {
        let value = value.trim();
        let is_git = ["https://", "http://", "ssh://", "git://", "git@"]
            .iter()
            .any(|scheme| value.starts_with(scheme));

        if is_git {
            InstallSource::Git(value.to_string())
        } else {
            InstallSource::Path(PathBuf::from(value))
        }
    }
}

/// A command that installs the capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallCommand {
    /// The program to run
    pub program: String,
    /// Its arguments
    pub args: Vec<String>,
    /// Where the installed binary ends up
    pub binary: PathBuf,
}

impl InstallCommand {
    /// Rebuilds the client with the `.env` parser into `root` through cargo
    pub fn cargo(source: &InstallSource, root: &Path) -> InstallCommand {
        let mut args: Vec<String> = vec!["install".into(), "--locked".into()];

        match source {
            InstallSource::Path(path) => {
                args.push("--path".into());
                args.push(path.display().to_string());
            }
            InstallSource::Git(url) => {
                args.push("--git".into());
                args.push(url.clone());
                args.push(CLIENT_PACKAGE.into());
            }
        }

        args.extend(["--features", "dotenv", "--root"].map(String::from));
        args.push(root.display().to_string());
        args.push("--force".into());

        InstallCommand {
            program: "cargo".to_string(),
            args,
            binary: root
                .join("bin")
                .join(format!("{}{}", CLIENT_BINARY, std::env::consts::EXE_SUFFIX)),
        }
    }
}

/// Outcome of the capability check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// `.env` files can be parsed
    Available,
    /// The parser is missing but the given command can install it
    Installable(InstallCommand),
    /// The parser is missing and must be installed by the operator
    Unavailable {
        /// What the operator has to run
        instruction: String,
    },
}

impl Capability {
    /// Turns anything but `Available` into [`Error::MissingCapability`]
    pub fn require(self) -> Result<(), Error> {
        match self {
            Capability::Available => Ok(()),
            Capability::Installable(command) => Err(Error::MissingCapability {
                instruction: format!("run `{}`", command),
            }),
            Capability::Unavailable { instruction } => {
                Err(Error::MissingCapability { instruction })
            }
        }
    }
}

/// Checks whether `.env` files can be parsed on `host`
///
/// `install` is the command that would provide the parser on this host, if
/// the caller knows where to build it from. It is only offered on hosts that
/// are not restricted.
pub fn assess(
    probe: &impl CapabilityProbe,
    host: &HostPlatform,
    install: Option<InstallCommand>,
) -> Capability {
    if probe.dotenv_available() {
        return Capability::Available;
    }

    if !host.is_restricted() {
        return match install {
            Some(command) => Capability::Installable(command),
            None => Capability::Unavailable {
                instruction: format!(
                    "no install source is known; install a build with .env support using `{}`",
                    MANUAL_INSTALL
                ),
            },
        };
    }

    let command = match host.package_manager() {
        Some(manager) => manager.install_command(CLIENT_PACKAGE),
        None => MANUAL_INSTALL.to_string(),
    };

    Capability::Unavailable {
        instruction: format!(
            "this copy is managed by the system package manager and will not be \
             reinstalled automatically; install a build with .env support using `{}`",
            command
        ),
    }
}
