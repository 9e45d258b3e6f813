use std::io::{BufRead, Write};
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context};
use envdefs::capability::{assess, CapabilityProbe, InstallCommand};
use envdefs::{Capability, Environment, HostPlatform};
use tracing::{error, info, instrument, warn};

use crate::settings::{InstallPolicy, Location};

/// Set on the re-executed process so a failed install cannot loop
const REEXEC_VAR: &str = "ENVDEFS_REEXEC";

/// What the caller should do after the capability check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The `.env` parser is available, carry on
    Continue,
    /// A freshly installed copy already ran; exit with its status
    Exit(i32),
}

/// Makes sure `.env` files can be parsed, installing a parser if allowed
///
/// `confirm` is asked before installing under [`InstallPolicy::Confirm`].
/// After a successful install the installed binary is run in place of this
/// one and its exit status is handed back.
#[instrument(skip_all, fields(policy = ?location.install))]
pub fn ensure_dotenv(
    env: &Environment,
    location: &Location,
    probe: &impl CapabilityProbe,
    host: &HostPlatform,
    confirm: impl FnOnce(&InstallCommand) -> anyhow::Result<bool>,
) -> anyhow::Result<Outcome> {
    match plan(env, location, probe, host, confirm)? {
        None => Ok(Outcome::Continue),
        Some(command) => {
            install(&command)?;
            reexec(&command.binary).map(Outcome::Exit)
        }
    }
}

/// Decides whether to install, returning the command to run if so
fn plan(
    env: &Environment,
    location: &Location,
    probe: &impl CapabilityProbe,
    host: &HostPlatform,
    confirm: impl FnOnce(&InstallCommand) -> anyhow::Result<bool>,
) -> anyhow::Result<Option<InstallCommand>> {
    let capability = assess(probe, host, location.install_command());

    let command = match capability {
        Capability::Available => return Ok(None),
        Capability::Installable(ref command) => command.clone(),
        Capability::Unavailable { .. } => return Err(refuse(capability)),
    };

    if env.contains(REEXEC_VAR) {
        warn!("Installed copy still lacks .env support");
        return Err(refuse(capability));
    }

    match location.install {
        InstallPolicy::Never => return Err(refuse(capability)),
        InstallPolicy::Confirm if !confirm(&command)? => return Err(refuse(capability)),
        _ => {}
    }

    Ok(Some(command))
}

fn refuse(capability: Capability) -> anyhow::Error {
    match capability.require() {
        Ok(()) => anyhow::anyhow!("capability check refused an available parser"),
        Err(err) => {
            error!("{}", err);
            err.into()
        }
    }
}

/// Asks on the terminal whether to run `command`
pub fn confirm_on_terminal(command: &InstallCommand) -> anyhow::Result<bool> {
    eprint!("The .env parser is missing. Run `{}` now? [y/N] ", command);
    std::io::stderr().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;

    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn install(command: &InstallCommand) -> anyhow::Result<()> {
    info!("Installing .env support: {}", command);

    let status = Command::new(&command.program)
        .args(&command.args)
        .status()
        .with_context(|| format!("Failed to run `{}`", command))?;

    if !status.success() {
        bail!("`{}` failed with {}", command, status);
    }

    Ok(())
}

fn reexec(binary: &Path) -> anyhow::Result<i32> {
    if !binary.is_file() {
        bail!("Installed binary not found at {}", binary.display());
    }
    info!(binary = %binary.display(), "Re-running with .env support");

    let status = Command::new(binary)
        .args(std::env::args_os().skip(1))
        .env(REEXEC_VAR, "1")
        .status()
        .with_context(|| format!("Failed to run {}", binary.display()))?;

    Ok(status.code().unwrap_or(1))
}
