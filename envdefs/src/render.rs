//! Output formats for accumulated definitions
//!
//! The same set of definitions can be handed to a build tool as compiler
//! flags, as Cargo build script directives, or as JSON for tooling.

use std::io::Write;

use tracing::warn;

use crate::definition::Definition;
use crate::Error;

/// Writes one `-DNAME=<macro value>` flag per definition on a single line
///
/// Flags are shell-quoted when they contain characters a build tool would
/// otherwise split on.
pub fn write_compiler_flags<W: Write>(
    out: &mut W,
    definitions: &[Definition],
) -> Result<(), Error> {
    let flags: Vec<String> = definitions.iter().map(compiler_flag).collect();
    writeln!(out, "{}", flags.join(" "))?;
    Ok(())
}

/// Formats a single definition as a compiler flag
pub fn compiler_flag(definition: &Definition) -> String {
    shell_quote(&format!(
        "-D{}={}",
        definition.name,
        definition.macro_value()
    ))
}

/// Writes `cargo:rustc-env` directives for every definition
pub fn write_cargo_directives<W: Write>(
    out: &mut W,
    definitions: &[Definition],
) -> Result<(), Error> {
    for definition in definitions {
        write_cargo_directive(out, definition)?;
    }
    Ok(())
}

/// Writes the directives for a single definition
///
/// Cargo reads directives line by line, so a value containing a newline
/// cannot be passed and is skipped with a warning.
pub fn write_cargo_directive<W: Write>(
    out: &mut W,
    definition: &Definition,
) -> std::io::Result<()> {
    if definition.value.contains(['\n', '\r']) {
        warn!(
            name = %definition.name,
            "Skipping multi-line value, cargo directives are single-line"
        );
        return Ok(());
    }

    writeln!(
        out,
        "cargo:rustc-env={}={}",
        definition.name, definition.value
    )?;
    writeln!(out, "cargo:rerun-if-env-changed={}", definition.name)
}

/// Writes the definitions as a pretty-printed JSON array
pub fn write_json<W: Write>(
    out: &mut W,
    definitions: &[Definition],
) -> Result<(), Error> {
    serde_json::to_writer_pretty(&mut *out, definitions)?;
    writeln!(out)?;
    Ok(())
}

/// Quotes `arg` for a POSIX shell if it contains anything but safe characters
pub fn shell_quote(arg: &str) -> String {
    let is_safe = |c: char| c.is_ascii_alphanumeric() || "-_=./:,+@%".contains(c);

    if !arg.is_empty() && arg.chars().all(is_safe) {
        return arg.to_string();
    }

    format!("'{}'", arg.replace('\'', r"'\''"))
}
