use std::io::Write;

use tracing::warn;

use crate::definition::Definition;
use crate::render::write_cargo_directive;

/// An externally owned accumulator of preprocessor definitions
///
/// The injector only ever appends to a build configuration; creating,
/// consuming and discarding it is up to the caller.
pub trait BuildConfig {
    /// Appends a definition; a later definition for the same name wins
    fn define(&mut self, definition: Definition);

    /// Returns every definition accumulated so far, in insertion order
    fn definitions(&self) -> &[Definition];
}

/// An in-memory build configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefineSet {
    definitions: Vec<Definition>,
}

impl DefineSet {
    /// Creates an empty set
    pub fn new() -> DefineSet {
        DefineSet::default()
    }

    /// Returns the raw value defined for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.definitions
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }

    /// Returns whether `name` is defined
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the number of definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns whether nothing was defined
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Consumes the set, returning its definitions
    pub fn into_definitions(self) -> Vec<Definition> {
        self.definitions
    }
}

impl BuildConfig for DefineSet {
    fn define(&mut self, definition: Definition) {
        match self.definitions.iter_mut().find(|d| d.name == definition.name) {
            Some(existing) => existing.value = definition.value,
            None => self.definitions.push(definition),
        }
    }

    fn definitions(&self) -> &[Definition] {
        &self.definitions
    }
}

/// A build configuration for Cargo build scripts
///
/// Each definition is written straight away as a `cargo:rustc-env`
/// directive so the crate being built can read it with `env!`. Directives
/// that cannot be written are logged and dropped; the definition is still
/// tracked.
#[derive(Debug)]
pub struct CargoDirectives<W: Write> {
    out: W,
    defines: DefineSet,
}

impl CargoDirectives<std::io::Stdout> {
    /// Writes directives to stdout, where Cargo reads them
    pub fn stdout() -> Self {
        CargoDirectives::new(std::io::stdout())
    }
}

impl<W: Write> CargoDirectives<W> {
    /// Writes directives to `out`
    pub fn new(out: W) -> Self {
        CargoDirectives {
            out,
            defines: DefineSet::new(),
        }
    }

    /// Asks Cargo to rerun the build script when `path` changes
    pub fn rerun_if_changed(&mut self, path: &std::path::Path) -> std::io::Result<()> {
        writeln!(self.out, "cargo:rerun-if-changed={}", path.display())
    }

    /// Returns the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> BuildConfig for CargoDirectives<W> {
    fn define(&mut self, definition: Definition) {
        if let Err(err) = write_cargo_directive(&mut self.out, &definition) {
            warn!(name = %definition.name, "Failed to write cargo directive: {}", err);
        }
        self.defines.define(definition);
    }

    fn definitions(&self) -> &[Definition] {
        self.defines.definitions()
    }
}
