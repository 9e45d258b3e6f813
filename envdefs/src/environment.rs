use std::collections::BTreeMap;
use std::ops::Bound;
#[cfg(feature = "dotenv")]
use std::path::Path;

#[cfg(feature = "dotenv")]
use tracing::{info, warn};

#[cfg(feature = "dotenv")]
use crate::Error;

/// The resolved environment an injection pass reads from
///
/// This is a snapshot: it starts from the OS environment (or any map handed
/// in by a caller) and can be extended by a `.env` overlay. The process
/// environment itself is never written to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Creates an empty environment
    pub fn new() -> Environment {
        Environment::default()
    }

    /// Snapshots the OS environment, skipping entries that are not UTF-8
    pub fn from_os() -> Environment {
        std::env::vars_os()
            .filter_map(|(key, value)| {
                Some((key.into_string().ok()?, value.into_string().ok()?))
            })
            .collect()
    }

    /// Returns the value of `key`, if set
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Returns whether `key` is set
    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Sets `key`, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Sets `key` only if it is not already present
    ///
    /// Returns whether the value was taken.
    pub fn set_if_absent(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> bool {
        let mut taken = false;
        self.vars.entry(key.into()).or_insert_with(|| {
            taken = true;
            value.into()
        });
        taken
    }

    /// Iterates over all variables in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterates over the variables whose key starts with `prefix`, in key order
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.vars
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of variables
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns whether no variable is set
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Overlays the `.env` file at `path` without overriding existing keys
    ///
    /// A missing file is not an error. Lines that fail to parse are skipped
    /// with a warning. Returns the number of variables taken from the file.
    #[cfg(feature = "dotenv")]
    pub fn overlay_dotenv_file(&mut self, path: &Path) -> Result<usize, Error> {
        match dotenvy::from_path_iter(path) {
            Ok(iter) => {
                let added = self.overlay_entries(iter);
                info!(path = %path.display(), added, "Loaded .env overlay");
                Ok(added)
            }
            Err(err) if err.not_found() => {
                info!(path = %path.display(), "No .env overlay found");
                Ok(0)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Overlays `.env` formatted content read from `reader`
    ///
    /// Follows the same rules as [`Environment::overlay_dotenv_file`].
    #[cfg(feature = "dotenv")]
    pub fn overlay_dotenv_reader<R: std::io::Read>(&mut self, reader: R) -> usize {
        self.overlay_entries(dotenvy::from_read_iter(reader))
    }

    #[cfg(feature = "dotenv")]
    fn overlay_entries<R: std::io::Read>(&mut self, iter: dotenvy::Iter<R>) -> usize {
        let mut added = 0;

        for item in iter {
            match item {
                Ok((key, value)) => {
                    if self.set_if_absent(key, value) {
                        added += 1;
                    }
                }
                Err(dotenvy::Error::Io(err)) => {
                    warn!("Stopped reading .env overlay: {}", err);
                    break;
                }
                Err(err) => {
                    warn!("Skipping malformed .env line: {}", err);
                }
            }
        }

        added
    }
}

impl FromIterator<(String, String)> for Environment {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Environment {
            vars: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Environment {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}
