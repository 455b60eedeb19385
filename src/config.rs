//! Application configuration.
//!
//! Three layers, later ones win:
//!
//! 1. built-in defaults,
//! 2. `<instance>/config.toml`, when present,
//! 3. overrides passed to [`create_app`](crate::create_app) (tests use this).
//!
//! The merged map is validated once, so [`Config::database`] always yields a
//! usable path afterwards.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Error;

/// Injected configuration values, keyed by option name.
pub type Overrides = BTreeMap<String, String>;

pub const SECRET_KEY: &str = "SECRET_KEY";
pub const DATABASE: &str = "DATABASE";
pub const PASSWORD_ROUNDS: &str = "PASSWORD_ROUNDS";

/// Name of the optional file read from the instance directory.
pub const INSTANCE_FILE: &str = "config.toml";

const DEFAULT_SECRET_KEY: &str = "dev";
const DEFAULT_DATABASE_FILE: &str = "jotter.sqlite";
const DEFAULT_PASSWORD_ROUNDS: u32 = 600_000;

#[derive(Debug, Clone)]
pub struct Config {
    instance_path: PathBuf,
    values: BTreeMap<String, String>,
    database: PathBuf,
    password_rounds: u32,
}

impl Config {
    /// Merges defaults, the instance file and `overrides`, then validates.
    pub fn load(instance_path: impl Into<PathBuf>, overrides: Option<&Overrides>) -> Result<Self, Error> {
        let instance_path = instance_path.into();

        let mut values = BTreeMap::new();
        values.insert(SECRET_KEY.to_owned(), DEFAULT_SECRET_KEY.to_owned());
        values.insert(DATABASE.to_owned(), DEFAULT_DATABASE_FILE.to_owned());
        values.insert(PASSWORD_ROUNDS.to_owned(), DEFAULT_PASSWORD_ROUNDS.to_string());

        values.extend(read_instance_file(&instance_path.join(INSTANCE_FILE))?);
        if let Some(overrides) = overrides {
            values.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let database = match values.get(DATABASE).map(|s| s.trim()) {
            Some(raw) if !raw.is_empty() => instance_path.join(raw),
            _ => return Err(Error::Config(format!("{DATABASE} must name a file"))),
        };
        let password_rounds = values
            .get(PASSWORD_ROUNDS)
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|rounds| *rounds > 0)
            .ok_or_else(|| Error::Config(format!("{PASSWORD_ROUNDS} must be a positive integer")))?;

        Ok(Self { instance_path, values, database, password_rounds })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn instance_path(&self) -> &Path { &self.instance_path }

    /// Signing key for session cookies.
    pub fn secret_key(&self) -> &str {
        self.get(SECRET_KEY).unwrap_or(DEFAULT_SECRET_KEY)
    }

    /// Storage file. A relative `DATABASE` (the default included) is
    /// resolved against the instance directory.
    pub fn database(&self) -> &Path { &self.database }

    pub fn password_rounds(&self) -> u32 { self.password_rounds }
}

/// Reads the flat TOML instance file. A missing file contributes nothing.
fn read_instance_file(path: &Path) -> Result<BTreeMap<String, String>, Error> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            return Ok(BTreeMap::new());
        }
        Err(e) => return Err(Error::Config(format!("cannot read {}: {e}", path.display()))),
    };

    let table: toml::Table = text
        .parse()
        .map_err(|e| Error::Config(format!("invalid {}: {e}", path.display())))?;

    let mut values = BTreeMap::new();
    for (key, value) in table {
        let value = match value {
            toml::Value::String(s) => s,
            toml::Value::Integer(i) => i.to_string(),
            toml::Value::Float(f) => f.to_string(),
            toml::Value::Boolean(b) => b.to_string(),
            other => {
                return Err(Error::Config(format!(
                    "{key} in {} has unsupported type {}",
                    path.display(),
                    other.type_str()
                )));
            }
        };
        values.insert(key, value);
    }

    debug!(path = %path.display(), keys = values.len(), "loaded instance config");
    Ok(values)
}
