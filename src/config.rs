//! On-disk configuration.
//!
//! A small TOML file under the platform config directory. Values here are
//! defaults; command-line options always win over them.

use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

const SETTABLE_KEYS: &[&str] = &["base-url", "default-model", "stream"];

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// API endpoint base URL.
    pub base_url: Option<String>,
    /// Model used when no `--model` option is given.
    pub default_model: Option<String>,
    /// Whether responses stream incrementally by default.
    pub stream: Option<bool>,
}

impl Config {
    pub fn load() -> Result<Config> {
        Self::load_from_path(&Self::config_file_path())
    }

    pub fn load_from_path(path: &PathBuf) -> Result<Config> {
        if path.exists() {
            let contents = fs::read_to_string(path).map_err(|e| {
                Error::configuration_with(
                    format!("could not read config file {}", path.display()),
                    e,
                )
            })?;
            toml::from_str(&contents).map_err(|e| {
                Error::configuration_with(
                    format!("config file {} is not valid TOML", path.display()),
                    e,
                )
            })
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    pub fn save_to_path(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::configuration_with(
                    format!("could not create config directory {}", parent.display()),
                    e,
                )
            })?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::configuration_with("could not serialize config", e))?;
        fs::write(path, contents).map_err(|e| {
            Error::configuration_with(format!("could not write config file {}", path.display()), e)
        })
    }

    fn config_file_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "parley")
            .expect("Failed to determine config directory");
        proj_dirs.config_dir().join("config.toml")
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn default_model(&self) -> &str {
        self.default_model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn stream(&self) -> bool {
        self.stream.unwrap_or(true)
    }

    /// String lookup for one settable key, `None` when unset.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "base-url" => self.base_url.clone(),
            "default-model" => self.default_model.clone(),
            "stream" => self.stream.map(|on| on.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "base-url" => self.base_url = Some(value.to_string()),
            "default-model" => self.default_model = Some(value.to_string()),
            "stream" => match value {
                "on" | "true" => self.stream = Some(true),
                "off" | "false" => self.stream = Some(false),
                _ => {
                    return Err(Error::validation(format!(
                        "stream must be 'on' or 'off', got '{value}'"
                    )))
                }
            },
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    pub fn unset(&mut self, key: &str) -> Result<()> {
        match key {
            "base-url" => self.base_url = None,
            "default-model" => self.default_model = None,
            "stream" => self.stream = None,
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// Renders every setting for `config show`, marking unset values.
    pub fn render(&self) -> String {
        let mut out = String::from("Current configuration:\n");
        for key in SETTABLE_KEYS {
            match self.get(key) {
                Some(value) => out.push_str(&format!("  {key}: {value}\n")),
                None => out.push_str(&format!("  {key}: (unset)\n")),
            }
        }
        out
    }
}

fn unknown_key(key: &str) -> Error {
    Error::validation(format!(
        "unknown config key '{key}' (expected one of: {})",
        SETTABLE_KEYS.join(", ")
    ))
}
