//! Encrypted multi-key credential vault.
//!
//! Named API keys are stored encrypted-at-rest in a JSON document, with one
//! key selected as the "current" default. Decrypted plaintext lives only in
//! an in-memory cache owned by the vault value and is invalidated whenever
//! the current selection changes. See [`crypto`] for what the encryption
//! does and does not protect against.

pub mod crypto;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Environment variables consulted when no stored key is usable, in order.
pub const ENV_KEY_SOURCES: &[&str] = &["PARLEY_API_KEY", "OPENAI_API_KEY"];

const KEY_PREFIX: &str = "sk-";
const MIN_KEY_LEN: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialEntry {
    /// `ivHex:cipherHex` produced by [`crypto::encrypt`].
    pub key: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// The persisted vault file.
///
/// `keys` is a `BTreeMap` so "first entry in the document's iteration order"
/// is deterministic across runs and platforms when the current key has to be
/// reassigned after a removal.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct VaultDocument {
    pub current: Option<String>,
    #[serde(default)]
    pub keys: BTreeMap<String, CredentialEntry>,
}

/// Process-lifetime plaintext of the current credential. Never persisted.
#[derive(Debug, Default)]
struct DecryptedKeyCache {
    plaintext: Option<String>,
}

impl DecryptedKeyCache {
    fn get(&self) -> Option<&str> {
        self.plaintext.as_deref()
    }

    fn store(&mut self, plaintext: String) {
        self.plaintext = Some(plaintext);
    }

    fn clear(&mut self) {
        self.plaintext = None;
    }
}

/// Metadata for one stored key, safe to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMetadata {
    pub created_at: DateTime<Utc>,
    pub is_current: bool,
}

/// Metadata listing for every stored key. Ciphertext is never exposed.
#[derive(Debug, Clone)]
pub struct KeyListing {
    pub current: Option<String>,
    pub keys: BTreeMap<String, KeyMetadata>,
}

#[derive(Debug)]
pub struct KeyVault {
    document: VaultDocument,
    path: PathBuf,
    encryption_key: [u8; 32],
    cache: DecryptedKeyCache,
}

/// Checks the documented key shape: printable ASCII, recognizable prefix,
/// minimum length.
pub fn is_valid_key_format(key: &str) -> bool {
    key.len() >= MIN_KEY_LEN
        && key.starts_with(KEY_PREFIX)
        && key.bytes().all(|b| (0x21..=0x7e).contains(&b))
}

impl KeyVault {
    /// Opens the vault at the default location, creating an empty document
    /// if the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::vault_file_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let document: VaultDocument = if path.exists() {
            let contents = fs::read_to_string(path).map_err(|e| {
                Error::configuration_with(
                    format!("could not read vault file {}", path.display()),
                    e,
                )
            })?;
            serde_json::from_str(&contents).map_err(|e| {
                Error::configuration_with(
                    format!("vault file {} is not valid JSON", path.display()),
                    e,
                )
            })?
        } else {
            VaultDocument::default()
        };

        // A current name must reference a stored entry; anything else means
        // the file was edited or truncated outside this tool.
        if let Some(current) = &document.current {
            if !document.keys.contains_key(current) {
                return Err(Error::configuration(format!(
                    "vault file {} selects key '{current}' which is not stored",
                    path.display()
                )));
            }
        }

        Ok(Self {
            document,
            path: path.to_path_buf(),
            encryption_key: crypto::derive_encryption_key(),
            cache: DecryptedKeyCache::default(),
        })
    }

    fn vault_file_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "parley")
            .expect("Failed to determine config directory");
        proj_dirs.config_dir().join("keys.json")
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::configuration_with(
                    format!("could not create vault directory {}", parent.display()),
                    e,
                )
            })?;
        }
        let contents = serde_json::to_string_pretty(&self.document)
            .map_err(|e| Error::configuration_with("could not serialize vault", e))?;
        fs::write(&self.path, contents).map_err(|e| {
            Error::configuration_with(
                format!("could not write vault file {}", self.path.display()),
                e,
            )
        })
    }

    /// Encrypts and stores a key. Makes it current when asked to, or when no
    /// current key exists yet; either way the decrypted cache is populated
    /// immediately so the next use skips a decrypt round-trip.
    pub fn add_key(&mut self, name: &str, raw_key: &str, make_current: bool) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::validation("key name must not be empty"));
        }
        if raw_key.is_empty() {
            return Err(Error::validation("key must not be empty"));
        }
        if !is_valid_key_format(raw_key) {
            return Err(Error::validation(format!(
                "key does not look like an API key (expected printable ASCII \
                 starting with '{KEY_PREFIX}', at least {MIN_KEY_LEN} characters)"
            )));
        }

        let ciphertext = crypto::encrypt(raw_key, &self.encryption_key)?;
        self.document.keys.insert(
            name.to_string(),
            CredentialEntry {
                key: ciphertext,
                created_at: Utc::now(),
            },
        );

        if make_current || self.document.current.is_none() {
            self.document.current = Some(name.to_string());
            self.cache.store(raw_key.to_string());
        }

        self.save()?;
        debug!(name, "stored credential");
        Ok(())
    }

    /// Removes a stored key. When the removed entry was current, the first
    /// remaining entry (document iteration order) becomes current and its
    /// plaintext is eagerly re-cached; with no entries left, current clears.
    pub fn remove_key(&mut self, name: &str) -> Result<()> {
        if self.document.keys.remove(name).is_none() {
            return Err(Error::validation(format!("no stored key named '{name}'")));
        }

        if self.document.current.as_deref() == Some(name) {
            self.cache.clear();
            self.document.current = self.document.keys.keys().next().cloned();
            if let Some(next) = self.document.current.clone() {
                let plaintext = self.decrypt_entry(&next)?;
                self.cache.store(plaintext);
            }
        }

        self.save()?;
        debug!(name, "removed credential");
        Ok(())
    }

    /// Selects an existing key as current and re-populates the cache.
    pub fn set_current_key(&mut self, name: &str) -> Result<()> {
        if !self.document.keys.contains_key(name) {
            return Err(Error::validation(format!("no stored key named '{name}'")));
        }
        self.cache.clear();
        let plaintext = self.decrypt_entry(name)?;
        self.document.current = Some(name.to_string());
        self.cache.store(plaintext);
        self.save()
    }

    /// Plaintext of the current key, decrypting (and caching) on first use.
    /// `None` when no current entry exists; decryption failures surface as
    /// authentication errors.
    pub fn current_key(&mut self) -> Result<Option<String>> {
        if let Some(cached) = self.cache.get() {
            return Ok(Some(cached.to_string()));
        }
        let Some(name) = self.document.current.clone() else {
            return Ok(None);
        };
        let plaintext = self.decrypt_entry(&name)?;
        self.cache.store(plaintext.clone());
        Ok(Some(plaintext))
    }

    fn decrypt_entry(&self, name: &str) -> Result<String> {
        let entry = self
            .document
            .keys
            .get(name)
            .ok_or_else(|| Error::validation(format!("no stored key named '{name}'")))?;
        crypto::decrypt(&entry.key, &self.encryption_key)
    }

    /// Metadata-only view of the vault for listing.
    pub fn list_keys(&self) -> KeyListing {
        let keys = self
            .document
            .keys
            .iter()
            .map(|(name, entry)| {
                (
                    name.clone(),
                    KeyMetadata {
                        created_at: entry.created_at,
                        is_current: self.document.current.as_deref() == Some(name.as_str()),
                    },
                )
            })
            .collect();
        KeyListing {
            current: self.document.current.clone(),
            keys,
        }
    }

    /// Resolves the key to use for a request: the stored current key first,
    /// then the [`ENV_KEY_SOURCES`] environment variables in order. The
    /// first value passing the format check wins.
    pub fn api_key(&mut self) -> Result<Option<String>> {
        if let Some(stored) = self.current_key()? {
            if is_valid_key_format(&stored) {
                return Ok(Some(stored));
            }
        }
        for var in ENV_KEY_SOURCES {
            if let Ok(value) = std::env::var(var) {
                if is_valid_key_format(&value) {
                    debug!(source = %var, "using API key from environment");
                    return Ok(Some(value));
                }
            }
        }
        Ok(None)
    }

    /// Auth-gate check used by the dispatcher: some source (stored or
    /// environment) yields a format-valid key. A vault that fails to decrypt
    /// counts as having no valid key.
    pub fn has_valid_key(&mut self) -> bool {
        matches!(self.api_key(), Ok(Some(_)))
    }

    pub fn is_empty(&self) -> bool {
        self.document.keys.is_empty()
    }
}
