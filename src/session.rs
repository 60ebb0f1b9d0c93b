//! Persisted conversation transcripts.
//!
//! A session is a named transcript (messages, optional system prompt,
//! attached-file references) saved as one JSON file per id. Saving and
//! re-loading a session reproduces the message sequence exactly, in order.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "systemPrompt", default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatTurn>,
    #[serde(rename = "fileIds", default)]
    pub attached_file_ids: Vec<String>,
}

impl Session {
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatTurn {
            role: Role::User,
            content: content.into(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatTurn {
            role: Role::Assistant,
            content: content.into(),
        });
    }
}

pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Store rooted at the platform data directory.
    pub fn open() -> Self {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "parley")
            .expect("Failed to determine data directory");
        Self::open_at(proj_dirs.data_dir().join("sessions"))
    }

    pub fn open_at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Starts a fresh session with a clock-derived id. Ids are unique within
    /// a process run even when two sessions start in the same second.
    pub fn create(&self) -> Session {
        static SESSION_SEQ: AtomicU64 = AtomicU64::new(1);
        let seq = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        Session {
            id: format!("{}-{seq}", now.format("%Y%m%d-%H%M%S")),
            created_at: now,
            system_prompt: None,
            messages: Vec::new(),
            attached_file_ids: Vec::new(),
        }
    }

    fn session_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Loads a saved session by id. Fields absent from older files default
    /// to no system prompt and no attachments.
    pub fn load(&self, id: &str) -> Result<Session> {
        let path = self.session_path(id);
        if !path.exists() {
            return Err(Error::validation(format!("no session named '{id}'")));
        }
        let contents = fs::read_to_string(&path).map_err(|e| {
            Error::configuration_with(format!("could not read session {}", path.display()), e)
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            Error::configuration_with(
                format!("session file {} is not valid JSON", path.display()),
                e,
            )
        })
    }

    /// Saves the full session under its id, stamping a fresh `createdAt`.
    pub fn save(&self, session: &mut Session) -> Result<PathBuf> {
        let path = self.session_path(&session.id);
        self.save_to_path(session, &path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, session: &mut Session, path: &Path) -> Result<()> {
        session.created_at = Utc::now();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::configuration_with(
                    format!("could not create session directory {}", parent.display()),
                    e,
                )
            })?;
        }
        let contents = serde_json::to_string_pretty(session)
            .map_err(|e| Error::configuration_with("could not serialize session", e))?;
        fs::write(path, contents).map_err(|e| {
            Error::configuration_with(format!("could not write session {}", path.display()), e)
        })?;
        debug!(id = %session.id, path = %path.display(), "saved session");
        Ok(())
    }

    /// Ids of every saved session, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            Error::configuration_with(
                format!("could not read session directory {}", self.dir.display()),
                e,
            )
        })?;
        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    path.file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned())
                } else {
                    None
                }
            })
            .collect();
        ids.sort();
        Ok(ids)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.session_path(id);
        if !path.exists() {
            return Err(Error::validation(format!("no session named '{id}'")));
        }
        fs::remove_file(&path).map_err(|e| {
            Error::configuration_with(format!("could not delete session {}", path.display()), e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SessionStore {
        SessionStore::open_at(dir.path().join("sessions"))
    }

    #[test]
    fn save_then_load_reproduces_messages_in_order() {
        let dir = TempDir::new().expect("temp dir");
        let store = store_in(&dir);

        let mut session = store.create();
        session.system_prompt = Some("You are terse.".to_string());
        session.push_user("first");
        session.push_assistant("second");
        session.push_user("third");
        store.save(&mut session).expect("save");

        let loaded = store.load(&session.id).expect("load");
        assert_eq!(loaded.id, session.id);
        assert_eq!(loaded.system_prompt.as_deref(), Some("You are terse."));
        assert_eq!(loaded.messages.len(), 3);
        assert_eq!(loaded.messages[0].role, Role::User);
        assert_eq!(loaded.messages[0].content, "first");
        assert_eq!(loaded.messages[1].role, Role::Assistant);
        assert_eq!(loaded.messages[1].content, "second");
        assert_eq!(loaded.messages[2].role, Role::User);
        assert_eq!(loaded.messages[2].content, "third");
    }

    #[test]
    fn absent_fields_default_on_load() {
        let dir = TempDir::new().expect("temp dir");
        let store = store_in(&dir);
        let sessions_dir = dir.path().join("sessions");
        fs::create_dir_all(&sessions_dir).expect("mkdir");
        fs::write(
            sessions_dir.join("bare.json"),
            r#"{"id": "bare", "createdAt": "2026-08-01T12:00:00Z",
                "messages": [{"role": "user", "content": "hi"}]}"#,
        )
        .expect("write");

        let loaded = store.load("bare").expect("load");
        assert_eq!(loaded.system_prompt, None);
        assert!(loaded.attached_file_ids.is_empty());
        assert_eq!(loaded.messages.len(), 1);
    }

    #[test]
    fn loading_unknown_id_fails() {
        let dir = TempDir::new().expect("temp dir");
        let store = store_in(&dir);
        let err = store.load("missing").expect_err("must fail");
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn created_ids_are_unique_within_a_run() {
        let dir = TempDir::new().expect("temp dir");
        let store = store_in(&dir);
        let first = store.create();
        let second = store.create();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn save_refreshes_created_at() {
        let dir = TempDir::new().expect("temp dir");
        let store = store_in(&dir);
        let mut session = store.create();
        let stamped = session.created_at;
        session.push_user("hello");
        store.save(&mut session).expect("save");
        assert!(session.created_at >= stamped);
    }

    #[test]
    fn list_and_delete_cover_saved_sessions() {
        let dir = TempDir::new().expect("temp dir");
        let store = store_in(&dir);

        let mut a = store.create();
        a.push_user("a");
        store.save(&mut a).expect("save a");
        let mut b = store.create();
        b.push_user("b");
        store.save(&mut b).expect("save b");

        let listed = store.list().expect("list");
        assert_eq!(listed.len(), 2);
        assert!(listed.contains(&a.id));

        store.delete(&a.id).expect("delete");
        assert_eq!(store.list().expect("list").len(), 1);
        assert!(matches!(
            store.delete(&a.id),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn attached_file_ids_round_trip_in_order() {
        let dir = TempDir::new().expect("temp dir");
        let store = store_in(&dir);
        let mut session = store.create();
        session.attached_file_ids = vec!["file-2".into(), "file-1".into()];
        store.save(&mut session).expect("save");

        let loaded = store.load(&session.id).expect("load");
        assert_eq!(loaded.attached_file_ids, vec!["file-2", "file-1"]);
    }
}
