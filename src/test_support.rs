//! Helpers shared by unit tests across modules.

use std::sync::{Mutex, MutexGuard, OnceLock};

use crate::auth::ENV_KEY_SOURCES;

/// Serializes tests that touch the credential environment variables and
/// restores whatever was set before, on drop.
pub struct EnvKeyGuard {
    _lock: MutexGuard<'static, ()>,
    saved: Vec<(&'static str, Option<String>)>,
}

impl EnvKeyGuard {
    pub fn new() -> Self {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        let lock = ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let saved = ENV_KEY_SOURCES
            .iter()
            .map(|var| {
                let prior = std::env::var(var).ok();
                std::env::remove_var(var);
                (*var, prior)
            })
            .collect();
        Self { _lock: lock, saved }
    }

    pub fn set(&self, var: &str, value: &str) {
        std::env::set_var(var, value);
    }
}

impl Drop for EnvKeyGuard {
    fn drop(&mut self) {
        for (var, prior) in &self.saved {
            match prior {
                Some(value) => std::env::set_var(var, value),
                None => std::env::remove_var(var),
            }
        }
    }
}
