//! Shared helpers for tests that touch process environment variables.
//! Such tests must be serialized, and must restore whatever they changed.

use std::sync::{Mutex, MutexGuard, OnceLock};

pub use tempfile::TempDir;

pub fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Sets the given environment variables, restoring their previous values
/// (or removing them) on drop. Holds the global env lock for its lifetime.
pub struct EnvGuard {
    _lock: MutexGuard<'static, ()>,
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    pub fn set(vars: &[(&str, &str)]) -> Self {
        let lock = env_lock().lock().unwrap_or_else(|err| err.into_inner());
        let saved = vars
            .iter()
            .map(|(name, value)| {
                let prev = std::env::var(name).ok();
                // SAFETY: mutations are serialized by env_lock.
                unsafe {
                    std::env::set_var(name, value);
                }
                (name.to_string(), prev)
            })
            .collect();
        Self { _lock: lock, saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, prev) in &self.saved {
            // SAFETY: mutations are serialized by env_lock.
            unsafe {
                match prev {
                    Some(value) => std::env::set_var(name, value),
                    None => std::env::remove_var(name),
                }
            }
        }
    }
}

pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}
