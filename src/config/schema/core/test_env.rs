use std::sync::{LazyLock, Mutex};

/// Serializes tests that touch process environment variables.
pub(super) static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Restores an environment variable to its prior value on drop.
pub(super) struct ScopedEnv {
    key: &'static str,
    saved: Option<String>,
}

impl ScopedEnv {
    pub(super) fn set(key: &'static str, value: &str) -> Self {
        let saved = std::env::var(key).ok();
        // SAFETY: callers hold ENV_LOCK, so no other test mutates the
        // environment concurrently.
        unsafe { std::env::set_var(key, value) };
        Self { key, saved }
    }

    pub(super) fn unset(key: &'static str) -> Self {
        let saved = std::env::var(key).ok();
        // SAFETY: see `set`.
        unsafe { std::env::remove_var(key) };
        Self { key, saved }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        // SAFETY: ENV_LOCK is still held by the owning test.
        unsafe {
            match self.saved.take() {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }
}
