//! Scoped overrides of `MOCKSVC_*` and related variables.
//!
//! The environment is process-wide; tests using these should run under
//! `#[serial]`.

/// Previous value of one variable, put back when dropped.
pub struct EnvGuard {
    key: String,
    saved: Option<String>,
}

impl EnvGuard {
    fn capture(key: &str) -> Self {
        Self {
            key: key.to_string(),
            saved: std::env::var(key).ok(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: callers serialize env-touching tests
        unsafe {
            match self.saved.take() {
                Some(v) => std::env::set_var(&self.key, v),
                None => std::env::remove_var(&self.key),
            }
        }
    }
}

pub fn set_env_guarded(key: &str, val: &str) -> EnvGuard {
    let guard = EnvGuard::capture(key);
    // SAFETY: see above
    unsafe { std::env::set_var(key, val) };
    guard
}

pub fn unset_env_guarded(key: &str) -> EnvGuard {
    let guard = EnvGuard::capture(key);
    // SAFETY: see above
    unsafe { std::env::remove_var(key) };
    guard
}

/// A set of overrides, undone in reverse order on drop.
#[derive(Default)]
pub struct Env {
    guards: Vec<EnvGuard>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, val: &str) -> Self {
        self.guards.push(set_env_guarded(key, val));
        self
    }

    pub fn unset(mut self, key: &str) -> Self {
        self.guards.push(unset_env_guarded(key));
        self
    }
}

impl Drop for Env {
    fn drop(&mut self) {
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}
