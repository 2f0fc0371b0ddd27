//! Process-wide variable store, namespaced per scenario execution.
//!
//! Steps save extracted values ("save the `Location` header in `loc`") and
//! later steps read them back through `${loc}` placeholders. Scenarios run
//! on worker threads, so each scenario execution gets its own namespace and
//! drops it at teardown.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use once_cell::sync::Lazy;

static STORE: Lazy<Mutex<HashMap<u64, HashMap<String, String>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

static NEXT_SCOPE: AtomicU64 = AtomicU64::new(0);

/// Handle to one scenario's variable namespace.
///
/// Dropping the scope clears every variable saved under it.
#[derive(Debug)]
pub struct VarScope {
    id: u64,
}

impl VarScope {
    /// Opens a fresh, empty namespace.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_SCOPE.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Saves `value` under `name`, replacing any previous value.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        let mut store = lock();
        let _ = store
            .entry(self.id)
            .or_default()
            .insert(name.into(), value.into());
    }

    /// Reads the variable `name` back, if it was saved in this scope.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        lock().get(&self.id).and_then(|vars| vars.get(name).cloned())
    }

    /// Replaces every `${name}` placeholder in `text` with the saved value.
    /// Placeholders naming unsaved variables are left untouched, so a typo
    /// surfaces verbatim in the failure message instead of vanishing.
    #[must_use]
    pub fn expand(&self, text: &str) -> String {
        let Some(vars) = lock().get(&self.id).cloned() else {
            return text.to_owned();
        };
        let mut out = text.to_owned();
        for (name, value) in &vars {
            out = out.replace(&format!("${{{name}}}"), value);
        }
        out
    }
}

impl Default for VarScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for VarScope {
    fn drop(&mut self) {
        let _ = lock().remove(&self.id);
    }
}

fn lock() -> std::sync::MutexGuard<'static, HashMap<u64, HashMap<String, String>>>
{
    // Variable maps hold plain strings, so a poisoned lock still carries
    // consistent data.
    STORE.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
