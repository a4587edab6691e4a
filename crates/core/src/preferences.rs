use crate::types::{Preferences, PreferencesUpdate};
use parking_lot::RwLock;
use tracing::info;

/// Process-wide runtime toggles. Starts from defaults and only changes
/// through [`PreferenceStore::update`].
pub struct PreferenceStore {
    current: RwLock<Preferences>,
}

impl PreferenceStore {
    pub fn new(initial: Preferences) -> Self {
        Self {
            current: RwLock::new(Self::sanitize(initial)),
        }
    }

    pub fn get(&self) -> Preferences {
        *self.current.read()
    }

    /// Apply the fields present in `update` and return the result.
    pub fn update(&self, update: PreferencesUpdate) -> Preferences {
        let mut current = self.current.write();

        if let Some(include) = update.include_history_in_ai {
            current.include_history_in_ai = include;
        }
        if let Some(enabled) = update.history_enabled {
            current.history_enabled = enabled;
        }
        if let Some(max_len) = update.max_history_length {
            current.max_history_length = max_len;
        }

        *current = Self::sanitize(*current);
        info!(
            "Preferences updated: include_history_in_ai={}, history_enabled={}, max_history_length={}",
            current.include_history_in_ai, current.history_enabled, current.max_history_length
        );
        *current
    }

    fn sanitize(mut preferences: Preferences) -> Preferences {
        preferences.max_history_length = preferences.max_history_length.max(1);
        preferences
    }
}

impl Default for PreferenceStore {
    fn default() -> Self {
        Self::new(Preferences::default())
    }
}
