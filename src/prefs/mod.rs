pub mod store;

pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationPreference {
    pub rotation_degrees: f32,
}

/// Rotation preferences keyed by instance signature, stored as
/// `"<namespace>:<signature>" -> {"rotationDegrees": n}`.
pub struct PreferenceStore {
    namespace: String,
    backend: Box<dyn KeyValueStore>,
}

impl PreferenceStore {
    pub fn new(namespace: &str, backend: Box<dyn KeyValueStore>) -> Self {
        Self {
            namespace: namespace.to_string(),
            backend,
        }
    }

    pub fn key_for(&self, signature: &str) -> String {
        format!("{}:{}", self.namespace, signature)
    }

    pub fn save_preference(
        &mut self,
        signature: &str,
        preference: &RotationPreference,
    ) -> store::Result<()> {
        let key = self.key_for(signature);
        let json = serde_json::to_string(preference)?;
        self.backend.set(&key, json)
    }

    /// A value that no longer parses is reported and treated as absent.
    pub fn load_preference(&self, signature: &str) -> store::Result<Option<RotationPreference>> {
        let key = self.key_for(signature);
        let Some(json) = self.backend.get(&key)? else {
            return Ok(None);
        };
        match serde_json::from_str::<RotationPreference>(&json) {
            Ok(preference) if preference.rotation_degrees.is_finite() => Ok(Some(preference)),
            Ok(_) => {
                log::warn!("Ignoring non-finite rotation preference under '{}'", key);
                Ok(None)
            }
            Err(err) => {
                log::warn!("Ignoring unreadable preference under '{}': {}", key, err);
                Ok(None)
            }
        }
    }

    /// Writes an arbitrary JSON document under a raw key (outside the namespace).
    pub fn save_snapshot<T: serde::Serialize>(&mut self, key: &str, value: &T) -> store::Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        self.backend.set(key, json)
    }

    pub fn load_raw(&self, key: &str) -> store::Result<Option<String>> {
        self.backend.get(key)
    }
}

/// Slot-index based default angles, optionally overridden per model.
#[derive(Debug, Clone, Default)]
pub struct DefaultRotations {
    generic: Vec<f32>,
    per_model: HashMap<String, Vec<f32>>,
    model_key: Option<String>,
}

impl DefaultRotations {
    pub fn new(generic: Vec<f32>, per_model: HashMap<String, Vec<f32>>) -> Self {
        Self {
            generic,
            per_model,
            model_key: None,
        }
    }

    pub fn set_model_key(&mut self, model_key: Option<String>) {
        self.model_key = model_key;
    }

    /// Defaults of the active model when it has a table, the generic table
    /// otherwise; indices past the table end rotate 0 degrees.
    pub fn default_for(&self, index: usize) -> f32 {
        let table = self
            .model_key
            .as_ref()
            .and_then(|key| self.per_model.get(key))
            .unwrap_or(&self.generic);
        table.get(index).copied().unwrap_or(0.0)
    }
}
