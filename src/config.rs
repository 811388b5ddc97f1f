use crate::fit::DEFAULT_PAD_PERCENT;
use crate::roles::{RoleTable, DEFAULT_DECAL_KEYWORDS, LOGOS};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Engine settings. Every field has a default, so a config file only needs
/// the values it changes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LiveryConfig {
    /// Role overrides applied on top of the built-in matchers; each entry
    /// replaces that role's pattern list.
    pub role_matchers: BTreeMap<String, Vec<String>>,
    pub decal_keywords: Vec<String>,
    pub pad_percent: f32,
    pub default_rotations: Vec<f32>,
    pub model_rotations: HashMap<String, Vec<f32>>,
    pub model_key: Option<String>,
    pub store_namespace: String,
    pub snapshot_key: String,
    pub logos_role: String,
}

impl Default for LiveryConfig {
    fn default() -> Self {
        let mut model_rotations = HashMap::new();
        model_rotations.insert("jetski6".to_string(), vec![90.0, 90.0, 180.0, 0.0]);
        Self {
            role_matchers: BTreeMap::new(),
            decal_keywords: DEFAULT_DECAL_KEYWORDS
                .iter()
                .map(|keyword| keyword.to_string())
                .collect(),
            pad_percent: DEFAULT_PAD_PERCENT,
            default_rotations: vec![90.0, 90.0, 180.0, 0.0],
            model_rotations,
            model_key: None,
            store_namespace: "logos:pref".to_string(),
            snapshot_key: "logos:map".to_string(),
            logos_role: LOGOS.to_string(),
        }
    }
}

impl LiveryConfig {
    pub fn role_table(&self) -> RoleTable {
        let mut table = RoleTable::with_defaults();
        for (role, patterns) in &self.role_matchers {
            table.register_matchers(role, patterns);
        }
        table.set_decal_keywords(&self.decal_keywords);
        table
    }
}

pub fn load_config_from_file(path: &Path) -> Result<LiveryConfig> {
    let json = std::fs::read_to_string(path)?;
    let config: LiveryConfig = serde_json::from_str(&json)?;
    Ok(config)
}

pub fn save_config_to_file(config: &LiveryConfig, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}
