//! Configuration: the classification taxonomy and application settings.
//!
//! The taxonomy is a JSON file listing request types (with their sub-types)
//! and the fields to extract. Settings come from an optional TOML file with
//! environment overrides for the model backend.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::llm::LlmConfig;

/// Settings file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILENAME: &str = "mailroom.toml";

/// Default taxonomy file, relative to the settings file (or working directory).
pub const DEFAULT_TAXONOMY_FILENAME: &str = "config.json";

/// Errors raised while loading configuration. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("The configuration file is empty: {}", .0.display())]
    Empty(PathBuf),

    #[error("Invalid taxonomy in {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("Failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("Failed to parse JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to parse TOML in {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Read a configuration file, rejecting missing and blank files.
fn read_config_file(path: &Path) -> Result<String, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ConfigError::Missing(path.to_path_buf()),
        _ => ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    if contents.trim().is_empty() {
        return Err(ConfigError::Empty(path.to_path_buf()));
    }
    Ok(contents)
}

/// A request type and its sub-types, in configured order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestType {
    pub name: String,
    pub sub_types: Vec<String>,
}

impl RequestType {
    pub fn new(name: &str, sub_types: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            sub_types: sub_types.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Request types and extraction fields the model classifies against.
///
/// Loaded once and shared read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Taxonomy {
    pub request_types: Vec<RequestType>,
    pub fields: Vec<String>,
}

impl Taxonomy {
    /// Load the taxonomy from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = read_config_file(path)?;
        let value: Value = serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_value(&value).map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Build a taxonomy from parsed JSON.
    ///
    /// `request_types` maps each type name to an array of sub-type names.
    /// `fields_to_extract` is an array of names or an object whose values are
    /// the names. Document order is preserved throughout.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let root = value
            .as_object()
            .ok_or_else(|| "top level must be an object".to_string())?;

        let request_types = root
            .get("request_types")
            .ok_or_else(|| "missing \"request_types\"".to_string())?
            .as_object()
            .ok_or_else(|| "\"request_types\" must be an object".to_string())?
            .iter()
            .map(|(name, sub_types)| {
                let sub_types = match sub_types {
                    Value::Array(items) => string_list(items, name)?,
                    _ => return Err(format!("sub-types of \"{}\" must be an array", name)),
                };
                Ok(RequestType {
                    name: name.clone(),
                    sub_types,
                })
            })
            .collect::<Result<Vec<_>, String>>()?;

        let fields = match root.get("fields_to_extract") {
            Some(Value::Array(items)) => string_list(items, "fields_to_extract")?,
            Some(Value::Object(map)) => {
                let values: Vec<Value> = map.values().cloned().collect();
                string_list(&values, "fields_to_extract")?
            }
            Some(_) => return Err("\"fields_to_extract\" must be an array or object".to_string()),
            None => return Err("missing \"fields_to_extract\"".to_string()),
        };

        Ok(Self {
            request_types,
            fields,
        })
    }
}

fn string_list(items: &[Value], context: &str) -> Result<Vec<String>, String> {
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| format!("entries of \"{}\" must be strings", context))
        })
        .collect()
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Taxonomy JSON file.
    pub taxonomy: PathBuf,
    /// Directory where uploaded files are stored.
    pub upload_dir: PathBuf,
    /// Tesseract language code.
    pub ocr_language: String,
    /// Classification backend.
    pub llm: LlmConfig,
    /// Path to the settings file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            taxonomy: PathBuf::from(DEFAULT_TAXONOMY_FILENAME),
            upload_dir: std::env::temp_dir().join("mailroom-uploads"),
            ocr_language: "eng".to_string(),
            llm: LlmConfig::default(),
            source_path: None,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    ///
    /// Relative paths inside the file are resolved against its directory.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = read_config_file(path)?;
        let mut settings: Settings = toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(base_dir) = path.parent() {
            settings.taxonomy = resolve_path(&settings.taxonomy, base_dir);
            settings.upload_dir = resolve_path(&settings.upload_dir, base_dir);
        }
        settings.source_path = Some(path.to_path_buf());
        Ok(settings)
    }

    /// Load the taxonomy named by these settings.
    pub fn load_taxonomy(&self) -> Result<Taxonomy, ConfigError> {
        Taxonomy::load(&self.taxonomy)
    }
}

fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Options for [`load_settings`], typically from the command line.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit settings file; must exist.
    pub config_path: Option<PathBuf>,
    /// Taxonomy file overriding the settings file.
    pub taxonomy: Option<PathBuf>,
}

/// Resolve settings from the settings file, options and environment.
///
/// Priority: explicit `--config`, then `mailroom.toml` in the working
/// directory, then built-in defaults. Command-line overrides apply on top,
/// and `LLM_*` environment variables apply last.
pub fn load_settings(options: &LoadOptions) -> Result<Settings, ConfigError> {
    let mut settings = match options.config_path {
        Some(ref path) => Settings::load_from_path(path)?,
        None => {
            let discovered = Path::new(DEFAULT_CONFIG_FILENAME);
            if discovered.is_file() {
                tracing::debug!("Using settings from {}", discovered.display());
                Settings::load_from_path(discovered)?
            } else {
                Settings::default()
            }
        }
    };

    if let Some(ref taxonomy) = options.taxonomy {
        settings.taxonomy = taxonomy.clone();
    }
    settings.llm = settings.llm.with_env_overrides();
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::llm::LlmProvider;

    #[test]
    fn test_taxonomy_preserves_order() {
        let value: Value = serde_json::from_str(
            r#"{
                "request_types": {
                    "Money Movement - Outbound": ["Timebound", "Foreign Currency"],
                    "Adjustment": [],
                    "Closing Notice": ["Reallocation Fees", "Amendment Fees"]
                },
                "fields_to_extract": ["deal_name", "amount", "expiration_date"]
            }"#,
        )
        .unwrap();
        let taxonomy = Taxonomy::from_value(&value).unwrap();

        let names: Vec<_> = taxonomy.request_types.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Money Movement - Outbound", "Adjustment", "Closing Notice"]
        );
        assert_eq!(
            taxonomy.request_types[2].sub_types,
            vec!["Reallocation Fees", "Amendment Fees"]
        );
        assert_eq!(taxonomy.fields, vec!["deal_name", "amount", "expiration_date"]);
    }

    #[test]
    fn test_fields_object_form_uses_values() {
        let value = json!({
            "request_types": {"Fee Payment": ["Ongoing Fee"]},
            "fields_to_extract": {"field1": "deal_name", "field2": "amount"}
        });
        let taxonomy = Taxonomy::from_value(&value).unwrap();
        assert_eq!(taxonomy.fields, vec!["deal_name", "amount"]);
    }

    #[test]
    fn test_invalid_shapes_rejected() {
        for value in [
            json!([]),
            json!({"fields_to_extract": []}),
            json!({"request_types": [], "fields_to_extract": []}),
            json!({"request_types": {"A": "not a list"}, "fields_to_extract": []}),
            json!({"request_types": {"A": [1]}, "fields_to_extract": []}),
            json!({"request_types": {}}),
            json!({"request_types": {}, "fields_to_extract": 3}),
        ] {
            assert!(Taxonomy::from_value(&value).is_err(), "{}", value);
        }
    }

    #[test]
    fn test_load_missing_and_empty_files() {
        let dir = TempDir::new().unwrap();

        let missing = dir.path().join("config.json");
        assert!(matches!(Taxonomy::load(&missing), Err(ConfigError::Missing(_))));

        fs::write(&missing, "").unwrap();
        assert!(matches!(Taxonomy::load(&missing), Err(ConfigError::Empty(_))));

        fs::write(&missing, "{ not json").unwrap();
        assert!(matches!(Taxonomy::load(&missing), Err(ConfigError::Json { .. })));
    }

    #[test]
    fn test_load_taxonomy_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"request_types": {"Commitment Change": ["Cashless Roll", "Decrease"]},
                "fields_to_extract": ["deal_name"]}"#,
        )
        .unwrap();

        let taxonomy = Taxonomy::load(&path).unwrap();
        assert_eq!(
            taxonomy.request_types,
            vec![RequestType::new("Commitment Change", &["Cashless Roll", "Decrease"])]
        );
    }

    #[test]
    fn test_settings_from_toml_resolve_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mailroom.toml");
        fs::write(
            &path,
            r#"
taxonomy = "taxonomy/loans.json"
ocr_language = "eng+deu"

[llm]
provider = "openai"
endpoint = "https://api.together.xyz"
model = "meta-llama/Llama-Vision-Free"
timeout_secs = 120
"#,
        )
        .unwrap();

        let settings = Settings::load_from_path(&path).unwrap();
        assert_eq!(settings.taxonomy, dir.path().join("taxonomy/loans.json"));
        assert_eq!(settings.ocr_language, "eng+deu");
        assert_eq!(settings.llm.provider, LlmProvider::OpenAI);
        assert_eq!(settings.llm.timeout_secs, Some(120));
        assert_eq!(settings.source_path.as_deref(), Some(path.as_path()));
        assert!(settings.upload_dir.is_absolute());
    }

    #[test]
    fn test_settings_provider_supplies_endpoint_and_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mailroom.toml");
        fs::write(&path, "[llm]\nprovider = \"together\"\n").unwrap();

        let settings = Settings::load_from_path(&path).unwrap();
        assert_eq!(settings.llm.provider, LlmProvider::OpenAI);
        assert_eq!(settings.llm.endpoint, "https://api.together.xyz");
        assert_eq!(settings.llm.model, "meta-llama/Llama-Vision-Free");
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.taxonomy, PathBuf::from("config.json"));
        assert_eq!(settings.ocr_language, "eng");
        assert!(settings.upload_dir.ends_with("mailroom-uploads"));
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = TempDir::new().unwrap();
        let options = LoadOptions {
            config_path: Some(dir.path().join("absent.toml")),
            taxonomy: None,
        };
        assert!(matches!(load_settings(&options), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mailroom.toml");
        fs::write(&path, "taxonomy = [").unwrap();
        assert!(matches!(
            Settings::load_from_path(&path),
            Err(ConfigError::Toml { .. })
        ));
    }
}
