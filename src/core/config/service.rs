use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::types::AppConfig;
use super::validation::validate_config;
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 6] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
];

const SENSITIVE_WHITELIST: [&str; 2] = ["max_tokens", "tokens"];

/// Environment variables mapped onto config paths. Later entries win.
const ENV_OVERRIDES: [(&str, &[&str]); 8] = [
    ("HOST", &["server", "host"]),
    ("PORT", &["server", "port"]),
    ("LLM_PROVIDER", &["llm", "provider"]),
    ("LLM_BASE_URL", &["llm", "base_url"]),
    ("LLM_CHAT_MODEL", &["llm", "chat_model"]),
    ("LLM_EMBEDDING_MODEL", &["llm", "embedding_model"]),
    ("LLM_API_KEY", &["llm", "api_key"]),
    ("GEMINI_API_KEY", &["llm", "api_key"]),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("CLAIMS_RAG_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Reads `config.yml`, layers `secrets.yaml` and the environment on top,
    /// and validates the result.
    pub fn load_config(&self) -> Result<AppConfig, ApiError> {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        let mut merged = deep_merge(&public_config, &secrets_config);
        apply_env_overrides(&mut merged, |key| env::var(key).ok());
        parse_config(merged)
    }

    pub fn redact_sensitive_values(&self, config: &AppConfig) -> Value {
        let value = serde_json::to_value(config).unwrap_or(Value::Null);
        redact_sensitive_values(&value)
    }
}

pub(crate) fn parse_config(value: Value) -> Result<AppConfig, ApiError> {
    let config: AppConfig = serde_json::from_value(value)
        .map_err(|e| ApiError::BadRequest(format!("Invalid configuration: {}", e)))?;
    validate_config(&config)?;
    Ok(config)
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                tracing::warn!("Ignoring unparsable config {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(err) => {
            tracing::warn!("Failed to read config {}: {}", path.display(), err);
            Value::Object(Map::new())
        }
    }
}

fn apply_env_overrides<F>(config: &mut Value, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (key, path) in ENV_OVERRIDES {
        let Some(raw) = lookup(key) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let value = match raw.parse::<u64>() {
            Ok(number) if key == "PORT" => Value::from(number),
            _ => Value::String(raw.to_string()),
        };
        ensure_object_path(config, path, value);
    }
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }
    if !config.is_object() {
        *config = Value::Object(Map::new());
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::types::{CheckpointBackend, ProviderKind};
    use serde_json::json;

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "llm": { "chat_model": "a", "timeout_secs": 10 },
            "rag": { "data_dir": "data" }
        });
        let secrets = json!({ "llm": { "api_key": "k" } });

        let merged = deep_merge(&base, &secrets);

        assert_eq!(
            merged,
            json!({
                "llm": { "chat_model": "a", "timeout_secs": 10, "api_key": "k" },
                "rag": { "data_dir": "data" }
            })
        );
    }

    #[test]
    fn env_overrides_populate_nested_paths() {
        let mut config = json!({ "server": { "host": "127.0.0.1" } });
        apply_env_overrides(&mut config, |key| match key {
            "PORT" => Some("9100".to_string()),
            "GEMINI_API_KEY" => Some("gem-key".to_string()),
            "LLM_PROVIDER" => Some("openai_compat".to_string()),
            _ => None,
        });

        let parsed = parse_config(config).expect("config should parse");
        assert_eq!(parsed.server.host, "127.0.0.1");
        assert_eq!(parsed.server.port, 9100);
        assert_eq!(parsed.llm.api_key.as_deref(), Some("gem-key"));
        assert_eq!(parsed.llm.provider, ProviderKind::OpenaiCompat);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let parsed = parse_config(json!({ "graph": { "checkpoint": "memory" } }))
            .expect("config should parse");

        assert_eq!(parsed.graph.checkpoint, CheckpointBackend::Memory);
        assert_eq!(parsed.graph.retriever_k, 2);
        assert_eq!(parsed.rag.chunk_size, 350);
        assert_eq!(parsed.rag.chunk_overlap, 90);
        assert!((parsed.rag.acceptance_threshold - 0.60).abs() < f32::EPSILON);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let result = parse_config(json!({ "rag": { "chunk_size": 10, "chunk_overlap": 20 } }));
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "llm": { "api_key": "secret", "max_tokens": 42 },
            "items": [ { "password": "pw" } ]
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "llm": { "api_key": "****", "max_tokens": 42 },
                "items": [ { "password": "****" } ]
            })
        );
    }

    #[test]
    fn load_config_reads_yaml_from_project_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("config.yml"),
            "rag:\n  data_dir: policies\n  chunk_size: 500\n",
        )
        .expect("write config");
        let paths = Arc::new(AppPaths::with_root(dir.path()));
        let service = ConfigService::new(paths);

        let yaml = load_yaml_file(&dir.path().join("config.yml"));
        let parsed = parse_config(yaml).expect("config should parse");

        assert_eq!(parsed.rag.data_dir, "policies");
        assert_eq!(parsed.rag.chunk_size, 500);
        assert_eq!(service.secrets_path(), dir.path().join("secrets.yaml"));
    }
}
