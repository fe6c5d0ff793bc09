use serde::{Deserialize, Serialize};

use super::defaults;

/// Typed view over `config.yml` merged with `secrets.yaml` and the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub rag: RagConfig,
    pub graph: GraphConfig,
    pub privacy: PrivacyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: defaults::local_origins(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Gemini,
    OpenaiCompat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: Option<f64>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            base_url: None,
            api_key: None,
            chat_model: defaults::GEMINI_CHAT_MODEL.to_string(),
            embedding_model: defaults::GEMINI_EMBEDDING_MODEL.to_string(),
            temperature: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Directory holding the `*.txt` policy documents.
    pub data_dir: String,
    /// Directory holding the persisted vector index.
    pub index_dir: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub acceptance_threshold: f32,
    pub embed_batch_size: usize,
    pub build_on_startup: bool,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            index_dir: "vdb".to_string(),
            chunk_size: 350,
            chunk_overlap: 90,
            acceptance_threshold: defaults::ACCEPTANCE_THRESHOLD,
            embed_batch_size: 32,
            build_on_startup: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub checkpoint: CheckpointBackend,
    pub max_steps: usize,
    pub retriever_k: usize,
    pub retriever_score_threshold: f32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            checkpoint: CheckpointBackend::Sqlite,
            max_steps: 25,
            retriever_k: 2,
            retriever_score_threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    pub mask_graph_responses: bool,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            mask_graph_responses: true,
        }
    }
}
