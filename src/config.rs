use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_LAB_COLLECTION: &str = "mimic_iv_lab_test_individual";
const DEFAULT_CHATBOT_COLLECTION: &str = "ai_medical_chatbot";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_HF_DATASETS_URL: &str = "https://datasets-server.huggingface.co";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the diagnosis server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores the medical corpus.
    pub qdrant_url: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Collection holding lab-test records.
    pub lab_collection_name: String,
    /// Collection holding doctor/patient chatbot transcripts.
    pub chatbot_collection_name: String,
    /// Base URL of the Ollama runtime used for embeddings and generation.
    pub ollama_url: String,
    /// Model used to generate SOAP reports.
    pub llm_model: String,
    /// Embedding model identifier passed to Ollama.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Number of documents retrieved from each collection per diagnosis.
    pub retrieval_top_k: usize,
    /// Directory receiving extracted model archives.
    pub model_dir: PathBuf,
    /// Directory where uploads are staged for the duration of a request.
    pub upload_dir: PathBuf,
    /// Maximum accepted request body size in bytes.
    pub max_upload_bytes: usize,
    /// Executable invoked for OCR.
    pub tesseract_command: String,
    /// Language pack passed to the OCR engine.
    pub ocr_language: String,
    /// Seed empty collections from the public datasets at startup.
    pub seed_on_startup: bool,
    /// Upper bound on rows pulled from each dataset while seeding.
    pub seed_max_rows: usize,
    /// Base URL of the Hugging Face datasets server.
    pub hf_datasets_url: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let embedding_dimension = parse_or("EMBEDDING_DIMENSION", 768_usize)?;
        if embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }
        let retrieval_top_k = parse_or("RETRIEVAL_TOP_K", 3_usize)?;
        if retrieval_top_k == 0 {
            return Err(ConfigError::InvalidValue("RETRIEVAL_TOP_K".into()));
        }

        Ok(Self {
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            lab_collection_name: load_env_optional("LAB_COLLECTION_NAME")
                .unwrap_or_else(|| DEFAULT_LAB_COLLECTION.into()),
            chatbot_collection_name: load_env_optional("CHATBOT_COLLECTION_NAME")
                .unwrap_or_else(|| DEFAULT_CHATBOT_COLLECTION.into()),
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.into()),
            llm_model: load_env_optional("LLM_MODEL").unwrap_or_else(|| "mistral".into()),
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| "nomic-embed-text".into()),
            embedding_dimension,
            retrieval_top_k,
            model_dir: load_env_optional("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("models")),
            upload_dir: load_env_optional("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            tesseract_command: load_env_optional("TESSERACT_COMMAND")
                .unwrap_or_else(|| "tesseract".into()),
            ocr_language: load_env_optional("OCR_LANGUAGE").unwrap_or_else(|| "eng".into()),
            seed_on_startup: load_env_optional("SEED_ON_STARTUP")
                .map(|value| parse_bool("SEED_ON_STARTUP", &value))
                .transpose()?
                .unwrap_or(true),
            seed_max_rows: parse_or("SEED_MAX_ROWS", 1000_usize)?,
            hf_datasets_url: load_env_optional("HF_DATASETS_URL")
                .unwrap_or_else(|| DEFAULT_HF_DATASETS_URL.into()),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(key.to_string())),
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        lab_collection = %config.lab_collection_name,
        chatbot_collection = %config.chatbot_collection_name,
        ollama_url = %config.ollama_url,
        llm_model = %config.llm_model,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
