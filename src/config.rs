use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::agent::{CompletionConfig, DEFAULT_CHUNK_SIZE};
use crate::run::RunProfile;

/// Which content producer serves the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProducerKind {
    Static,
    Completion,
}

/// Process configuration, resolved once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: String,
    /// Present when an upstream API key is configured
    pub completion: Option<CompletionConfig>,
    pub context_dir: PathBuf,
    pub max_context_chars: usize,
    pub profile: RunProfile,
    pub chunk_size: usize,
    pub typing_delay: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
            completion: None,
            context_dir: PathBuf::from("docs"),
            max_context_chars: 60_000,
            profile: RunProfile::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            typing_delay: Duration::from_millis(30),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `get`; unset or unparseable values keep
    /// their defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let completion = get("OPENAI_API_KEY").map(|api_key| {
            let mut completion = CompletionConfig::new(api_key);
            if let Some(base_url) = get("OPENAI_BASE_URL") {
                completion.base_url = base_url;
            }
            if let Some(model) = get("OPENAI_MODEL") {
                completion.model = model;
            }
            completion.temperature = parse_var(&get, "OPENAI_TEMPERATURE");
            completion.degrade_errors =
                parse_flag(&get, "AGENT_DEGRADE_ERRORS").unwrap_or(completion.degrade_errors);
            completion
        });

        let profile = RunProfile {
            include_synthetic_steps: parse_flag(&get, "AGENT_SYNTHETIC_STEPS")
                .unwrap_or(defaults.profile.include_synthetic_steps),
            step_pause: parse_var(&get, "AGENT_STEP_PAUSE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.profile.step_pause),
        };

        Self {
            addr: get("AGENT_ADDR").unwrap_or(defaults.addr),
            completion,
            context_dir: get("AGENT_CONTEXT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.context_dir),
            max_context_chars: parse_var(&get, "AGENT_MAX_CONTEXT_CHARS")
                .unwrap_or(defaults.max_context_chars),
            profile,
            chunk_size: parse_var::<usize>(&get, "AGENT_CHUNK_SIZE")
                .unwrap_or(defaults.chunk_size)
                .max(1),
            typing_delay: parse_var(&get, "AGENT_TYPING_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.typing_delay),
        }
    }

    pub fn producer_kind(&self) -> ProducerKind {
        if self.completion.is_some() {
            ProducerKind::Completion
        } else {
            ProducerKind::Static
        }
    }
}

fn parse_var<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = get(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable setting");
            None
        }
    }
}

fn parse_flag(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    let raw = get(key)?;
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring unparseable flag");
            None
        }
    }
}
