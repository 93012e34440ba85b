//! Runtime configuration read from the environment (and `.env` when present).

use crate::divination::EscalationPolicy;
use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_UTC_OFFSET_HOURS: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Any OpenAI-compatible chat completions endpoint (DeepSeek by default)
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    pub fn from_str(s: &str) -> Option<ProviderKind> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "deepseek" => Some(ProviderKind::OpenAi),
            "anthropic" | "claude" => Some(ProviderKind::Anthropic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub request_timeout: Duration,
    pub generative_enabled: bool,
    pub memory_dir: PathBuf,
    pub log_db_path: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub escalation_policy: EscalationPolicy,
    pub default_utc_offset: f64,
    pub rng_seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            provider: ProviderKind::OpenAi,
            api_key: None,
            base_url: None,
            model: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            generative_enabled: true,
            memory_dir: PathBuf::from("user_memories"),
            log_db_path: PathBuf::from("nua_chat_logs.db"),
            log_dir: None,
            escalation_policy: EscalationPolicy::SharedFlag,
            default_utc_offset: DEFAULT_UTC_OFFSET_HOURS,
            rng_seed: None,
        }
    }
}

impl AppConfig {
    /// Load from the process environment, reading `.env` first if it exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = AppConfig::default();

        if let Some(addr) = get("NUA_BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "NUA_BIND_ADDR", value: addr })?;
        }
        if let Some(provider) = get("NUA_LLM_PROVIDER") {
            config.provider = ProviderKind::from_str(&provider)
                .ok_or(ConfigError::Invalid { key: "NUA_LLM_PROVIDER", value: provider })?;
        }

        let provider = config.provider;
        config.api_key = get("NUA_LLM_API_KEY").or_else(|| match provider {
            ProviderKind::OpenAi => get("DEEPSEEK_API_KEY"),
            ProviderKind::Anthropic => get("ANTHROPIC_API_KEY"),
        });
        config.base_url = get("NUA_LLM_BASE_URL");
        config.model = get("NUA_LLM_MODEL");

        if let Some(secs) = get("NUA_LLM_TIMEOUT_SECS") {
            let parsed: u64 = secs
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "NUA_LLM_TIMEOUT_SECS", value: secs.clone() })?;
            config.request_timeout = Duration::from_secs(parsed.max(1));
        }
        if let Some(flag) = get("NUA_GENERATIVE_ENABLED") {
            config.generative_enabled = parse_bool(&flag)
                .ok_or(ConfigError::Invalid { key: "NUA_GENERATIVE_ENABLED", value: flag })?;
        }
        if let Some(dir) = get("NUA_MEMORY_DIR") {
            config.memory_dir = PathBuf::from(dir);
        }
        if let Some(path) = get("NUA_LOG_DB") {
            config.log_db_path = PathBuf::from(path);
        }
        config.log_dir = get("NUA_LOG_DIR").map(PathBuf::from);

        if let Some(policy) = get("NUA_ESCALATION_POLICY") {
            config.escalation_policy = EscalationPolicy::from_str(&policy)
                .ok_or(ConfigError::Invalid { key: "NUA_ESCALATION_POLICY", value: policy })?;
        }
        if let Some(offset) = get("NUA_DEFAULT_UTC_OFFSET") {
            config.default_utc_offset = offset
                .parse::<f64>()
                .ok()
                .filter(|h| h.abs() <= 14.0)
                .ok_or(ConfigError::Invalid { key: "NUA_DEFAULT_UTC_OFFSET", value: offset })?;
        }
        if let Some(seed) = get("NUA_RNG_SEED") {
            config.rng_seed = Some(
                seed.parse()
                    .map_err(|_| ConfigError::Invalid { key: "NUA_RNG_SEED", value: seed })?,
            );
        }

        Ok(config)
    }

    /// Whether a generative client should be built at all
    pub fn generative_available(&self) -> bool {
        self.generative_enabled && self.api_key.is_some()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert!(config.api_key.is_none());
        assert!(!config.generative_available());
        assert_eq!(config.escalation_policy, EscalationPolicy::SharedFlag);
        assert_eq!(config.default_utc_offset, 8.0);
    }

    #[test]
    fn test_deepseek_key_and_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DEEPSEEK_API_KEY", "  sk-test  "),
            ("NUA_LLM_TIMEOUT_SECS", "5"),
            ("NUA_ESCALATION_POLICY", "per_method"),
            ("NUA_RNG_SEED", "42"),
        ]))
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.escalation_policy, EscalationPolicy::PerMethod);
        assert_eq!(config.rng_seed, Some(42));
        assert!(config.generative_available());
    }

    #[test]
    fn test_disabled_generation_wins_over_key() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DEEPSEEK_API_KEY", "sk-test"),
            ("NUA_GENERATIVE_ENABLED", "off"),
        ]))
        .unwrap();
        assert!(!config.generative_available());
    }

    #[test]
    fn test_anthropic_provider_reads_its_own_key() {
        let config = AppConfig::from_lookup(lookup(&[
            ("NUA_LLM_PROVIDER", "anthropic"),
            ("DEEPSEEK_API_KEY", "sk-deepseek"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
        ]))
        .unwrap();
        assert_eq!(config.provider, ProviderKind::Anthropic);
        assert_eq!(config.api_key.as_deref(), Some("sk-ant"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(AppConfig::from_lookup(lookup(&[("NUA_BIND_ADDR", "nowhere")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("NUA_DEFAULT_UTC_OFFSET", "30")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("NUA_LLM_PROVIDER", "carrier-pigeon")])).is_err());
    }
}
