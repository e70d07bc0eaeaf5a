//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数
//! 2. careerhq.toml 設定ファイル
//! 3. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::llm::ModelProfile;
use crate::workflow::RunOptions;
use crate::{Error, Result};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "careerhq.toml";

/// LLM Provider type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Anthropic Claude API
    #[default]
    Claude,
    /// OpenAI-compatible chat completions API
    OpenAi,
}

impl LlmProvider {
    /// Parse a provider name; anything not OpenAI-compatible is Claude
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "openai" | "glm" | "zai" | "minimax" | "deepseek" => Self::OpenAi,
            _ => Self::Claude,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Claude => "https://api.anthropic.com/v1",
            Self::OpenAi => "https://api.openai.com/v1",
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,

    /// API key
    #[serde(default)]
    pub api_key: String,

    /// Model for the basic profile
    #[serde(default = "default_model")]
    pub basic_model: String,

    /// Model for the reasoning profile; falls back to `basic_model`
    #[serde(default)]
    pub reasoning_model: Option<String>,

    /// Base URL (optional, for custom endpoints)
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,

    /// HTTP request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_basic_temperature")]
    pub basic_temperature: f32,

    #[serde(default = "default_reasoning_temperature")]
    pub reasoning_temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Claude,
            api_key: String::new(),
            basic_model: default_model(),
            reasoning_model: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            basic_temperature: default_basic_temperature(),
            reasoning_temperature: default_reasoning_temperature(),
        }
    }
}

impl LlmConfig {
    /// Model name used for a profile
    pub fn model_for(&self, profile: ModelProfile) -> &str {
        match profile {
            ModelProfile::Basic => &self.basic_model,
            ModelProfile::Reasoning => self.reasoning_model.as_deref().unwrap_or(&self.basic_model),
        }
    }

    /// Sampling temperature used for a profile
    pub fn temperature_for(&self, profile: ModelProfile) -> f32 {
        match profile {
            ModelProfile::Basic => self.basic_temperature,
            ModelProfile::Reasoning => self.reasoning_temperature,
        }
    }

    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

/// Workflow run defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Maximum node invocations per run
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: usize,

    #[serde(default)]
    pub deep_thinking_mode: bool,

    #[serde(default = "default_search_before_planning")]
    pub search_before_planning: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            recursion_limit: default_recursion_limit(),
            deep_thinking_mode: false,
            search_before_planning: default_search_before_planning(),
        }
    }
}

impl WorkflowConfig {
    /// Run options seeded from these defaults
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            deep_thinking_mode: self.deep_thinking_mode,
            search_before_planning: self.search_before_planning,
            ..RunOptions::default()
        }
    }
}

/// Outbound LLM rate limit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u64 {
    4096
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_basic_temperature() -> f32 {
    0.7
}

fn default_reasoning_temperature() -> f32 {
    0.1
}

fn default_recursion_limit() -> usize {
    30
}

fn default_search_before_planning() -> bool {
    true
}

fn default_max_requests() -> u32 {
    60
}

fn default_window_secs() -> u64 {
    60
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Config {
    /// 設定ファイルから環境変数を展開する
    ///
    /// `${VAR_NAME}` 形式の文字列を環境変数の値に置換します。
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::with_capacity(value.len());
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // '{' を消費

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// TOML 設定ファイルから設定を読み込む
    ///
    /// 設定ファイル内の `${VAR_NAME}` は環境変数の値に置換され、
    /// その後に環境変数による上書きが適用されます。
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Parse TOML content, expanding `${VAR}` references
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let expanded_content = Self::expand_env_vars(content);
        let toml: TomlConfig = toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        Ok(Self::from_toml_config(toml))
    }

    /// Load configuration from environment variables over defaults
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// デフォルトパスから設定を読み込む
    ///
    /// `./careerhq.toml` があればそれを使い、なければ環境変数のみ。
    pub fn load() -> Result<Self> {
        Self::load_from(None::<&Path>)
    }

    /// Load from an explicit file, or the default lookup when `None`
    ///
    /// The result is validated.
    pub fn load_from<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let cfg = match path {
            Some(path) => Self::from_toml_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_toml_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::from_env()?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check that the configuration can drive a run
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.trim().is_empty() {
            return Err(Error::Config(
                "LLM API key is not set (LLM_API_KEY or [llm].api_key)".to_string(),
            ));
        }
        if self.workflow.recursion_limit == 0 {
            return Err(Error::Config("recursion_limit must be at least 1".to_string()));
        }
        if self.rate_limit.max_requests == 0 || self.rate_limit.window_secs == 0 {
            return Err(Error::Config(
                "rate_limit.max_requests and rate_limit.window_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn from_toml_config(toml: TomlConfig) -> Self {
        let llm = toml.llm.unwrap_or_default();
        let llm_config = LlmConfig {
            provider: llm
                .provider
                .as_deref()
                .map(LlmProvider::from_name)
                .unwrap_or_default(),
            api_key: llm.api_key.unwrap_or_default(),
            basic_model: llm.basic_model.unwrap_or_else(default_model),
            reasoning_model: llm.reasoning_model.filter(|m| !m.is_empty()),
            base_url: llm.base_url.filter(|u| !u.is_empty()),
            max_tokens: llm.max_tokens.unwrap_or_else(default_max_tokens),
            timeout_secs: llm.timeout_secs.unwrap_or_else(default_timeout_secs),
            basic_temperature: llm
                .basic_temperature
                .unwrap_or_else(default_basic_temperature),
            reasoning_temperature: llm
                .reasoning_temperature
                .unwrap_or_else(default_reasoning_temperature),
        };

        let workflow = toml.workflow.unwrap_or_default();
        let workflow_config = WorkflowConfig {
            recursion_limit: workflow
                .recursion_limit
                .unwrap_or_else(default_recursion_limit),
            deep_thinking_mode: workflow.deep_thinking_mode.unwrap_or(false),
            search_before_planning: workflow
                .search_before_planning
                .unwrap_or_else(default_search_before_planning),
        };

        let rate_limit = toml.rate_limit.unwrap_or_default();
        let rate_limit_config = RateLimitConfig {
            max_requests: rate_limit.max_requests.unwrap_or_else(default_max_requests),
            window_secs: rate_limit.window_secs.unwrap_or_else(default_window_secs),
        };

        Config {
            llm: llm_config,
            workflow: workflow_config,
            rate_limit: rate_limit_config,
        }
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) {
        if let Some(api_key) = non_empty_env("LLM_API_KEY") {
            self.llm.api_key = api_key;
        }
        if let Some(provider) = non_empty_env("LLM_PROVIDER") {
            self.llm.provider = LlmProvider::from_name(&provider);
        }
        if let Some(base_url) = non_empty_env("LLM_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }
        if let Some(model) = non_empty_env("BASIC_MODEL") {
            self.llm.basic_model = model;
        }
        if let Some(model) = non_empty_env("REASONING_MODEL") {
            self.llm.reasoning_model = Some(model);
        }

        if let Some(limit) = non_empty_env("RECURSION_LIMIT").and_then(|v| v.parse().ok()) {
            self.workflow.recursion_limit = limit;
        }

        if let Some(max) = non_empty_env("LLM_RATE_LIMIT").and_then(|v| v.parse().ok()) {
            self.rate_limit.max_requests = max;
        }
        if let Some(secs) = non_empty_env("LLM_RATE_WINDOW_SECS").and_then(|v| v.parse().ok()) {
            self.rate_limit.window_secs = secs;
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

// ============================================================================
// TOML 構造体定義（ファイル解析用）
// ============================================================================

#[derive(Debug, Deserialize, Default)]
struct TomlConfig {
    llm: Option<TomlLlmConfig>,
    workflow: Option<TomlWorkflowConfig>,
    rate_limit: Option<TomlRateLimitConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlLlmConfig {
    /// API プロバイダー ("claude" または "openai")
    provider: Option<String>,
    api_key: Option<String>,
    basic_model: Option<String>,
    reasoning_model: Option<String>,
    base_url: Option<String>,
    max_tokens: Option<u64>,
    timeout_secs: Option<u64>,
    basic_temperature: Option<f32>,
    reasoning_temperature: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlWorkflowConfig {
    recursion_limit: Option<usize>,
    deep_thinking_mode: Option<bool>,
    search_before_planning: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlRateLimitConfig {
    max_requests: Option<u32>,
    window_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.llm.provider, LlmProvider::Claude);
        assert_eq!(config.llm.basic_model, "claude-sonnet-4-20250514");
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.workflow.recursion_limit, 30);
        assert!(!config.workflow.deep_thinking_mode);
        assert!(config.workflow.search_before_planning);
        assert_eq!(config.rate_limit.max_requests, 60);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(60));
    }

    #[test]
    fn test_profile_selection() {
        let mut llm = LlmConfig::default();
        assert_eq!(llm.model_for(ModelProfile::Reasoning), "claude-sonnet-4-20250514");
        assert_eq!(llm.temperature_for(ModelProfile::Basic), 0.7);
        assert_eq!(llm.temperature_for(ModelProfile::Reasoning), 0.1);

        llm.reasoning_model = Some("claude-opus-4-20250514".to_string());
        assert_eq!(llm.model_for(ModelProfile::Reasoning), "claude-opus-4-20250514");
        assert_eq!(llm.model_for(ModelProfile::Basic), "claude-sonnet-4-20250514");
    }

    #[test]
    fn test_provider_from_name() {
        assert_eq!(LlmProvider::from_name("OpenAI"), LlmProvider::OpenAi);
        assert_eq!(LlmProvider::from_name("glm"), LlmProvider::OpenAi);
        assert_eq!(LlmProvider::from_name("claude"), LlmProvider::Claude);
        assert_eq!(LlmProvider::from_name("anything"), LlmProvider::Claude);
        assert_eq!(
            LlmConfig::default().effective_base_url(),
            "https://api.anthropic.com/v1"
        );
    }

    #[test]
    fn test_expand_env_vars() {
        // テスト用環境変数を設定
        unsafe {
            std::env::set_var("CHQ_CONFIG_TEST_VAR", "test_value");
        }

        let result = Config::expand_env_vars("prefix_${CHQ_CONFIG_TEST_VAR}_suffix");
        assert_eq!(result, "prefix_test_value_suffix");

        // 存在しない環境変数
        let result = Config::expand_env_vars("prefix_${CHQ_NONEXISTENT_VAR}_suffix");
        assert_eq!(result, "prefix__suffix");

        assert_eq!(Config::expand_env_vars("no_vars_here"), "no_vars_here");
        assert_eq!(Config::expand_env_vars("${}_content"), "_content");

        unsafe {
            std::env::remove_var("CHQ_CONFIG_TEST_VAR");
        }
    }

    #[test]
    fn test_toml_parsing() {
        let config = Config::from_toml_str(
            r#"
[llm]
provider = "openai"
api_key = "test_key"
basic_model = "gpt-4o-mini"
reasoning_model = "o3-mini"
max_tokens = 2048
basic_temperature = 0.5

[workflow]
recursion_limit = 12
deep_thinking_mode = true
search_before_planning = false

[rate_limit]
max_requests = 10
window_secs = 30
"#,
        )
        .unwrap();

        assert_eq!(config.llm.provider, LlmProvider::OpenAi);
        assert_eq!(config.llm.api_key, "test_key");
        assert_eq!(config.llm.model_for(ModelProfile::Reasoning), "o3-mini");
        assert_eq!(config.llm.max_tokens, 2048);
        assert_eq!(config.llm.basic_temperature, 0.5);
        assert_eq!(config.llm.reasoning_temperature, 0.1);
        assert_eq!(config.workflow.recursion_limit, 12);
        assert!(config.workflow.deep_thinking_mode);
        assert!(!config.workflow.run_options().search_before_planning);
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.rate_limit.window_secs, 30);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.workflow.recursion_limit, 30);
        assert_eq!(config.llm.basic_model, "claude-sonnet-4-20250514");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml_str("[llm\nprovider = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_toml_file_expands_vars() {
        unsafe {
            std::env::set_var("CHQ_CONFIG_FILE_TEST_TOKENS", "1024");
        }
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[llm]\nmax_tokens = ${{CHQ_CONFIG_FILE_TEST_TOKENS}}\ntimeout_secs = 5"
        )
        .unwrap();

        let config = Config::from_toml_file(file.path()).unwrap();
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.llm.timeout_secs, 5);

        unsafe {
            std::env::remove_var("CHQ_CONFIG_FILE_TEST_TOKENS");
        }
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_toml_file("/nonexistent/careerhq.toml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.llm.api_key = "key".to_string();
        assert!(config.validate().is_ok());

        config.workflow.recursion_limit = 0;
        assert!(config.validate().is_err());
    }
}
