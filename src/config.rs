//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CONDUCTOR__*` 覆盖（双下划线表示嵌套，如 `CONDUCTOR__LLM__PROVIDER=mock`）。

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub orchestrator: OrchestratorSection,
}

/// [app] 段：服务名与 HTTP 监听地址
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppSection {
    #[serde(default = "default_app_name")]
    pub name: String,
    /// conductor-web 监听地址
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_app_name() -> String {
    "conductor".to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            bind_addr: default_bind_addr(),
        }
    }
}

/// [llm] 段：后端选择（openai 兼容 / mock）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmSection {
    /// openai / mock；未设置 API Key 时一律退回 mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    /// 读取 API Key 的环境变量名
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    1000
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// [orchestrator] 段：步数与消解上限、证据条数、超时
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorSection {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_max_consecutive_resolutions")]
    pub max_consecutive_resolutions: u32,
    #[serde(default = "default_evidence_top_k")]
    pub evidence_top_k: usize,
    #[serde(default = "default_worker_timeout_secs")]
    pub worker_timeout_secs: u64,
    #[serde(default = "default_planner_timeout_secs")]
    pub planner_timeout_secs: u64,
    /// 传给 Worker 的最近上下文条数
    #[serde(default = "default_recent_context_entries")]
    pub recent_context_entries: usize,
}

fn default_max_steps() -> usize {
    25
}

fn default_max_consecutive_resolutions() -> u32 {
    3
}

fn default_evidence_top_k() -> usize {
    3
}

fn default_worker_timeout_secs() -> u64 {
    120
}

fn default_planner_timeout_secs() -> u64 {
    60
}

fn default_recent_context_entries() -> usize {
    2
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_consecutive_resolutions: default_max_consecutive_resolutions(),
            evidence_top_k: default_evidence_top_k(),
            worker_timeout_secs: default_worker_timeout_secs(),
            planner_timeout_secs: default_planner_timeout_secs(),
            recent_context_entries: default_recent_context_entries(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 CONDUCTOR__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 则追加该文件（必须存在，可覆盖前面的键）
/// 3. 最后叠加环境变量 CONDUCTOR__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CONDUCTOR")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.app.bind_addr, "127.0.0.1:8080");
        assert_eq!(cfg.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(cfg.orchestrator.max_steps, 25);
        assert_eq!(cfg.orchestrator.max_consecutive_resolutions, 3);
        assert_eq!(cfg.orchestrator.evidence_top_k, 3);
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[llm]\nprovider = \"mock\"\n\n[orchestrator]\nmax_steps = 7\nevidence_top_k = 5"
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.orchestrator.max_steps, 7);
        assert_eq!(cfg.orchestrator.evidence_top_k, 5);
        // 未出现的键保持默认
        assert_eq!(cfg.orchestrator.planner_timeout_secs, 60);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(dir.path().join("absent.toml"))).is_err());
    }
}
