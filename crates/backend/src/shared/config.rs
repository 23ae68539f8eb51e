use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Лимит тела запроса; выгрузки источников приходят в JSON целиком
    #[serde(default = "default_max_body_mb")]
    pub max_body_mb: usize,
}

impl ServerConfig {
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_mb: default_max_body_mb(),
        }
    }
}

/// What to do when the dealer workbook has zero or several sheets for a role
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AmbiguityPolicy {
    Fail,
    Warn,
}

/// Run-level knobs, passed explicitly into the executor
#[derive(Debug, Deserialize, Clone)]
pub struct PipelineSettings {
    /// Worker-pool size for per-source normalization
    #[serde(default = "default_max_parallel_sources")]
    pub max_parallel_sources: usize,
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub normalize_tier_by_entity_count: bool,
    #[serde(default = "default_ambiguity_policy")]
    pub ambiguity_policy: AmbiguityPolicy,
    #[serde(default = "default_unknown_tier_label")]
    pub unknown_tier_label: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_parallel_sources: default_max_parallel_sources(),
            run_timeout_secs: default_run_timeout_secs(),
            normalize_tier_by_entity_count: true,
            ambiguity_policy: default_ambiguity_policy(),
            unknown_tier_label: default_unknown_tier_label(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_max_body_mb() -> usize {
    64
}

fn default_max_parallel_sources() -> usize {
    4
}

fn default_run_timeout_secs() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_ambiguity_policy() -> AmbiguityPolicy {
    AmbiguityPolicy::Warn
}

fn default_unknown_tier_label() -> String {
    "未知".to_string()
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[server]
bind = "0.0.0.0:3000"
max_body_mb = 64

[pipeline]
max_parallel_sources = 4
run_timeout_secs = 120
normalize_tier_by_entity_count = true
ambiguity_policy = "warn"
unknown_tier_label = "未知"
"#;

/// Load configuration from config.toml file
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. Current working directory
/// 3. Falls back to embedded default config
pub fn load_config() -> anyhow::Result<Config> {
    for config_path in candidate_paths() {
        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            let contents = std::fs::read_to_string(&config_path)?;
            return parse_config(&contents);
        }
    }

    tracing::info!("Using default embedded configuration");
    parse_config(DEFAULT_CONFIG)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(contents)?;
    if config.server.max_body_mb == 0 {
        anyhow::bail!("server.max_body_mb must be at least 1");
    }
    if config.pipeline.max_parallel_sources == 0 {
        anyhow::bail!("pipeline.max_parallel_sources must be at least 1");
    }
    Ok(config)
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            paths.push(exe_dir.join("config.toml"));
        }
    }
    paths.push(PathBuf::from("config.toml"));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:3000");
        assert_eq!(config.server.max_body_bytes(), 64 * 1024 * 1024);
        assert_eq!(config.pipeline.max_parallel_sources, 4);
        assert!(config.pipeline.normalize_tier_by_entity_count);
        assert_eq!(config.pipeline.ambiguity_policy, AmbiguityPolicy::Warn);
        assert_eq!(config.pipeline.unknown_tier_label, "未知");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = parse_config("[pipeline]\nambiguity_policy = \"fail\"\n").unwrap();
        assert_eq!(config.pipeline.ambiguity_policy, AmbiguityPolicy::Fail);
        assert_eq!(config.pipeline.run_timeout_secs, 120);
        assert_eq!(config.server.bind, "0.0.0.0:3000");
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(parse_config("[pipeline]\nmax_parallel_sources = 0\n").is_err());
        assert!(parse_config("[server]\nmax_body_mb = 0\n").is_err());
    }
}
