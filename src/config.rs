use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tokio::fs;

use crate::error::ConfigError;
use crate::task::Category;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

const AGENTS_FILE: &str = "agents.yaml";
const SERVICE_FILE: &str = "service.yaml";
const TASKS_FILE: &str = "tasks.yaml";

/// Everything the process needs to run a workflow: role definitions, service
/// endpoint settings, and the credential. Loading fails fast on any missing
/// document or credential; no task processing happens after a failure here.
#[derive(Debug, Clone)]
pub struct CrewConfig {
    pub agents: AgentsConfig,
    pub service: ServiceConfig,
    pub api_key: String,
    config_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentsConfig {
    pub software_architect: ArchitectProfile,
    pub developer_agent: DeveloperProfile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchitectProfile {
    pub role_name: String,
    pub goal: String,
    #[serde(default)]
    pub primary_responsibilities: Vec<String>,
    pub core_competencies: ArchitectCompetencies,
    #[serde(default)]
    pub authority_levels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchitectCompetencies {
    #[serde(default)]
    pub design_patterns: Vec<String>,
    #[serde(default)]
    pub technical_skills: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeveloperProfile {
    pub role_name: String,
    pub goal: String,
    #[serde(default)]
    pub coding_practices: Vec<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub system_knowledge: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub models: RoleBound<String>,
    pub parameters: RoleBound<GenerationParams>,
    #[serde(default)]
    pub retry: RetryPolicy,
}

/// One value per role category.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleBound<T> {
    pub architect: T,
    pub developer: T,
}

impl<T> RoleBound<T> {
    pub fn for_category(&self, category: Category) -> &T {
        match category {
            Category::Architect => &self.architect,
            Category::Developer => &self.developer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following `attempts` prior failures.
    pub fn backoff(&self, attempts: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempts.min(16));
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

#[derive(Debug, Deserialize)]
struct AgentsDocument {
    agents: AgentsConfig,
}

#[derive(Debug, Deserialize)]
struct ServiceDocument {
    service: ServiceConfig,
}

impl CrewConfig {
    /// Load all configuration documents under `config_dir` and the service
    /// credential from the environment.
    pub async fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let agents: AgentsDocument = read_yaml(&config_dir.join(AGENTS_FILE)).await?;
        let service: ServiceDocument = read_yaml(&config_dir.join(SERVICE_FILE)).await?;

        let api_key = std::env::var(API_KEY_VAR)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey { var: API_KEY_VAR })?;

        let mut config = Self {
            agents: agents.agents,
            service: service.service,
            api_key,
            config_dir: config_dir.to_path_buf(),
        };
        config.merge_env_vars();
        Ok(config)
    }

    /// Environment overrides win over the document values.
    fn merge_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            if !base_url.is_empty() {
                self.service.base_url = base_url;
            }
        }
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.config_dir.join(TASKS_FILE)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }

    /// Non-fatal configuration issues, surfaced by the `check` subcommand.
    pub fn lint(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self
            .agents
            .software_architect
            .core_competencies
            .design_patterns
            .is_empty()
        {
            issues.push("architect has no design patterns configured".to_string());
        }
        if self.agents.developer_agent.coding_practices.is_empty() {
            issues.push("developer has no coding practices configured".to_string());
        }
        if self.service.retry.max_attempts == 0 {
            issues.push("retry.max_attempts is 0; every service fault is terminal".to_string());
        }
        if !self.tasks_path().exists() {
            issues.push(format!("task document {:?} not found", self.tasks_path()));
        }
        issues
    }
}

async fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = match fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::MissingFile {
                path: path.to_path_buf(),
            });
        }
        Err(err) => return Err(ConfigError::io(path, err)),
    };
    serde_yaml::from_str(&contents).map_err(|err| ConfigError::parse(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const AGENTS_YAML: &str = r#"
agents:
  software_architect:
    role_name: Software Architect
    goal: Produce sound designs
    primary_responsibilities:
      - system design
    core_competencies:
      design_patterns:
        - Observer
        - Factory
      technical_skills:
        - distributed systems
    authority_levels:
      - final design approval
  developer_agent:
    role_name: Developer
    goal: Ship working code
    coding_practices:
      - unit testing
    required_skills:
      - rust
    system_knowledge:
      - build pipeline
"#;

    const SERVICE_YAML: &str = r#"
service:
  timeout_secs: 30
  models:
    architect: gpt-4
    developer: gpt-4o-mini
  parameters:
    architect:
      temperature: 0.2
      max_tokens: 1500
    developer:
      temperature: 0.1
      max_tokens: 2000
  retry:
    max_attempts: 2
    base_delay_ms: 10
"#;

    #[test]
    fn parses_role_profiles_and_service_settings() {
        let agents: AgentsDocument = serde_yaml::from_str(AGENTS_YAML).unwrap();
        assert_eq!(agents.agents.software_architect.role_name, "Software Architect");
        assert_eq!(
            agents.agents.software_architect.core_competencies.design_patterns,
            vec!["Observer", "Factory"]
        );

        let service: ServiceDocument = serde_yaml::from_str(SERVICE_YAML).unwrap();
        assert_eq!(service.service.base_url, default_base_url());
        assert_eq!(service.service.models.for_category(Category::Developer), "gpt-4o-mini");
        assert_eq!(service.service.retry.max_attempts, 2);
    }

    #[test]
    fn backoff_grows_exponentially() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 100,
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn missing_document_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let err = CrewConfig::load(temp.path()).await.unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }
}
