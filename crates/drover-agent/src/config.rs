//! YAML agent and task configuration.
//!
//! Agents files map agent names to `{role, goal, backstory}`; tasks files
//! map task names to `{description, expected_output, agent, output_file?}`.
//! `{name}` placeholders are substituted literally in any string value.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use drover_core::{DroverError, GenerateOptions, Llm, RequestContext, Result};

/// Configuration for an agent persona loaded from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

/// A task definition loaded from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskConfig {
    pub description: String,
    #[serde(default)]
    pub expected_output: String,
    #[serde(default)]
    pub agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
}

pub type AgentConfigs = HashMap<String, AgentConfig>;
pub type TaskConfigs = HashMap<String, TaskConfig>;

/// Replace `{name}` placeholders with their values. A string without
/// placeholders comes back unchanged.
pub fn substitute_variables(text: &str, variables: &HashMap<String, String>) -> String {
    let mut out = text.to_string();
    for (key, value) in variables {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

/// Format the system prompt for an agent persona.
pub fn format_system_prompt(config: &AgentConfig, variables: &HashMap<String, String>) -> String {
    format!(
        "# Role\n{}\n\n# Goal\n{}\n\n# Backstory\n{}",
        substitute_variables(&config.role, variables),
        substitute_variables(&config.goal, variables),
        substitute_variables(&config.backstory, variables),
    )
}

/// Validate a configuration file path.
///
/// Rejects empty paths, `..` components, the `/proc`, `/sys` and `/dev`
/// trees, and anything that is not an existing regular file. Returns the
/// absolute path.
fn validate_config_path(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(DroverError::Config("configuration path is empty".into()));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(DroverError::Config(format!(
            "configuration path '{}' contains a parent traversal",
            path.display()
        )));
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| DroverError::Config(format!("cannot resolve working directory: {e}")))?
            .join(path)
    };

    for forbidden in ["/proc", "/sys", "/dev"] {
        if absolute.starts_with(forbidden) {
            return Err(DroverError::Config(format!(
                "configuration path '{}' is under {forbidden}",
                absolute.display()
            )));
        }
    }

    let metadata = std::fs::metadata(&absolute).map_err(|e| {
        DroverError::Config(format!("cannot stat '{}': {e}", absolute.display()))
    })?;
    if !metadata.is_file() {
        return Err(DroverError::Config(format!(
            "configuration path '{}' is not a regular file",
            absolute.display()
        )));
    }

    Ok(absolute)
}

fn load_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let validated = validate_config_path(path)?;
    let data = std::fs::read_to_string(&validated)
        .map_err(|e| DroverError::Config(format!("failed to read '{}': {e}", validated.display())))?;
    serde_yaml::from_str(&data)
        .map_err(|e| DroverError::Config(format!("failed to parse '{}': {e}", validated.display())))
}

/// Load agent configurations from a YAML file.
pub fn load_agent_configs(path: impl AsRef<Path>) -> Result<AgentConfigs> {
    load_yaml(path.as_ref())
}

/// Load task configurations from a YAML file.
pub fn load_task_configs(path: impl AsRef<Path>) -> Result<TaskConfigs> {
    load_yaml(path.as_ref())
}

fn yaml_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(dir)
        .map_err(|e| DroverError::Config(format!("cannot access '{}': {e}", dir.display())))?;
    if !metadata.is_dir() {
        return Err(DroverError::Config(format!(
            "'{}' is not a directory",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .map_err(|e| DroverError::Config(format!("cannot read '{}': {e}", dir.display())))?
    {
        let entry = entry.map_err(|e| DroverError::Config(e.to_string()))?;
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if is_yaml && validate_config_path(&path).is_ok() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Load and merge all agent configurations from a directory of YAML files.
pub fn load_agent_configs_from_dir(dir: impl AsRef<Path>) -> Result<AgentConfigs> {
    let mut merged = AgentConfigs::new();
    for path in yaml_files_in(dir.as_ref())? {
        merged.extend(load_agent_configs(&path)?);
    }
    Ok(merged)
}

/// Load and merge all task configurations from a directory of YAML files.
pub fn load_task_configs_from_dir(dir: impl AsRef<Path>) -> Result<TaskConfigs> {
    let mut merged = TaskConfigs::new();
    for path in yaml_files_in(dir.as_ref())? {
        merged.extend(load_task_configs(&path)?);
    }
    Ok(merged)
}

/// The agent assigned to a task.
pub fn agent_for_task(task_configs: &TaskConfigs, task_name: &str) -> Result<String> {
    task_configs
        .get(task_name)
        .map(|config| config.agent.clone())
        .ok_or_else(|| {
            DroverError::Config(format!("task '{task_name}' not found in configuration"))
        })
}

/// YAML document the auto-configuration prompt asks the model for.
#[derive(Debug, Deserialize)]
struct GeneratedConfigs {
    agent: AgentConfig,
    #[serde(default)]
    tasks: HashMap<String, TaskConfig>,
}

/// Ask the LLM to derive an agent persona and example tasks from a system
/// prompt. The response is expected to be YAML; surrounding prose is
/// tolerated by scanning for the `agent:` anchor.
pub async fn generate_config_from_system_prompt(
    ctx: &RequestContext,
    llm: &dyn Llm,
    system_prompt: &str,
) -> Result<(AgentConfig, Vec<TaskConfig>)> {
    if system_prompt.is_empty() {
        return Err(DroverError::Config("system prompt cannot be empty".into()));
    }

    let prompt = format!(
        r#"Based on the following system prompt that defines an AI agent's role, create YAML configurations for the agent and potential tasks it can perform.

System prompt:
{system_prompt}

I need you to create:
1. An agent configuration with role, goal, and backstory
2. At least 2 task configurations that this agent can perform, with description and expected output

Format your response as valid YAML with the following structure (no prose, just YAML):

agent:
  role: >
    [Agent's role/title]
  goal: >
    [Agent's primary goal]
  backstory: >
    [Agent's backstory]

tasks:
  task1_name:
    description: >
      [Description of the first task]
    expected_output: >
      [Expected output format and content]

  task2_name:
    description: >
      [Description of the second task]
    expected_output: >
      [Expected output format and content]
"#
    );

    let response = llm.generate(ctx, &prompt, &GenerateOptions::new()).await?;
    let configs = parse_generated_configs(&response)?;

    debug!(tasks = configs.tasks.len(), "auto-configuration generated");
    let tasks = configs.tasks.into_values().collect();
    Ok((configs.agent, tasks))
}

fn parse_generated_configs(response: &str) -> Result<GeneratedConfigs> {
    if let Ok(configs) = serde_yaml::from_str::<GeneratedConfigs>(response) {
        return Ok(configs);
    }

    // The model wrapped the YAML in prose or a code fence; recover the
    // block starting at the `agent:` anchor.
    let start = response.find("agent:").ok_or_else(|| {
        DroverError::MalformedResponse("no agent configuration found in the response".into())
    })?;
    let body = &response[start..];
    let end = body.find("```").unwrap_or(body.len());

    serde_yaml::from_str(&body[..end]).map_err(|e| {
        DroverError::MalformedResponse(format!("failed to parse generated configuration: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitution_replaces_placeholders() {
        let out = substitute_variables(
            "analyze {topic} for {client}",
            &vars(&[("topic", "churn"), ("client", "Acme")]),
        );
        assert_eq!(out, "analyze churn for Acme");
    }

    #[test]
    fn substitution_without_placeholders_is_identity() {
        let text = "no placeholders here";
        assert_eq!(substitute_variables(text, &vars(&[("a", "b")])), text);
    }

    #[test]
    fn system_prompt_has_the_three_sections() {
        let config = AgentConfig {
            role: "{seniority} analyst".into(),
            goal: "find insights".into(),
            backstory: "years of experience".into(),
        };
        let prompt = format_system_prompt(&config, &vars(&[("seniority", "senior")]));
        assert!(prompt.starts_with("# Role\nsenior analyst"));
        assert!(prompt.contains("\n\n# Goal\nfind insights"));
        assert!(prompt.contains("\n\n# Backstory\nyears of experience"));
    }

    #[test]
    fn loads_agent_configs_from_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "researcher:\n  role: Researcher\n  goal: Find facts\n  backstory: Curious"
        )
        .unwrap();

        let configs = load_agent_configs(file.path()).unwrap();
        assert_eq!(configs["researcher"].role, "Researcher");
    }

    #[test]
    fn loads_task_configs_from_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "summarize:\n  description: Summarize {{doc}}\n  expected_output: Bullet points\n  agent: researcher\n  output_file: out.md"
        )
        .unwrap();

        let configs = load_task_configs(file.path()).unwrap();
        let task = &configs["summarize"];
        assert_eq!(task.agent, "researcher");
        assert_eq!(task.output_file.as_deref(), Some("out.md"));
        assert_eq!(agent_for_task(&configs, "summarize").unwrap(), "researcher");
        assert!(agent_for_task(&configs, "absent").is_err());
    }

    #[test]
    fn path_policy_rejects_traversal_and_special_trees() {
        assert!(load_agent_configs("").is_err());
        assert!(load_agent_configs("../evil.yaml").is_err());
        assert!(load_agent_configs("/proc/self/environ").is_err());
        assert!(load_agent_configs("/dev/null").is_err());
    }

    #[test]
    fn path_policy_requires_a_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_agent_configs(dir.path()).is_err());
    }

    #[test]
    fn directory_loader_merges_yaml_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.yaml"),
            "first:\n  role: A\n  goal: g\n  backstory: b\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.yml"),
            "second:\n  role: B\n  goal: g\n  backstory: b\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("ignored.txt"), "not yaml").unwrap();

        let configs = load_agent_configs_from_dir(dir.path()).unwrap();
        assert_eq!(configs.len(), 2);
        assert!(configs.contains_key("first"));
        assert!(configs.contains_key("second"));
    }

    #[test]
    fn generated_configs_parse_with_surrounding_prose() {
        let response = r#"Sure, here is the configuration:

agent:
  role: Analyst
  goal: Analyze data
  backstory: Loves numbers

tasks:
  report:
    description: Write a report
    expected_output: A report
```
Trailing commentary."#;

        let configs = parse_generated_configs(response).unwrap();
        assert_eq!(configs.agent.role, "Analyst");
        assert_eq!(configs.tasks.len(), 1);
    }

    #[test]
    fn generated_configs_without_an_anchor_fail() {
        let err = parse_generated_configs("I cannot help with that.").unwrap_err();
        assert_eq!(err.kind(), "MALFORMED_RESPONSE");
    }
}
