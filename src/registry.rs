use std::collections::HashMap;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::task::Category;
use crate::task::Task;
use crate::task::TaskStatus;

/// Raw task entry as it appears in the task document.
#[derive(Debug, Deserialize)]
struct RawTask {
    task_id: String,
    name: String,
    description: String,
    #[serde(default)]
    deliverables: Vec<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    tasks: serde_yaml::Mapping,
}

/// Holds the full task set in document order. Tasks are mutated in place via
/// `get_mut`; the registry itself has no other mutation API.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
}

impl TaskRegistry {
    /// Load the task document at `path`, validating the dependency graph.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::MissingFile {
                    path: path.to_path_buf(),
                });
            }
            Err(err) => return Err(ConfigError::io(path, err)),
        };
        Self::from_document(&contents, path)
    }

    fn from_document(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: RawDocument =
            serde_yaml::from_str(contents).map_err(|err| ConfigError::parse(path, err))?;

        let mut tasks = Vec::new();
        // Phases and role groups keep their document order; serde_yaml
        // mappings preserve insertion order.
        for (_phase, groups) in raw.tasks {
            let groups = match groups {
                serde_yaml::Value::Mapping(groups) => groups,
                _ => continue,
            };
            for (role, entries) in groups {
                let role = role.as_str().unwrap_or_default().to_string();
                let category = category_for_role(&role)?;
                let entries: Vec<RawTask> = serde_yaml::from_value(entries)
                    .map_err(|err| ConfigError::parse(path, err))?;
                for entry in entries {
                    tasks.push(build_task(entry, category)?);
                }
            }
        }

        let registry = Self { tasks };
        registry.validate()?;
        Ok(registry)
    }

    /// Construct a registry directly from tasks (test and embedding entry
    /// point); runs the same graph validation as document loading.
    pub fn from_tasks(tasks: Vec<Task>) -> Result<Self, ConfigError> {
        let registry = Self { tasks };
        registry.validate()?;
        Ok(registry)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !seen.insert(task.task_id.as_str()) {
                return Err(ConfigError::DuplicateTask {
                    task_id: task.task_id.clone(),
                });
            }
        }

        for task in &self.tasks {
            for dep in &task.dependencies {
                if !seen.contains(dep.as_str()) {
                    // A dangling reference keeps its task un-ready forever;
                    // the run still proceeds and the report shows the gap.
                    tracing::warn!(
                        task_id = %task.task_id,
                        dependency = %dep,
                        "dependency does not match any registered task"
                    );
                }
            }
        }

        self.check_acyclic()
    }

    /// Fail fast on dependency cycles so the scheduler cannot livelock on a
    /// graph that can never drain. Edges to unknown ids are ignored here.
    fn check_acyclic(&self) -> Result<(), ConfigError> {
        let index: HashMap<&str, &Task> = self
            .tasks
            .iter()
            .map(|task| (task.task_id.as_str(), task))
            .collect();

        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();
        for task in &self.tasks {
            if marks.contains_key(task.task_id.as_str()) {
                continue;
            }
            // Iterative DFS; (id, next dependency index) frames.
            let mut stack = vec![(task.task_id.as_str(), 0usize)];
            marks.insert(task.task_id.as_str(), Mark::Visiting);
            while let Some((id, dep_idx)) = stack.pop() {
                let deps = &index[id].dependencies;
                if dep_idx >= deps.len() {
                    marks.insert(id, Mark::Done);
                    continue;
                }
                stack.push((id, dep_idx + 1));
                let dep = deps[dep_idx].as_str();
                if !index.contains_key(dep) {
                    continue;
                }
                match marks.get(dep) {
                    Some(Mark::Visiting) => {
                        return Err(ConfigError::DependencyCycle {
                            task_id: dep.to_string(),
                        });
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(dep, Mark::Visiting);
                        stack.push((dep, 0));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Task> {
        self.tasks.get_mut(index)
    }

    pub fn first_created_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.tasks.first().map(|task| task.created_at)
    }
}

fn category_for_role(role: &str) -> Result<Category, ConfigError> {
    match role {
        "architect" | "software_architect" => Ok(Category::Architect),
        "developer" | "developer_agent" => Ok(Category::Developer),
        other => Err(ConfigError::UnknownRole {
            role: other.to_string(),
        }),
    }
}

fn build_task(raw: RawTask, category: Category) -> Result<Task, ConfigError> {
    let status = match raw.status.as_deref() {
        None => TaskStatus::Todo,
        Some(value) => TaskStatus::parse(value).ok_or_else(|| ConfigError::UnknownStatus {
            task_id: raw.task_id.clone(),
            value: value.to_string(),
        })?,
    };
    let mut task = Task::new(raw.task_id, raw.name, raw.description, category)
        .with_deliverables(raw.deliverables)
        .with_dependencies(raw.dependencies);
    task.status = status;
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    const DOCUMENT: &str = r#"
tasks:
  phase_1:
    architect:
      - task_id: ARCH-1
        name: System design
        description: Produce the high level design
        deliverables:
          - design document
        dependencies: []
        status: "To Do"
    developer:
      - task_id: DEV-1
        name: Core implementation
        description: Implement the core modules
        deliverables:
          - source code
        dependencies:
          - ARCH-1
"#;

    fn load(doc: &str) -> Result<TaskRegistry, ConfigError> {
        TaskRegistry::from_document(doc, &PathBuf::from("tasks.yaml"))
    }

    #[test]
    fn loads_tasks_in_document_order_with_categories() {
        let registry = load(DOCUMENT).unwrap();
        let ids: Vec<&str> = registry.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, vec!["ARCH-1", "DEV-1"]);
        assert_eq!(registry.get(0).unwrap().category, Category::Architect);
        assert_eq!(registry.get(1).unwrap().category, Category::Developer);
        assert_eq!(registry.get(1).unwrap().dependencies, vec!["ARCH-1"]);
        assert_eq!(registry.get(0).unwrap().status, TaskStatus::Todo);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let doc = r#"
tasks:
  phase_1:
    architect:
      - { task_id: ARCH-1, name: a, description: d }
      - { task_id: ARCH-1, name: b, description: d }
"#;
        match load(doc) {
            Err(ConfigError::DuplicateTask { task_id }) => assert_eq!(task_id, "ARCH-1"),
            other => panic!("expected duplicate task error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_dependency_cycles() {
        let doc = r#"
tasks:
  phase_1:
    architect:
      - { task_id: ARCH-1, name: a, description: d, dependencies: [ARCH-2] }
      - { task_id: ARCH-2, name: b, description: d, dependencies: [ARCH-1] }
"#;
        assert!(matches!(
            load(doc),
            Err(ConfigError::DependencyCycle { .. })
        ));
    }

    #[test]
    fn dangling_dependencies_load_with_a_warning() {
        let doc = r#"
tasks:
  phase_1:
    developer:
      - { task_id: DEV-1, name: a, description: d, dependencies: [ARCH-9] }
"#;
        let registry = load(doc).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn rejects_unknown_role_groups() {
        let doc = r#"
tasks:
  phase_1:
    tester:
      - { task_id: QA-1, name: a, description: d }
"#;
        assert!(matches!(load(doc), Err(ConfigError::UnknownRole { .. })));
    }

    #[test]
    fn rejects_unknown_status_strings() {
        let doc = r#"
tasks:
  phase_1:
    architect:
      - { task_id: ARCH-1, name: a, description: d, status: "Blocked" }
"#;
        assert!(matches!(
            load(doc),
            Err(ConfigError::UnknownStatus { .. })
        ));
    }

    #[test]
    fn missing_file_is_distinguishable() {
        let temp = tempfile::tempdir().unwrap();
        let err = TaskRegistry::load(&temp.path().join("tasks.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }
}
