use std::path::Path;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::registry::TaskRegistry;
use crate::task::Category;
use crate::task::Task;
use crate::task::TaskStatus;

/// Summary of a finished workflow run, built from the completed ledger and
/// the final registry state.
#[derive(Debug, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub architect_tasks: usize,
    pub developer_tasks: usize,
    /// Last completion timestamp minus the first task's creation timestamp;
    /// absent when nothing completed.
    pub execution_secs: Option<i64>,
    pub task_details: Vec<TaskDetail>,
}

#[derive(Debug, Serialize)]
pub struct TaskDetail {
    pub task_id: String,
    pub name: String,
    pub status: String,
    pub assigned_to: Option<String>,
    pub duration_secs: i64,
}

impl Report {
    pub fn build(registry: &TaskRegistry, completed: &[Task]) -> Self {
        let count_category = |category: Category| {
            completed
                .iter()
                .filter(|task| task.category == category)
                .count()
        };

        let execution_secs = match (registry.first_created_at(), completed.last()) {
            (Some(started), Some(last)) => {
                Some((last.updated_at - started).num_seconds().max(0))
            }
            _ => None,
        };

        let task_details = completed
            .iter()
            .map(|task| TaskDetail {
                task_id: task.task_id.clone(),
                name: task.name.clone(),
                status: task.status.to_string(),
                assigned_to: task.assigned_to.clone(),
                duration_secs: task.duration_secs(),
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            total_tasks: registry.len(),
            completed_tasks: completed.len(),
            failed_tasks: registry
                .iter()
                .filter(|task| task.status == TaskStatus::Failed)
                .count(),
            architect_tasks: count_category(Category::Architect),
            developer_tasks: count_category(Category::Developer),
            execution_secs,
            task_details,
        }
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Write the report to `dir` under a timestamped name and return the
    /// path.
    pub async fn write_to_dir(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let yaml = self
            .to_yaml()
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        tokio::fs::create_dir_all(dir).await?;
        let file_name = format!(
            "project_report_{}.yaml",
            self.generated_at.format("%Y%m%d_%H%M%S")
        );
        let path = dir.join(file_name);
        tokio::fs::write(&path, yaml).await?;
        Ok(path)
    }
}
