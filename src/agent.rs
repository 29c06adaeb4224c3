use crate::task::Task;
use crate::task::TaskStatus;

/// Shared lifecycle state for a role agent: exclusive ownership of at most
/// one in-flight task plus the append-only list of tasks it finished.
/// Role-specific behavior (guidance, review, implementation) lives in the
/// strategy types in [`crate::roles`]; competency context lives in the role
/// profiles they carry.
///
/// Precondition violations here are reported as `false` / `None` returns and
/// a warning, never as errors; the caller decides how to proceed.
#[derive(Debug)]
pub struct Agent {
    role_name: String,
    goal: String,
    current_task: Option<String>,
    completed_tasks: Vec<Task>,
}

impl Agent {
    pub fn new(role_name: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            role_name: role_name.into(),
            goal: goal.into(),
            current_task: None,
            completed_tasks: Vec::new(),
        }
    }

    pub fn role_name(&self) -> &str {
        &self.role_name
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Id of the task currently held, if any.
    pub fn current_task(&self) -> Option<&str> {
        self.current_task.as_deref()
    }

    pub fn completed_tasks(&self) -> &[Task] {
        &self.completed_tasks
    }

    /// Readiness check: true iff the task has no dependencies or every
    /// dependency id is present in `completed`. Pure.
    pub fn can_start(&self, task: &Task, completed: &[Task]) -> bool {
        task.dependencies
            .iter()
            .all(|dep| completed.iter().any(|done| &done.task_id == dep))
    }

    /// Take exclusive ownership of `task` and move it to InProgress.
    /// Fails if this agent already holds a task or `task` is not Todo.
    pub fn assign(&mut self, task: &mut Task) -> bool {
        if let Some(held) = &self.current_task {
            tracing::warn!(
                role = %self.role_name,
                held = %held,
                task_id = %task.task_id,
                "agent already has an active task"
            );
            return false;
        }
        if task.status != TaskStatus::Todo {
            tracing::warn!(
                role = %self.role_name,
                task_id = %task.task_id,
                status = %task.status,
                "task is not assignable"
            );
            return false;
        }
        if !task.set_status(TaskStatus::InProgress) {
            return false;
        }
        task.assigned_to = Some(self.role_name.clone());
        self.current_task = Some(task.task_id.clone());
        tracing::info!(role = %self.role_name, task_id = %task.task_id, "task assigned");
        true
    }

    /// Move the held task to Done, record a snapshot, and release it.
    /// Returns the snapshot, or None if no task is held or `task` is not the
    /// held one.
    pub fn complete(&mut self, task: &mut Task) -> Option<Task> {
        match &self.current_task {
            None => {
                tracing::warn!(role = %self.role_name, "agent has no active task");
                return None;
            }
            Some(held) if held != &task.task_id => {
                tracing::warn!(
                    role = %self.role_name,
                    held = %held,
                    task_id = %task.task_id,
                    "task is not held by this agent"
                );
                return None;
            }
            Some(_) => {}
        }
        if !task.set_status(TaskStatus::Done) {
            return None;
        }
        let snapshot = task.clone();
        self.completed_tasks.push(snapshot.clone());
        self.current_task = None;
        tracing::info!(role = %self.role_name, task_id = %task.task_id, "task completed");
        Some(snapshot)
    }

    /// Drop ownership without completing; rejection and error-reset path.
    pub fn release(&mut self) {
        self.current_task = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Category;
    use pretty_assertions::assert_eq;

    fn agent() -> Agent {
        Agent::new("Developer", "Ship working code")
    }

    fn task(id: &str) -> Task {
        Task::new(id, "name", "description", Category::Developer)
    }

    #[test]
    fn empty_dependency_set_is_always_ready() {
        let done = vec![task("X-1")];
        assert!(agent().can_start(&task("DEV-1"), &[]));
        assert!(agent().can_start(&task("DEV-1"), &done));
    }

    #[test]
    fn ready_iff_every_dependency_is_completed() {
        let candidate = task("DEV-2").with_dependencies(["ARCH-1", "DEV-1"]);
        let partial = vec![task("ARCH-1")];
        let full = vec![task("ARCH-1"), task("DEV-1")];
        assert!(!agent().can_start(&candidate, &[]));
        assert!(!agent().can_start(&candidate, &partial));
        assert!(agent().can_start(&candidate, &full));
    }

    #[test]
    fn assign_sets_status_and_assignee() {
        let mut agent = agent();
        let mut t = task("DEV-1");
        assert!(agent.assign(&mut t));
        assert_eq!(t.status, TaskStatus::InProgress);
        assert_eq!(t.assigned_to.as_deref(), Some("Developer"));
        assert_eq!(agent.current_task(), Some("DEV-1"));
    }

    #[test]
    fn assign_fails_while_busy() {
        let mut agent = agent();
        let mut first = task("DEV-1");
        let mut second = task("DEV-2");
        assert!(agent.assign(&mut first));
        assert!(!agent.assign(&mut second));
        assert_eq!(second.status, TaskStatus::Todo);
        assert_eq!(second.assigned_to, None);
    }

    #[test]
    fn assign_fails_for_non_todo_task() {
        let mut agent = agent();
        let mut t = task("DEV-1");
        t.set_status(TaskStatus::InProgress);
        assert!(!agent.assign(&mut t));
        assert_eq!(agent.current_task(), None);
    }

    #[test]
    fn complete_returns_none_when_idle() {
        let mut t = task("DEV-1");
        assert!(agent().complete(&mut t).is_none());
    }

    #[test]
    fn complete_records_snapshot_once_and_releases() {
        let mut agent = agent();
        let mut t = task("DEV-1");
        agent.assign(&mut t);
        t.set_status(TaskStatus::Review);
        let snapshot = agent.complete(&mut t).expect("completion");
        assert_eq!(snapshot.status, TaskStatus::Done);
        assert_eq!(agent.completed_tasks().len(), 1);
        assert_eq!(agent.completed_tasks()[0].task_id, "DEV-1");
        assert_eq!(agent.current_task(), None);
    }

    #[test]
    fn complete_refuses_a_task_it_does_not_hold() {
        let mut agent = agent();
        let mut held = task("DEV-1");
        let mut other = task("DEV-2");
        agent.assign(&mut held);
        other.set_status(TaskStatus::InProgress);
        assert!(agent.complete(&mut other).is_none());
        assert_eq!(agent.current_task(), Some("DEV-1"));
    }

    #[test]
    fn release_frees_the_agent_for_reassignment() {
        let mut agent = agent();
        let mut t = task("DEV-1");
        agent.assign(&mut t);
        agent.release();
        assert_eq!(agent.current_task(), None);
        let mut next = task("DEV-2");
        assert!(agent.assign(&mut next));
    }
}
