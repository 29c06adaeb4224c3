use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use crate::config::RetryPolicy;
use crate::error::ServiceError;
use crate::registry::TaskRegistry;
use crate::roles::Architect;
use crate::roles::Developer;
use crate::service::CompletionService;
use crate::task::Category;
use crate::task::Task;
use crate::task::TaskStatus;

/// Outcome of driving a single task through its lifecycle.
#[derive(Debug, PartialEq, Eq)]
enum DispatchOutcome {
    Completed,
    /// Review rejection or a precondition refusal; the task went back to
    /// Todo without consuming a retry attempt.
    Returned,
}

/// Counts reported by a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub completed: usize,
    pub failed: usize,
    pub remaining: usize,
}

/// The scheduling loop: selects the next ready task in registry order,
/// dispatches it to the owning role agent, sequences the per-task state
/// machine, and retries service faults up to the configured attempt budget.
///
/// Exactly one task is in flight at any time; the only suspension points are
/// the generation-service calls and the backoff sleeps.
pub struct Orchestrator<S: CompletionService> {
    registry: TaskRegistry,
    architect: Architect,
    developer: Developer,
    service: S,
    retry: RetryPolicy,
    completed: Vec<Task>,
    attempts: HashMap<String, u32>,
}

impl<S: CompletionService> Orchestrator<S> {
    pub fn new(
        registry: TaskRegistry,
        architect: Architect,
        developer: Developer,
        service: S,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            registry,
            architect,
            developer,
            service,
            retry,
            completed: Vec::new(),
            attempts: HashMap::new(),
        }
    }

    /// Append-only ledger of completed tasks, in completion order.
    pub fn completed(&self) -> &[Task] {
        &self.completed
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Index of the first Todo task (registry order) whose owning agent is
    /// ready to start it. `None` means no task is currently selectable —
    /// which may be a drained workflow or one blocked on unmet dependencies.
    fn next_ready(&self) -> Option<usize> {
        self.registry.iter().position(|task| {
            if task.status != TaskStatus::Todo {
                return false;
            }
            let agent = match task.category {
                Category::Architect => &self.architect.agent,
                Category::Developer => &self.developer.agent,
            };
            agent.can_start(task, &self.completed)
        })
    }

    /// Drive the workflow until no ready task remains or `cancel` fires.
    pub async fn run(&mut self, cancel: &CancellationToken) -> RunStats {
        while !cancel.is_cancelled() {
            let Some(index) = self.next_ready() else {
                break;
            };
            let (task_id, category) = {
                let task = self.registry.get(index).expect("selected index is valid");
                (task.task_id.clone(), task.category)
            };
            tracing::info!(%task_id, %category, "task selected");

            let result = match category {
                Category::Architect => self.run_architect_task(index).await,
                Category::Developer => self.run_developer_task(index).await,
            };

            match result {
                Ok(DispatchOutcome::Completed) => {
                    tracing::info!(%task_id, "task done");
                }
                Ok(DispatchOutcome::Returned) => {
                    tracing::info!(%task_id, "task returned to the backlog");
                }
                Err(err) => {
                    tracing::warn!(%task_id, error = %err, "task dispatch failed");
                    self.handle_failure(index, cancel).await;
                }
            }
        }

        let stats = self.stats();
        tracing::info!(
            completed = stats.completed,
            failed = stats.failed,
            remaining = stats.remaining,
            "workflow loop finished"
        );
        stats
    }

    fn stats(&self) -> RunStats {
        let failed = self
            .registry
            .iter()
            .filter(|task| task.status == TaskStatus::Failed)
            .count();
        RunStats {
            completed: self.completed.len(),
            failed,
            remaining: self.registry.len() - self.completed.len() - failed,
        }
    }

    /// Architect lifecycle: assign, guidance, complete. No review step.
    async fn run_architect_task(
        &mut self,
        index: usize,
    ) -> Result<DispatchOutcome, ServiceError> {
        let Self {
            registry,
            architect,
            service,
            completed,
            ..
        } = self;
        let task = registry.get_mut(index).expect("selected index is valid");

        if !architect.agent.assign(task) {
            return Ok(DispatchOutcome::Returned);
        }
        let guidance = architect.provide_guidance(&*service, task).await?;
        tracing::debug!(
            task_id = %task.task_id,
            patterns = ?guidance.matched_patterns,
            "guidance produced"
        );
        if let Some(snapshot) = architect.agent.complete(task) {
            completed.push(snapshot);
            Ok(DispatchOutcome::Completed)
        } else {
            Ok(DispatchOutcome::Returned)
        }
    }

    /// Developer lifecycle: assign, cross-agent guidance from the architect,
    /// implementation, architect review. The architect serves guidance and
    /// review regardless of its own current task; exclusivity only covers
    /// assignment.
    async fn run_developer_task(
        &mut self,
        index: usize,
    ) -> Result<DispatchOutcome, ServiceError> {
        let Self {
            registry,
            architect,
            developer,
            service,
            completed,
            ..
        } = self;
        let task = registry.get_mut(index).expect("selected index is valid");

        if !developer.agent.assign(task) {
            return Ok(DispatchOutcome::Returned);
        }

        let guidance = architect.provide_guidance(&*service, task).await?;
        if !developer.implement_task(&*service, task, &guidance).await? {
            reset_task(task);
            developer.agent.release();
            return Ok(DispatchOutcome::Returned);
        }

        match architect.review_implementation(&*service, task).await? {
            Some(verdict) if verdict.approved => {
                if let Some(snapshot) = developer.agent.complete(task) {
                    completed.push(snapshot);
                    Ok(DispatchOutcome::Completed)
                } else {
                    Ok(DispatchOutcome::Returned)
                }
            }
            _ => {
                // Rejected, or the task was not in Review. Back to the
                // backlog; a rejection is a judgment, not a fault, so no
                // attempt is consumed.
                tracing::warn!(task_id = %task.task_id, "task failed architect review");
                reset_task(task);
                developer.agent.release();
                Ok(DispatchOutcome::Returned)
            }
        }
    }

    /// Service-fault path: release the owning agent, reset the task to Todo,
    /// and either back off before the next attempt or mark the task Failed
    /// once the budget is spent.
    async fn handle_failure(&mut self, index: usize, cancel: &CancellationToken) {
        let task = self.registry.get_mut(index).expect("selected index is valid");
        match task.category {
            Category::Architect => self.architect.agent.release(),
            Category::Developer => self.developer.agent.release(),
        }
        reset_task(task);

        let attempts = self.attempts.entry(task.task_id.clone()).or_insert(0);
        *attempts += 1;
        if *attempts >= self.retry.max_attempts {
            tracing::error!(
                task_id = %task.task_id,
                attempts = *attempts,
                "attempt budget exhausted; marking task failed"
            );
            task.set_status(TaskStatus::Failed);
            return;
        }

        let delay = self.retry.backoff(*attempts - 1);
        tracing::info!(
            task_id = %task.task_id,
            attempt = *attempts,
            max_attempts = self.retry.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "retrying after backoff"
        );
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Put a task back on the backlog: status Todo, assignee cleared.
fn reset_task(task: &mut Task) {
    if task.status != TaskStatus::Todo {
        task.set_status(TaskStatus::Todo);
    }
    task.assigned_to = None;
}
