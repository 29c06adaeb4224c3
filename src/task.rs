use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Lifecycle states of a task. `Failed` is terminal: it is entered when the
/// retry budget is exhausted and never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "To Do")]
    Todo,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Review")]
    Review,
    #[serde(rename = "Done")]
    Done,
    #[serde(rename = "Failed")]
    Failed,
}

impl TaskStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "To Do" | "Todo" => Some(Self::Todo),
            "In Progress" => Some(Self::InProgress),
            "Review" => Some(Self::Review),
            "Done" => Some(Self::Done),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether `self -> to` is a legal lifecycle transition.
    ///
    /// `InProgress -> Todo` and `Review -> Todo` are the retry/rejection
    /// resets; any non-terminal state may transition to `Failed` when the
    /// attempt budget runs out.
    pub fn can_transition(self, to: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, to),
            (Todo, InProgress)
                | (InProgress, Review)
                | (Review, Done)
                // Architect tasks carry no review step and complete
                // straight from InProgress.
                | (InProgress, Done)
                | (Review, Todo)
                | (InProgress, Todo)
                | (Todo, Failed)
                | (InProgress, Failed)
                | (Review, Failed)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TaskStatus::Todo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Review => "Review",
            TaskStatus::Done => "Done",
            TaskStatus::Failed => "Failed",
        };
        f.write_str(label)
    }
}

/// The role variant responsible for a task. Set explicitly at load time from
/// the task document's role grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Architect,
    Developer,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Architect => f.write_str("architect"),
            Category::Developer => f.write_str("developer"),
        }
    }
}

/// A unit of work with identity, dependency edges, and lifecycle status.
/// Created once at registry load time and mutated in place by the owning
/// agent or the orchestrator's reset paths; never deleted.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub task_id: String,
    pub name: String,
    pub description: String,
    pub deliverables: Vec<String>,
    pub dependencies: Vec<String>,
    pub category: Category,
    pub status: TaskStatus,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        task_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        category: Category,
    ) -> Self {
        let now = Utc::now();
        Self {
            task_id: task_id.into(),
            name: name.into(),
            description: description.into(),
            deliverables: Vec::new(),
            dependencies: Vec::new(),
            category,
            status: TaskStatus::Todo,
            assigned_to: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_deliverables<I, S>(mut self, deliverables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deliverables = deliverables.into_iter().map(Into::into).collect();
        self
    }

    /// Transition to `to`, refreshing `updated_at`. Returns false and leaves
    /// the task untouched if the transition is illegal.
    pub fn set_status(&mut self, to: TaskStatus) -> bool {
        if !self.status.can_transition(to) {
            tracing::warn!(
                task_id = %self.task_id,
                from = %self.status,
                to = %to,
                "illegal status transition refused"
            );
            return false;
        }
        self.status = to;
        self.updated_at = Utc::now();
        true
    }

    /// Seconds between creation and the last transition, clamped to zero.
    pub fn duration_secs(&self) -> i64 {
        (self.updated_at - self.created_at).num_seconds().max(0)
    }
}
