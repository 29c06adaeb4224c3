use serde::Serialize;

use crate::agent::Agent;
use crate::config::ArchitectProfile;
use crate::config::DeveloperProfile;
use crate::error::ServiceError;
use crate::service::CompletionService;
use crate::service::ReviewVerdict;
use crate::task::Category;
use crate::task::Task;
use crate::task::TaskStatus;

const GUIDANCE_PROMPT: &str = "\
As a Software Architect, provide technical guidance for the following task.

Provide:
1. Specific architectural guidelines
2. Design patterns to implement
3. Technical requirements
4. Best practices to follow
5. Implementation considerations";

const REVIEW_PROMPT: &str = "\
Review the implementation of the task below. Verify that it follows the
architectural guidelines, implements the required design patterns, and meets
quality standards.

Respond with a single JSON object and nothing else:
{\"approved\": <true|false>, \"summary\": \"<one-paragraph justification>\"}";

const IMPLEMENTATION_PROMPT: &str = "\
Implement the following task as a Developer.

Provide:
1. Implementation approach
2. Code structure
3. Testing strategy
4. Error handling
5. Documentation requirements";

/// Architectural input produced for a task before implementation.
#[derive(Debug, Clone, Serialize)]
pub struct Guidance {
    /// Raw guidance text from the generation service.
    pub text: String,
    /// Known design patterns mentioned (case-insensitively) in the task
    /// description.
    pub matched_patterns: Vec<String>,
    pub technical_requirements: Vec<String>,
}

/// Architect strategy: guidance for any task, review gating for developer
/// tasks. Wraps the shared agent lifecycle state.
pub struct Architect {
    pub agent: Agent,
    profile: ArchitectProfile,
}

impl Architect {
    pub fn new(profile: ArchitectProfile) -> Self {
        let agent = Agent::new(profile.role_name.clone(), profile.goal.clone());
        Self { agent, profile }
    }

    /// Build a context-bearing guidance prompt and request generation.
    /// Service failures propagate; there is no local recovery.
    pub async fn provide_guidance(
        &self,
        service: &dyn CompletionService,
        task: &Task,
    ) -> Result<Guidance, ServiceError> {
        let prompt = format!(
            "{GUIDANCE_PROMPT}\n\nTask: {}\n\nConsider these design patterns: {}\nRequired technical skills: {}",
            task.description,
            self.profile.core_competencies.design_patterns.join(", "),
            self.profile.core_competencies.technical_skills.join(", "),
        );
        let text = service.complete(Category::Architect, &prompt).await?;

        let description = task.description.to_lowercase();
        let matched_patterns = self
            .profile
            .core_competencies
            .design_patterns
            .iter()
            .filter(|pattern| description.contains(&pattern.to_lowercase()))
            .cloned()
            .collect();

        Ok(Guidance {
            text,
            matched_patterns,
            technical_requirements: self.profile.core_competencies.technical_skills.clone(),
        })
    }

    /// Review a developer task awaiting approval. Returns `Ok(None)` if the
    /// task is not in Review (precondition violation, logged). A response
    /// without a parseable verdict is a service fault.
    pub async fn review_implementation(
        &self,
        service: &dyn CompletionService,
        task: &Task,
    ) -> Result<Option<ReviewVerdict>, ServiceError> {
        if task.status != TaskStatus::Review {
            tracing::warn!(
                task_id = %task.task_id,
                status = %task.status,
                "task is not ready for review"
            );
            return Ok(None);
        }

        let prompt = format!(
            "{REVIEW_PROMPT}\n\nTask ID: {}\nName: {}\nDescription: {}",
            task.task_id, task.name, task.description,
        );
        let response = service.complete(Category::Architect, &prompt).await?;
        let verdict = ReviewVerdict::extract(&response)?;
        tracing::info!(
            task_id = %task.task_id,
            approved = verdict.approved,
            summary = %verdict.summary,
            "architect review"
        );
        Ok(Some(verdict))
    }
}

/// Developer strategy: turns guidance into an implementation and hands the
/// task over for review.
pub struct Developer {
    pub agent: Agent,
    profile: DeveloperProfile,
}

impl Developer {
    pub fn new(profile: DeveloperProfile) -> Self {
        let agent = Agent::new(profile.role_name.clone(), profile.goal.clone());
        Self { agent, profile }
    }

    /// Request an implementation for the held task and move it to Review.
    /// Returns `Ok(false)` if `task` is not this agent's current task
    /// (precondition violation, logged). The generated content itself is not
    /// parsed further.
    pub async fn implement_task(
        &self,
        service: &dyn CompletionService,
        task: &mut Task,
        guidance: &Guidance,
    ) -> Result<bool, ServiceError> {
        if self.agent.current_task() != Some(task.task_id.as_str()) {
            tracing::warn!(
                task_id = %task.task_id,
                "task is not assigned to this developer"
            );
            return Ok(false);
        }

        let prompt = format!(
            "{IMPLEMENTATION_PROMPT}\n\nTask ID: {}\nName: {}\nDescription: {}\nDeliverables: {}\n\nTechnical guidance:\n{}\n\nConsider these coding practices: {}",
            task.task_id,
            task.name,
            task.description,
            task.deliverables.join(", "),
            guidance.text,
            self.profile.coding_practices.join(", "),
        );
        let response = service.complete(Category::Developer, &prompt).await?;
        tracing::debug!(
            task_id = %task.task_id,
            response_len = response.len(),
            "implementation generated"
        );

        task.set_status(TaskStatus::Review);
        Ok(true)
    }
}
