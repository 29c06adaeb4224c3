//! Two-role software-delivery workflow orchestration: a task-dependency
//! scheduler and per-task state machine that routes work between an
//! architect and a developer agent, delegating judgment calls to an external
//! generative-text service.

mod agent;
pub mod config;
mod error;
mod orchestrator;
mod registry;
mod report;
mod roles;
mod service;
mod task;

pub use agent::Agent;
pub use error::ConfigError;
pub use error::ServiceError;
pub use orchestrator::Orchestrator;
pub use orchestrator::RunStats;
pub use registry::TaskRegistry;
pub use report::Report;
pub use report::TaskDetail;
pub use roles::Architect;
pub use roles::Developer;
pub use roles::Guidance;
pub use service::CompletionService;
pub use service::OpenAiClient;
pub use service::ReviewVerdict;
pub use task::Category;
pub use task::Task;
pub use task::TaskStatus;
