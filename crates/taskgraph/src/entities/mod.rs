//! Core data structures for task graphs.

mod config;
mod identifier;
mod subtask;
mod task;

pub use config::{GlobalConfig, ModelConfig, ModelRole, ModelSettings, TasksConfig};
pub use identifier::{parse_identifier, IdentifierInfo, TaskIdentifier};
pub use subtask::Subtask;
pub use task::{Task, TaskPriority, TaskStatus};

pub(crate) use task::deserialize_numeric_id;
