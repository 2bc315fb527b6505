//! Progress-driven tool unlocks.
//!
//! [`UnlockEngine`] decides which reward tools a user has become eligible for
//! and commits each grant at most once.

mod engine;

pub use engine::UnlockEngine;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Tool, ToolCategory, ToolContent, UnlockCondition};
use crate::events::Event;
use crate::storage::{ProgressRecord, UnlockRecord};

/// Outcome of a single grant attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// `false` when the user already held the tool; `record` is then the
    /// original, untouched grant.
    pub created: bool,
    pub record: UnlockRecord,
}

/// A newly granted tool, as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockedTool {
    pub tool_id: String,
    pub name: String,
    pub description: String,
    pub content: ToolContent,
    pub granted_at: DateTime<Utc>,
}

impl UnlockedTool {
    fn new(tool: &Tool, record: &UnlockRecord) -> Self {
        Self {
            tool_id: tool.id.clone(),
            name: tool.name.clone(),
            description: tool.description.clone(),
            content: tool.content.clone(),
            granted_at: record.granted_at,
        }
    }
}

/// A catalog tool annotated with the user's unlock state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStatus {
    pub tool_id: String,
    pub name: String,
    pub description: String,
    pub category: ToolCategory,
    pub tool_type: String,
    pub unlock: UnlockCondition,
    pub content: ToolContent,
    pub is_unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub usage_count: u64,
}

/// Everything that happened because of one task completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCompletion {
    pub record: ProgressRecord,
    pub newly_completed: bool,
    pub xp_gained: u32,
    pub module_complete: bool,
    pub unlocked: Vec<UnlockedTool>,
    pub events: Vec<Event>,
}
