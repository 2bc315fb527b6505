use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything a completion can announce to the learner.
/// The front end turns these into toasts and banners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TaskCompleted {
        module_id: String,
        task_id: u32,
        xp_gained: u32,
        at: DateTime<Utc>,
    },
    /// The task brought the module to full completion.
    ModuleCompleted {
        module_id: String,
        at: DateTime<Utc>,
    },
    ToolUnlocked {
        tool_id: String,
        name: String,
        at: DateTime<Utc>,
    },
    /// The task completed the last unfinished module of the course.
    CourseCompleted {
        at: DateTime<Utc>,
    },
}
