//! # LearnHub Core Library
//!
//! Business logic for LearnHub, a gamified learning tracker: learners work
//! through fixed course modules of daily tasks, earn XP, and unlock reward
//! tools when they finish a module or the whole course. The `learnhub` CLI
//! is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Catalog**: read-only modules, tasks and tools, built once at startup
//!   and passed by reference
//! - **Storage**: SQLite tables for users, progress and unlock grants, plus
//!   TOML-based configuration
//! - **Progress**: catalog-validated task completion and course summaries
//! - **Unlock**: eligibility evaluation and at-most-once grant commits
//!
//! ## Key Components
//!
//! - [`Catalog`]: modules, tasks and reward tools
//! - [`Database`]: learner state persistence
//! - [`ProgressStore`]: task completion and module counting
//! - [`UnlockEngine`]: tool eligibility and grants
//! - [`Config`]: application configuration management

pub mod catalog;
pub mod error;
pub mod events;
pub mod progress;
pub mod storage;
pub mod unlock;

pub use catalog::{Catalog, Module, Task, Tool, ToolCategory, ToolContent, UnlockCondition};
pub use error::{CatalogError, ConfigError, CoreError, DatabaseError};
pub use events::Event;
pub use progress::{CourseSummary, ModuleStatus, ProgressStore, Recorded, XP_PER_TASK};
pub use storage::{Config, Database, ProgressRecord, UnlockRecord, User};
pub use unlock::{Grant, TaskCompletion, ToolStatus, UnlockEngine, UnlockedTool};
