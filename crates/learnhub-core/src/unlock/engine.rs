//! Unlock evaluation engine.
//!
//! Eligibility is re-derived from stored progress on every call, so the
//! engine can be invoked redundantly (retries, duplicate requests, several
//! tabs). The only write is [`UnlockEngine::grant`], an insert-if-absent
//! against the `unlocks` uniqueness constraint.

use std::collections::HashMap;

use chrono::Utc;

use super::{Grant, TaskCompletion, ToolStatus, UnlockedTool};
use crate::catalog::{Catalog, Module, Tool, UnlockCondition};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::progress::{ProgressStore, XP_PER_TASK};
use crate::storage::{Database, UnlockRecord};

/// Decides and commits tool grants for one catalog over one database handle.
pub struct UnlockEngine<'a> {
    catalog: &'a Catalog,
    db: &'a Database,
}

impl<'a> UnlockEngine<'a> {
    pub fn new(catalog: &'a Catalog, db: &'a Database) -> Self {
        Self { catalog, db }
    }

    pub fn progress(&self) -> ProgressStore<'a> {
        ProgressStore::new(self.catalog, self.db)
    }

    fn module(&self, module_id: &str) -> Result<&'a Module> {
        self.catalog
            .module(module_id)
            .ok_or_else(|| CoreError::UnknownModule(module_id.to_string()))
    }

    fn tool(&self, tool_id: &str) -> Result<&'a Tool> {
        self.catalog
            .tool(tool_id)
            .ok_or_else(|| CoreError::UnknownTool(tool_id.to_string()))
    }

    /// Grant `tool_id` to `user_id` unless it was granted before.
    ///
    /// A repeated grant is not an error: it reports `created = false` and
    /// returns the original record with its original `granted_at`.
    pub fn grant(&self, user_id: &str, tool_id: &str) -> Result<Grant> {
        let tool = self.tool(tool_id)?;
        let (created, record) = self
            .db
            .insert_unlock_if_absent(user_id, &tool.id, Utc::now())?;
        if created {
            tracing::info!(user_id, tool_id, "tool unlocked");
        } else {
            tracing::debug!(user_id, tool_id, "tool already unlocked");
        }
        Ok(Grant { created, record })
    }

    /// Grant every tool the user has become eligible for through `module_id`.
    ///
    /// Returns only the tools newly granted by this call, in no particular
    /// order. An incomplete module yields an empty list.
    pub fn evaluate_and_grant(&self, user_id: &str, module_id: &str) -> Result<Vec<UnlockedTool>> {
        let module = self.module(module_id)?;
        let progress = self.progress();

        if !progress.is_module_complete(user_id, module_id)? {
            return Ok(Vec::new());
        }

        let mut unlocked = Vec::new();
        let module_tier = UnlockCondition::Module(module.id.clone());
        for tool in self.catalog.tools_for(&module_tier) {
            self.grant_into(user_id, tool, &mut unlocked)?;
        }

        if progress.count_completed_modules(user_id)? == self.catalog.modules().len() {
            for tool in self.catalog.tools_for(&UnlockCondition::CourseComplete) {
                self.grant_into(user_id, tool, &mut unlocked)?;
            }
        }

        Ok(unlocked)
    }

    fn grant_into(&self, user_id: &str, tool: &Tool, unlocked: &mut Vec<UnlockedTool>) -> Result<()> {
        let grant = self.grant(user_id, &tool.id)?;
        if grant.created {
            unlocked.push(UnlockedTool::new(tool, &grant.record));
        }
        Ok(())
    }

    /// Record a task completion and grant whatever it unlocks.
    pub fn complete_task(&self, user_id: &str, module_id: &str, task_id: u32) -> Result<TaskCompletion> {
        let progress = self.progress();
        let recorded = progress.record_task_completion(user_id, module_id, task_id)?;
        let module_complete = progress.is_module_complete(user_id, module_id)?;

        let now = Utc::now();
        let mut events = Vec::new();
        let xp_gained = if recorded.newly_completed { XP_PER_TASK } else { 0 };
        if recorded.newly_completed {
            events.push(Event::TaskCompleted {
                module_id: module_id.to_string(),
                task_id,
                xp_gained,
                at: now,
            });
            if module_complete {
                tracing::info!(user_id, module_id, "module completed");
                events.push(Event::ModuleCompleted {
                    module_id: module_id.to_string(),
                    at: now,
                });
                if progress.count_completed_modules(user_id)? == self.catalog.modules().len() {
                    tracing::info!(user_id, "course completed");
                    events.push(Event::CourseCompleted { at: now });
                }
            }
        }

        let unlocked = self.evaluate_and_grant(user_id, module_id)?;
        events.extend(unlocked.iter().map(|tool| Event::ToolUnlocked {
            tool_id: tool.tool_id.clone(),
            name: tool.name.clone(),
            at: tool.granted_at,
        }));

        Ok(TaskCompletion {
            record: recorded.record,
            newly_completed: recorded.newly_completed,
            xp_gained,
            module_complete,
            unlocked,
            events,
        })
    }

    /// Active catalog tools left-joined with the user's grants.
    pub fn tool_statuses(&self, user_id: &str) -> Result<Vec<ToolStatus>> {
        let unlocks: HashMap<String, UnlockRecord> = self
            .db
            .list_unlocks(user_id)?
            .into_iter()
            .map(|u| (u.tool_id.clone(), u))
            .collect();

        Ok(self
            .catalog
            .tools()
            .map(|tool| {
                let unlock = unlocks.get(&tool.id);
                ToolStatus {
                    tool_id: tool.id.clone(),
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    category: tool.category,
                    tool_type: tool.tool_type.clone(),
                    unlock: tool.unlock.clone(),
                    content: tool.content.clone(),
                    is_unlocked: unlock.is_some(),
                    unlocked_at: unlock.map(|u| u.granted_at),
                    usage_count: unlock.map_or(0, |u| u.usage_count),
                }
            })
            .collect())
    }

    /// Count one access of an unlocked tool.
    ///
    /// # Errors
    /// [`CoreError::ToolLocked`] when the user has not been granted the tool.
    pub fn use_tool(&self, user_id: &str, tool_id: &str) -> Result<UnlockRecord> {
        let tool = self.tool(tool_id)?;
        self.db
            .increment_usage(user_id, &tool.id)?
            .ok_or_else(|| CoreError::ToolLocked {
                tool_id: tool.id.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Catalog, Database) {
        (Catalog::builtin().unwrap(), Database::open_memory().unwrap())
    }

    fn complete_module(engine: &UnlockEngine, user_id: &str, module_id: &str) {
        for task in 1..=7 {
            engine.complete_task(user_id, module_id, task).unwrap();
        }
    }

    #[test]
    fn grant_rejects_unknown_tool() {
        let (catalog, db) = setup();
        let engine = UnlockEngine::new(&catalog, &db);
        let err = engine.grant("u1", "time-machine").unwrap_err();
        assert!(matches!(err, CoreError::UnknownTool(id) if id == "time-machine"));
    }

    #[test]
    fn evaluate_rejects_unknown_module() {
        let (catalog, db) = setup();
        let engine = UnlockEngine::new(&catalog, &db);
        assert!(matches!(
            engine.evaluate_and_grant("u1", "haskell"),
            Err(CoreError::UnknownModule(_))
        ));
    }

    #[test]
    fn completing_last_task_reports_module_and_tool() {
        let (catalog, db) = setup();
        let engine = UnlockEngine::new(&catalog, &db);

        for task in 1..=6 {
            let outcome = engine.complete_task("u1", "react", task).unwrap();
            assert!(!outcome.module_complete);
            assert!(outcome.unlocked.is_empty());
            assert_eq!(outcome.xp_gained, 1);
        }

        let outcome = engine.complete_task("u1", "react", 7).unwrap();
        assert!(outcome.module_complete);
        let ids: Vec<&str> = outcome.unlocked.iter().map(|t| t.tool_id.as_str()).collect();
        assert_eq!(ids, ["react-component-generator"]);
        assert!(matches!(outcome.events[0], Event::TaskCompleted { task_id: 7, .. }));
        assert!(outcome
            .events
            .iter()
            .any(|e| matches!(e, Event::ModuleCompleted { module_id, .. } if module_id == "react")));
        assert!(outcome
            .events
            .iter()
            .any(|e| matches!(e, Event::ToolUnlocked { tool_id, .. } if tool_id == "react-component-generator")));
    }

    #[test]
    fn recompleting_task_announces_nothing() {
        let (catalog, db) = setup();
        let engine = UnlockEngine::new(&catalog, &db);
        complete_module(&engine, "u1", "cms");

        let outcome = engine.complete_task("u1", "cms", 7).unwrap();
        assert!(!outcome.newly_completed);
        assert_eq!(outcome.xp_gained, 0);
        assert!(outcome.module_complete);
        assert!(outcome.unlocked.is_empty());
        assert!(outcome.events.is_empty());
    }

    #[test]
    fn statuses_mark_granted_tools() {
        let (catalog, db) = setup();
        let engine = UnlockEngine::new(&catalog, &db);
        complete_module(&engine, "u1", "fullstack");

        let statuses = engine.tool_statuses("u1").unwrap();
        assert_eq!(statuses.len(), 10);
        let unlocked: Vec<&str> = statuses
            .iter()
            .filter(|s| s.is_unlocked)
            .map(|s| s.tool_id.as_str())
            .collect();
        assert_eq!(unlocked, ["fullstack-api-kit"]);
        assert!(statuses
            .iter()
            .filter(|s| !s.is_unlocked)
            .all(|s| s.unlocked_at.is_none()));

        let other_user = engine.tool_statuses("u2").unwrap();
        assert!(other_user.iter().all(|s| !s.is_unlocked));
    }

    #[test]
    fn use_tool_requires_grant() {
        let (catalog, db) = setup();
        let engine = UnlockEngine::new(&catalog, &db);

        let err = engine.use_tool("u1", "cms-project-templates").unwrap_err();
        assert!(matches!(err, CoreError::ToolLocked { .. }));

        complete_module(&engine, "u1", "cms");
        engine.use_tool("u1", "cms-project-templates").unwrap();
        let record = engine.use_tool("u1", "cms-project-templates").unwrap();
        assert_eq!(record.usage_count, 2);

        let status = engine
            .tool_statuses("u1")
            .unwrap()
            .into_iter()
            .find(|s| s.tool_id == "cms-project-templates")
            .unwrap();
        assert_eq!(status.usage_count, 2);
    }

    #[test]
    fn last_module_announces_course_completion() {
        let (catalog, db) = setup();
        let engine = UnlockEngine::new(&catalog, &db);
        let ids: Vec<String> = catalog.modules().iter().map(|m| m.id.clone()).collect();
        let (last, rest) = ids.split_last().unwrap();
        for module_id in rest {
            complete_module(&engine, "u1", module_id);
        }
        for task in 1..=6 {
            engine.complete_task("u1", last, task).unwrap();
        }

        let outcome = engine.complete_task("u1", last, 7).unwrap();
        assert!(outcome
            .events
            .iter()
            .any(|e| matches!(e, Event::CourseCompleted { .. })));
        // one module-tier tool plus four course-tier tools
        assert_eq!(outcome.unlocked.len(), 5);
    }
}
