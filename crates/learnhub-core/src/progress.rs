//! Per-user task progress, validated against the catalog.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Module};
use crate::error::{CoreError, Result};
use crate::storage::{Database, ProgressRecord};

/// Experience points awarded per completed task.
pub const XP_PER_TASK: u32 = 1;

/// Completion state of one module for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleStatus {
    pub module_id: String,
    pub title: String,
    pub completed_tasks: u32,
    pub required_tasks: u32,
    pub is_complete: bool,
}

/// Aggregate course progress for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub user_id: String,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub xp: u32,
    pub percent_complete: f64,
    pub completed_modules: usize,
    pub total_modules: usize,
    pub modules: Vec<ModuleStatus>,
}

/// Catalog-aware view over the progress tables.
pub struct ProgressStore<'a> {
    catalog: &'a Catalog,
    db: &'a Database,
}

/// Result of recording one task completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub record: ProgressRecord,
    /// `false` when the task had already been completed.
    pub newly_completed: bool,
}

/// Completed tasks of `module` that the catalog still defines.
///
/// Rows recorded under an older catalog with more tasks are ignored, so the
/// count never exceeds the module's required task count.
fn completed_in(module: &Module, task_ids: &BTreeSet<u32>) -> u32 {
    task_ids.iter().filter(|&&id| module.is_valid_task(id)).count() as u32
}

fn count_in(module: &Module, completed: &HashMap<String, BTreeSet<u32>>) -> u32 {
    completed
        .get(module.id.as_str())
        .map_or(0, |ids| completed_in(module, ids))
}

fn scoped_to(module: &Module, mut record: ProgressRecord) -> ProgressRecord {
    record.completed_task_ids.retain(|&id| module.is_valid_task(id));
    record
}

impl<'a> ProgressStore<'a> {
    pub fn new(catalog: &'a Catalog, db: &'a Database) -> Self {
        Self { catalog, db }
    }

    fn module(&self, module_id: &str) -> Result<&'a Module> {
        self.catalog
            .module(module_id)
            .ok_or_else(|| CoreError::UnknownModule(module_id.to_string()))
    }

    /// Mark `task_id` of `module_id` complete for `user_id`.
    ///
    /// Completing an already-completed task is not an error; the current
    /// record is returned with `newly_completed = false`.
    ///
    /// # Errors
    /// [`CoreError::UnknownModule`] or [`CoreError::InvalidTaskId`] before
    /// anything is written.
    pub fn record_task_completion(
        &self,
        user_id: &str,
        module_id: &str,
        task_id: u32,
    ) -> Result<Recorded> {
        let module = self.module(module_id)?;
        if !module.is_valid_task(task_id) {
            return Err(CoreError::InvalidTaskId {
                module_id: module_id.to_string(),
                task_id,
                max: module.required_task_count(),
            });
        }

        let newly_completed = self
            .db
            .insert_completed_task(user_id, module_id, task_id, Utc::now())?;
        if !newly_completed {
            tracing::debug!(user_id, module_id, task_id, "task already completed");
        }

        let record = self.db.load_progress(user_id, module_id)?.ok_or_else(|| {
            CoreError::StorageUnavailable(format!(
                "progress for ({user_id}, {module_id}) not visible after write"
            ))
        })?;
        Ok(Recorded {
            record: scoped_to(module, record),
            newly_completed,
        })
    }

    /// Progress for one module, `None` if the user never completed a task in it.
    pub fn get_progress(&self, user_id: &str, module_id: &str) -> Result<Option<ProgressRecord>> {
        let module = self.module(module_id)?;
        Ok(self
            .db
            .load_progress(user_id, module_id)?
            .map(|record| scoped_to(module, record)))
    }

    /// All progress records of the user, skipping modules no longer in the catalog.
    pub fn list_progress(&self, user_id: &str) -> Result<Vec<ProgressRecord>> {
        let records = self.db.list_progress(user_id)?;
        Ok(records
            .into_iter()
            .filter_map(|r| {
                let module = self.catalog.module(&r.module_id)?;
                Some(scoped_to(module, r))
            })
            .collect())
    }

    /// Whether every task of the module is complete for the user.
    pub fn is_module_complete(&self, user_id: &str, module_id: &str) -> Result<bool> {
        let module = self.module(module_id)?;
        let completed = self
            .db
            .load_progress(user_id, module_id)?
            .map_or(0, |r| completed_in(module, &r.completed_task_ids));
        Ok(completed == module.required_task_count())
    }

    /// Number of catalog modules in which the user has completed every task.
    ///
    /// Each module is compared against its own required task count.
    pub fn count_completed_modules(&self, user_id: &str) -> Result<usize> {
        let completed = self.completed_sets(user_id)?;
        Ok(self
            .catalog
            .modules()
            .iter()
            .filter(|m| count_in(m, &completed) == m.required_task_count())
            .count())
    }

    /// Course-wide totals, XP and per-module status.
    pub fn course_summary(&self, user_id: &str) -> Result<CourseSummary> {
        let completed = self.completed_sets(user_id)?;
        let modules: Vec<ModuleStatus> = self
            .catalog
            .modules()
            .iter()
            .map(|m| {
                let completed_tasks = count_in(m, &completed);
                ModuleStatus {
                    module_id: m.id.clone(),
                    title: m.title.clone(),
                    completed_tasks,
                    required_tasks: m.required_task_count(),
                    is_complete: completed_tasks == m.required_task_count(),
                }
            })
            .collect();

        let total_tasks = self.catalog.total_tasks();
        let completed_tasks: u32 = modules.iter().map(|m| m.completed_tasks).sum();
        let percent_complete = if total_tasks == 0 {
            0.0
        } else {
            f64::from(completed_tasks) * 100.0 / f64::from(total_tasks)
        };

        Ok(CourseSummary {
            user_id: user_id.to_string(),
            total_tasks,
            completed_tasks,
            xp: completed_tasks * XP_PER_TASK,
            percent_complete,
            completed_modules: modules.iter().filter(|m| m.is_complete).count(),
            total_modules: modules.len(),
            modules,
        })
    }

    fn completed_sets(&self, user_id: &str) -> Result<HashMap<String, BTreeSet<u32>>> {
        let mut sets: HashMap<String, BTreeSet<u32>> = HashMap::new();
        for (module_id, task_id) in self.db.completed_tasks(user_id)? {
            sets.entry(module_id).or_default().insert(task_id);
        }
        Ok(sets)
    }

}
