//! Read-only course catalog: modules, their daily tasks, and reward tools.
//!
//! A [`Catalog`] is built once at startup (either the embedded built-in
//! catalog or a TOML file named in the config) and handed by reference to the
//! progress store and the unlock engine.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

const BUILTIN_CATALOG: &str = include_str!("builtin.toml");

/// A single completable unit of work inside a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub resource_url: String,
    #[serde(default)]
    pub resource_title: String,
}

/// A curriculum unit with a fixed, ordered set of tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub description: String,
    pub tasks: Vec<Task>,
}

impl Module {
    /// Number of tasks that must be complete for the module to count as done.
    pub fn required_task_count(&self) -> u32 {
        self.tasks.len() as u32
    }

    pub fn is_valid_task(&self, task_id: u32) -> bool {
        (1..=self.required_task_count()).contains(&task_id)
    }

    pub fn task(&self, task_id: u32) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }
}

/// When a tool becomes available to a user.
///
/// Serialized as `module:<module id>` or `course:complete`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UnlockCondition {
    /// Granted once every task of the named module is complete.
    Module(String),
    /// Granted once every module of the catalog is complete.
    CourseComplete,
}

impl TryFrom<String> for UnlockCondition {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.split_once(':') {
            Some(("module", id)) if !id.is_empty() => Ok(UnlockCondition::Module(id.to_string())),
            Some(("course", "complete")) => Ok(UnlockCondition::CourseComplete),
            _ => Err(CatalogError::InvalidCondition(value)),
        }
    }
}

impl From<UnlockCondition> for String {
    fn from(cond: UnlockCondition) -> Self {
        cond.to_string()
    }
}

impl fmt::Display for UnlockCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnlockCondition::Module(id) => write!(f, "module:{id}"),
            UnlockCondition::CourseComplete => f.write_str("course:complete"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolCategory {
    ModuleCompletion,
    CourseCompletion,
}

impl ToolCategory {
    /// The category every tool with this unlock condition must carry.
    pub fn for_condition(condition: &UnlockCondition) -> Self {
        match condition {
            UnlockCondition::Module(_) => ToolCategory::ModuleCompletion,
            UnlockCondition::CourseComplete => ToolCategory::CourseCompletion,
        }
    }
}

/// Payload delivered with a tool: a download, an embedded mini-tool, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
}

/// A reward artifact gated behind an [`UnlockCondition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: ToolCategory,
    pub tool_type: String,
    pub unlock: UnlockCondition,
    #[serde(default)]
    pub content: ToolContent,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// The full course: modules plus reward tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    modules: Vec<Module>,
    #[serde(default)]
    tools: Vec<Tool>,
}

impl Catalog {
    /// The catalog shipped with the binary.
    ///
    /// # Errors
    /// Only fails if the embedded document is malformed.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// Parse and validate a catalog document.
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = toml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog from a TOML file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut module_ids = HashSet::new();
        for module in &self.modules {
            if !module_ids.insert(module.id.as_str()) {
                return Err(CatalogError::DuplicateModule(module.id.clone()));
            }
            if module.tasks.is_empty() {
                return Err(CatalogError::EmptyModule(module.id.clone()));
            }
            let mut found: Vec<u32> = module.tasks.iter().map(|t| t.id).collect();
            found.sort_unstable();
            let expected: Vec<u32> = (1..=module.required_task_count()).collect();
            if found != expected {
                return Err(CatalogError::TaskNumbering {
                    module_id: module.id.clone(),
                    expected_max: module.required_task_count(),
                    found,
                });
            }
        }

        let mut tool_ids = HashSet::new();
        for tool in &self.tools {
            if !tool_ids.insert(tool.id.as_str()) {
                return Err(CatalogError::DuplicateTool(tool.id.clone()));
            }
            if tool.category != ToolCategory::for_condition(&tool.unlock) {
                return Err(CatalogError::CategoryMismatch {
                    tool_id: tool.id.clone(),
                    category: tool.category,
                    unlock: tool.unlock.clone(),
                });
            }
            if let UnlockCondition::Module(module_id) = &tool.unlock {
                if !module_ids.contains(module_id.as_str()) {
                    return Err(CatalogError::DanglingTool {
                        tool_id: tool.id.clone(),
                        module_id: module_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// Active tools only; inactive entries are never listed or granted.
    pub fn tools(&self) -> impl Iterator<Item = &Tool> {
        self.tools.iter().filter(|t| t.is_active)
    }

    pub fn tool(&self, id: &str) -> Option<&Tool> {
        self.tools().find(|t| t.id == id)
    }

    /// Active tools carrying exactly this unlock condition.
    pub fn tools_for<'a>(
        &'a self,
        condition: &'a UnlockCondition,
    ) -> impl Iterator<Item = &'a Tool> + 'a {
        self.tools().filter(move |t| &t.unlock == condition)
    }

    /// Sum of every module's required task count.
    pub fn total_tasks(&self) -> u32 {
        self.modules.iter().map(Module::required_task_count).sum()
    }
}
