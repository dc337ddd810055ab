//! Shared data models.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Category grouping the task-definition catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskCategory {
    Design,
    InteriorCoordination,
    Exterior,
    Construction,
}

impl TaskCategory {
    /// Parse a stored category string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "design" => Ok(TaskCategory::Design),
            "interior-coordination" => Ok(TaskCategory::InteriorCoordination),
            "exterior" => Ok(TaskCategory::Exterior),
            "construction" => Ok(TaskCategory::Construction),
            other => Err(Error::Validation(format!(
                "Unknown task category: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Design => "design",
            TaskCategory::InteriorCoordination => "interior-coordination",
            TaskCategory::Exterior => "exterior",
            TaskCategory::Construction => "construction",
        }
    }
}

/// Tag attached to a calendar event, driving its colour in the UI.
///
/// `Task` marks the generic entries: request dates and standalone tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventTag {
    Design,
    InteriorCoordination,
    Exterior,
    Construction,
    Task,
}

/// Static catalog entry describing one managed task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub key: String,
    pub name: String,
    pub category: TaskCategory,
}

/// Per-task progress recorded on a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskProgress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_on: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_on: Option<NaiveDate>,
}

/// Names of the staff assigned to each role on a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleAssignees {
    pub design: Option<String>,
    pub interior: Option<String>,
    pub exterior: Option<String>,
    pub real_estate: Option<String>,
    pub construction: Option<String>,
    pub sales: Option<String>,
}

impl RoleAssignees {
    /// Whether `person` (already trimmed) holds any role on the project.
    /// Stored names are trimmed before comparison.
    pub fn includes(&self, person: &str) -> bool {
        [
            &self.design,
            &self.interior,
            &self.exterior,
            &self.real_estate,
            &self.construction,
            &self.sales,
        ]
        .into_iter()
        .flatten()
        .any(|name| name.trim() == person)
    }
}

/// Project milestone dates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Milestones {
    pub layout_confirmed_on: Option<NaiveDate>,
    pub construction_permit_on: Option<NaiveDate>,
    pub pre_contract_meeting_on: Option<NaiveDate>,
    pub drawing_handoff_on: Option<NaiveDate>,
}

/// A construction project as loaded from the store.
///
/// Read-only to the calendar core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub customer_name: String,
    pub archived: bool,
    #[serde(default)]
    pub assignees: RoleAssignees,
    #[serde(default)]
    pub milestones: Milestones,
    /// Task key → progress dates.
    #[serde(default)]
    pub progress: HashMap<String, TaskProgress>,
}

/// An ad-hoc task attached to a project, outside the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandaloneTask {
    pub project_id: i64,
    pub name: String,
    pub due_on: Option<NaiveDate>,
}

/// A single dated entry on the month view.
///
/// Derived on every collection pass and never persisted; identity is
/// structural equality only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
    pub date: NaiveDate,
    pub customer: String,
    pub label: String,
    pub tag: EventTag,
    pub project_id: i64,
}

/// Which projects the current sidebar tab makes visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityFilter {
    /// Every archived project.
    ArchivedAll,
    /// Archived projects still before layout confirmation.
    ArchivedDesignOnly,
    /// Archived projects past layout confirmation.
    ArchivedInteriorOnly,
    /// Every active project.
    AllActive,
    /// Active projects assigned to the named person in any role.
    ByPerson(String),
}

impl VisibilityFilter {
    /// Parse the sidebar tab value. Reserved keywords are matched exactly
    /// after trimming; any other non-empty value selects by person. The
    /// empty string is rejected rather than falling through to a person
    /// filter that matches nobody.
    pub fn parse(tab: &str) -> Result<Self> {
        let tab = tab.trim();
        match tab {
            "" => Err(Error::Validation("Tab must not be empty".to_string())),
            "all" => Ok(VisibilityFilter::AllActive),
            "archived" => Ok(VisibilityFilter::ArchivedAll),
            "archived-design" => Ok(VisibilityFilter::ArchivedDesignOnly),
            "archived-interior" => Ok(VisibilityFilter::ArchivedInteriorOnly),
            person => Ok(VisibilityFilter::ByPerson(person.to_string())),
        }
    }

    /// Whether `project` is visible under this filter.
    pub fn includes(&self, project: &Project) -> bool {
        match self {
            VisibilityFilter::ArchivedAll => project.archived,
            VisibilityFilter::ArchivedDesignOnly => {
                project.archived && project.milestones.layout_confirmed_on.is_none()
            }
            VisibilityFilter::ArchivedInteriorOnly => {
                project.archived && project.milestones.layout_confirmed_on.is_some()
            }
            VisibilityFilter::AllActive => !project.archived,
            VisibilityFilter::ByPerson(person) => {
                !project.archived && project.assignees.includes(person)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(archived: bool, layout_confirmed: Option<NaiveDate>) -> Project {
        Project {
            id: 1,
            customer_name: "山田 太郎様".to_string(),
            archived,
            assignees: RoleAssignees {
                design: Some("佐藤".to_string()),
                sales: Some(" 鈴木 ".to_string()),
                ..Default::default()
            },
            milestones: Milestones {
                layout_confirmed_on: layout_confirmed,
                ..Default::default()
            },
            progress: HashMap::new(),
        }
    }

    #[test]
    fn test_parse_reserved_tabs() {
        assert_eq!(
            VisibilityFilter::parse("all").unwrap(),
            VisibilityFilter::AllActive
        );
        assert_eq!(
            VisibilityFilter::parse(" archived ").unwrap(),
            VisibilityFilter::ArchivedAll
        );
        assert_eq!(
            VisibilityFilter::parse("archived-design").unwrap(),
            VisibilityFilter::ArchivedDesignOnly
        );
        assert_eq!(
            VisibilityFilter::parse("archived-interior").unwrap(),
            VisibilityFilter::ArchivedInteriorOnly
        );
    }

    #[test]
    fn test_parse_person_tab_is_trimmed() {
        assert_eq!(
            VisibilityFilter::parse(" 佐藤 ").unwrap(),
            VisibilityFilter::ByPerson("佐藤".to_string())
        );
    }

    #[test]
    fn test_parse_empty_tab_rejected() {
        assert!(VisibilityFilter::parse("").is_err());
        assert!(VisibilityFilter::parse("   ").is_err());
    }

    #[test]
    fn test_archived_buckets_split_on_layout_confirmation() {
        let before_layout = project(true, None);
        let after_layout = project(true, NaiveDate::from_ymd_opt(2025, 4, 1));

        assert!(VisibilityFilter::ArchivedDesignOnly.includes(&before_layout));
        assert!(!VisibilityFilter::ArchivedDesignOnly.includes(&after_layout));
        assert!(!VisibilityFilter::ArchivedInteriorOnly.includes(&before_layout));
        assert!(VisibilityFilter::ArchivedInteriorOnly.includes(&after_layout));
        assert!(VisibilityFilter::ArchivedAll.includes(&before_layout));
        assert!(VisibilityFilter::ArchivedAll.includes(&after_layout));
    }

    #[test]
    fn test_by_person_matches_any_role_trimmed() {
        let active = project(false, None);

        assert!(VisibilityFilter::ByPerson("佐藤".to_string()).includes(&active));
        assert!(VisibilityFilter::ByPerson("鈴木".to_string()).includes(&active));
        assert!(!VisibilityFilter::ByPerson("田中".to_string()).includes(&active));
    }

    #[test]
    fn test_by_person_excludes_archived() {
        let archived = project(true, None);
        assert!(!VisibilityFilter::ByPerson("佐藤".to_string()).includes(&archived));
    }

    #[test]
    fn test_category_round_trip() {
        for category in [
            TaskCategory::Design,
            TaskCategory::InteriorCoordination,
            TaskCategory::Exterior,
            TaskCategory::Construction,
        ] {
            assert_eq!(TaskCategory::parse(category.as_str()).unwrap(), category);
        }
        assert!(TaskCategory::parse("plumbing").is_err());
    }
}
