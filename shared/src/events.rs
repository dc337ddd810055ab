//! Deadline-event collection for the month view.
//!
//! Scans the project and standalone-task datasets, applies the sidebar
//! visibility filter, and emits one [`CalendarEvent`] per relevant date.
//! Absent dates simply produce no event; collection never fails.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::{
    CalendarEvent, EventTag, Project, StandaloneTask, TaskCategory, TaskDefinition,
    VisibilityFilter,
};

/// Design-category task keys that never appear on the calendar.
const EXCLUDED_DESIGN_KEYS: [&str; 2] = ["area_check", "evoltz"];

/// Label suffix for a due date.
const DUE_SUFFIX: &str = "(期限)";
/// Label suffix for a request date.
const REQUEST_SUFFIX: &str = "(依頼)";

/// Collect every calendar event visible under `filter`.
///
/// A project can contribute zero to many events; no deduplication is
/// performed and ordering follows the traversal.
pub fn collect(
    projects: &[Project],
    catalog: &[TaskDefinition],
    standalone: &[StandaloneTask],
    filter: &VisibilityFilter,
) -> Vec<CalendarEvent> {
    let mut events = Vec::new();
    let mut visible: HashMap<i64, &Project> = HashMap::new();

    for project in projects.iter().filter(|p| filter.includes(p)) {
        visible.insert(project.id, project);
        collect_catalog_events(project, catalog, &mut events);
        collect_milestone_events(project, &mut events);
    }

    for task in standalone {
        let Some(project) = visible.get(&task.project_id) else {
            continue;
        };
        if let Some(due) = task.due_on {
            events.push(event(
                project,
                due,
                format!("{}{}", task.name, DUE_SUFFIX),
                EventTag::Task,
            ));
        }
    }

    events
}

fn collect_catalog_events(
    project: &Project,
    catalog: &[TaskDefinition],
    events: &mut Vec<CalendarEvent>,
) {
    for def in catalog {
        if def.category == TaskCategory::Design && EXCLUDED_DESIGN_KEYS.contains(&def.key.as_str())
        {
            continue;
        }
        let Some(progress) = project.progress.get(&def.key) else {
            continue;
        };

        match def.category {
            TaskCategory::Design | TaskCategory::InteriorCoordination => {
                let due_tag = if def.category == TaskCategory::Design {
                    EventTag::Design
                } else {
                    EventTag::InteriorCoordination
                };
                if let Some(due) = progress.due_on {
                    events.push(event(
                        project,
                        due,
                        format!("{}{}", def.name, DUE_SUFFIX),
                        due_tag,
                    ));
                }
                if let Some(requested) = progress.requested_on {
                    events.push(event(
                        project,
                        requested,
                        format!("{}{}", def.name, REQUEST_SUFFIX),
                        EventTag::Task,
                    ));
                }
            }
            // Exterior and construction tasks only surface their request date.
            TaskCategory::Exterior => {
                if let Some(requested) = progress.requested_on {
                    events.push(event(
                        project,
                        requested,
                        format!("{}{}", def.name, REQUEST_SUFFIX),
                        EventTag::Exterior,
                    ));
                }
            }
            TaskCategory::Construction => {
                if let Some(requested) = progress.requested_on {
                    events.push(event(
                        project,
                        requested,
                        format!("{}{}", def.name, REQUEST_SUFFIX),
                        EventTag::Construction,
                    ));
                }
            }
        }
    }
}

fn collect_milestone_events(project: &Project, events: &mut Vec<CalendarEvent>) {
    let milestones = &project.milestones;

    if let Some(date) = milestones.layout_confirmed_on {
        events.push(event(project, date, "間取り確定".to_string(), EventTag::Design));
    }
    if let Some(date) = milestones.construction_permit_on {
        events.push(event(
            project,
            date,
            "建築確認申請".to_string(),
            EventTag::Construction,
        ));
    }
    if let Some(date) = milestones.pre_contract_meeting_on {
        events.push(event(
            project,
            date,
            "請負契約前打合せ".to_string(),
            EventTag::Design,
        ));
    }
    if let Some(date) = milestones.drawing_handoff_on {
        events.push(event(
            project,
            date,
            "図面引き渡し".to_string(),
            EventTag::InteriorCoordination,
        ));
    }
}

fn event(project: &Project, date: NaiveDate, label: String, tag: EventTag) -> CalendarEvent {
    CalendarEvent {
        date,
        customer: project.customer_name.clone(),
        label,
        tag,
        project_id: project.id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Milestones, RoleAssignees, TaskProgress};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn project(id: i64) -> Project {
        Project {
            id,
            customer_name: "山田 太郎様".to_string(),
            archived: false,
            assignees: RoleAssignees::default(),
            milestones: Milestones::default(),
            progress: HashMap::new(),
        }
    }

    fn def(key: &str, name: &str, category: TaskCategory) -> TaskDefinition {
        TaskDefinition {
            key: key.to_string(),
            name: name.to_string(),
            category,
        }
    }

    fn progress(due: Option<NaiveDate>, requested: Option<NaiveDate>) -> TaskProgress {
        TaskProgress {
            due_on: due,
            requested_on: requested,
        }
    }

    #[test]
    fn test_project_without_dates_emits_nothing() {
        let projects = vec![project(1)];
        let catalog = vec![def("layout_plan", "間取りプラン", TaskCategory::Design)];

        let events = collect(&projects, &catalog, &[], &VisibilityFilter::AllActive);

        assert!(events.is_empty());
    }

    #[test]
    fn test_design_task_with_both_dates_emits_two_events() {
        let mut p = project(1);
        p.progress.insert(
            "layout_plan".to_string(),
            progress(Some(date(2025, 2, 10)), Some(date(2025, 2, 3))),
        );
        let catalog = vec![def("layout_plan", "間取りプラン", TaskCategory::Design)];

        let events = collect(&[p], &catalog, &[], &VisibilityFilter::AllActive);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].label, "間取りプラン(期限)");
        assert_eq!(events[0].tag, EventTag::Design);
        assert_eq!(events[0].date, date(2025, 2, 10));
        assert_eq!(events[1].label, "間取りプラン(依頼)");
        assert_eq!(events[1].tag, EventTag::Task);
        assert_eq!(events[1].date, date(2025, 2, 3));
    }

    #[test]
    fn test_interior_due_keeps_its_own_tag() {
        let mut p = project(1);
        p.progress.insert(
            "lighting_plan".to_string(),
            progress(Some(date(2025, 3, 5)), None),
        );
        let catalog = vec![def(
            "lighting_plan",
            "照明プラン",
            TaskCategory::InteriorCoordination,
        )];

        let events = collect(&[p], &catalog, &[], &VisibilityFilter::AllActive);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tag, EventTag::InteriorCoordination);
    }

    #[test]
    fn test_excluded_design_keys_never_emit() {
        let mut p = project(1);
        for key in EXCLUDED_DESIGN_KEYS {
            p.progress.insert(
                key.to_string(),
                progress(Some(date(2025, 2, 10)), Some(date(2025, 2, 3))),
            );
        }
        let catalog = vec![
            def("area_check", "面積チェック", TaskCategory::Design),
            def("evoltz", "evoltz", TaskCategory::Design),
        ];

        let events = collect(&[p], &catalog, &[], &VisibilityFilter::AllActive);

        assert!(events.is_empty());
    }

    #[test]
    fn test_exterior_and_construction_only_emit_requests() {
        let mut p = project(1);
        p.progress.insert(
            "fence_plan".to_string(),
            progress(Some(date(2025, 2, 10)), Some(date(2025, 2, 3))),
        );
        p.progress.insert(
            "foundation".to_string(),
            progress(Some(date(2025, 2, 11)), Some(date(2025, 2, 4))),
        );
        let catalog = vec![
            def("fence_plan", "外構プラン", TaskCategory::Exterior),
            def("foundation", "基礎工事", TaskCategory::Construction),
        ];

        let events = collect(&[p], &catalog, &[], &VisibilityFilter::AllActive);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].label, "外構プラン(依頼)");
        assert_eq!(events[0].tag, EventTag::Exterior);
        assert_eq!(events[1].label, "基礎工事(依頼)");
        assert_eq!(events[1].tag, EventTag::Construction);
    }

    #[test]
    fn test_milestones_emit_with_fixed_labels_and_tags() {
        let mut p = project(1);
        p.milestones = Milestones {
            layout_confirmed_on: Some(date(2025, 2, 1)),
            construction_permit_on: Some(date(2025, 2, 2)),
            pre_contract_meeting_on: Some(date(2025, 2, 3)),
            drawing_handoff_on: Some(date(2025, 2, 4)),
        };

        let events = collect(&[p], &[], &[], &VisibilityFilter::AllActive);

        let labels: Vec<(&str, EventTag)> = events
            .iter()
            .map(|e| (e.label.as_str(), e.tag))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("間取り確定", EventTag::Design),
                ("建築確認申請", EventTag::Construction),
                ("請負契約前打合せ", EventTag::Design),
                ("図面引き渡し", EventTag::InteriorCoordination),
            ]
        );
    }

    #[test]
    fn test_standalone_tasks_follow_the_filter() {
        let visible = project(1);
        let mut hidden = project(2);
        hidden.archived = true;

        let tasks = vec![
            StandaloneTask {
                project_id: 1,
                name: "地鎮祭".to_string(),
                due_on: Some(date(2025, 2, 15)),
            },
            StandaloneTask {
                project_id: 1,
                name: "備考".to_string(),
                due_on: None,
            },
            StandaloneTask {
                project_id: 2,
                name: "上棟".to_string(),
                due_on: Some(date(2025, 2, 20)),
            },
        ];

        let events = collect(
            &[visible, hidden],
            &[],
            &tasks,
            &VisibilityFilter::AllActive,
        );

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].label, "地鎮祭(期限)");
        assert_eq!(events[0].tag, EventTag::Task);
        assert_eq!(events[0].project_id, 1);
    }

    #[test]
    fn test_filtered_out_projects_contribute_nothing() {
        let mut archived = project(1);
        archived.archived = true;
        archived.progress.insert(
            "layout_plan".to_string(),
            progress(Some(date(2025, 2, 10)), None),
        );
        let catalog = vec![def("layout_plan", "間取りプラン", TaskCategory::Design)];

        let active_view = collect(
            &[archived.clone()],
            &catalog,
            &[],
            &VisibilityFilter::AllActive,
        );
        let archived_view = collect(&[archived], &catalog, &[], &VisibilityFilter::ArchivedAll);

        assert!(active_view.is_empty());
        assert_eq!(archived_view.len(), 1);
    }
}
