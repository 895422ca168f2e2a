//! Per-entity edit construction.

use crate::model::{EditSpec, EntitySnapshot};

/// Build the edit one task applies to one entity.
///
/// The result is an owned deep copy of `spec` with every field's `default`
/// taken from `snapshot`. It shares no container with `spec` or with any
/// other task's copy, so tasks can run concurrently without locks. Defaults
/// only fill the `default` slots; `add`/`remove` and edited values are
/// carried over untouched.
#[must_use]
pub fn build_task(spec: &EditSpec, snapshot: &EntitySnapshot) -> EditSpec {
    let mut task = spec.clone();

    task.title.default.clone_from(&snapshot.title);
    task.body.default.clone_from(&snapshot.body);
    task.assignees.default = snapshot.assignees.iter().cloned().collect();
    task.labels.default = snapshot.labels.iter().cloned().collect();
    task.projects.names.default = snapshot
        .project_items
        .iter()
        .map(|item| item.project_title.clone())
        .collect();
    task.projects.items = snapshot
        .project_items
        .iter()
        .map(|item| (item.project_id.clone(), item.item_id.clone()))
        .collect();
    task.milestone.default = snapshot.milestone.clone().unwrap_or_default();

    task
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_logging;
    use crate::model::{EntityKind, ProjectItem};
    use std::collections::BTreeSet;
    use tracing::info;

    fn snapshot(number: u64) -> EntitySnapshot {
        EntitySnapshot {
            id: format!("I_{number}"),
            number,
            url: format!("https://github.com/o/r/issues/{number}"),
            kind: EntityKind::Issue,
            title: format!("title {number}"),
            body: format!("body {number}"),
            assignees: vec!["hubot".to_string()],
            labels: vec![format!("label-{number}")],
            project_items: vec![ProjectItem {
                project_id: "P1".to_string(),
                project_title: "Roadmap".to_string(),
                item_id: format!("ITEM_{number}"),
            }],
            milestone: Some("v1".to_string()),
        }
    }

    fn labels_spec() -> EditSpec {
        let mut spec = EditSpec::default();
        spec.labels.edited = true;
        spec.labels.add.insert("bug".to_string());
        spec
    }

    #[test]
    fn test_defaults_come_from_snapshot() {
        init_test_logging();
        info!("test_defaults_come_from_snapshot: starting");
        let task = build_task(&labels_spec(), &snapshot(3));

        assert_eq!(task.title.default, "title 3");
        assert_eq!(task.body.default, "body 3");
        assert!(task.assignees.default.contains("hubot"));
        assert!(task.labels.default.contains("label-3"));
        assert!(task.projects.names.default.contains("Roadmap"));
        assert_eq!(task.projects.items.get("P1").map(String::as_str), Some("ITEM_3"));
        assert_eq!(task.milestone.default, "v1");
        info!("test_defaults_come_from_snapshot: assertions passed");
    }

    #[test]
    fn test_defaults_never_leak_into_add_or_remove() {
        init_test_logging();
        info!("test_defaults_never_leak_into_add_or_remove: starting");
        let task = build_task(&labels_spec(), &snapshot(1));

        let expected: BTreeSet<String> = ["bug".to_string()].into_iter().collect();
        assert_eq!(task.labels.add, expected);
        assert!(task.labels.remove.is_empty());
        assert!(task.labels.edited);
        info!("test_defaults_never_leak_into_add_or_remove: assertions passed");
    }

    #[test]
    fn test_missing_milestone_defaults_to_empty() {
        init_test_logging();
        let mut entity = snapshot(2);
        entity.milestone = None;
        let task = build_task(&EditSpec::default(), &entity);
        assert_eq!(task.milestone.default, "");
    }

    #[test]
    fn test_clones_do_not_alias() {
        init_test_logging();
        info!("test_clones_do_not_alias: starting");
        let canonical = labels_spec();
        let mut first = build_task(&canonical, &snapshot(1));
        let second = build_task(&canonical, &snapshot(2));

        first.labels.add.insert("mutated".to_string());
        first.labels.remove.insert("gone".to_string());
        first.labels.default.clear();
        first.projects.items.clear();

        assert_eq!(canonical, labels_spec());
        assert!(!second.labels.add.contains("mutated"));
        assert!(second.labels.remove.is_empty());
        assert!(second.labels.default.contains("label-2"));
        assert_eq!(second.projects.items.len(), 1);
        info!("test_clones_do_not_alias: assertions passed");
    }
}
