//! Core data types for `ghi`.
//!
//! This module defines the fundamental types used throughout the application:
//! - `EditSpec` - Field-level description of an edit, independent of any entity
//! - `EntitySnapshot` - Current remote state of one issue or pull request
//! - `SharedOptions` - Repository metadata resolved once per batch
//! - `Repo` - The repository every entity of a batch lives in

use crate::error::{GhiError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Editable field of an issue or pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Title,
    Body,
    Assignees,
    Labels,
    Projects,
    Milestone,
}

impl FieldName {
    pub const ALL: [Self; 6] = [
        Self::Title,
        Self::Body,
        Self::Assignees,
        Self::Labels,
        Self::Projects,
        Self::Milestone,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Body => "body",
            Self::Assignees => "assignees",
            Self::Labels => "labels",
            Self::Projects => "projects",
            Self::Milestone => "milestone",
        }
    }

    /// Label shown in the interactive field survey.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Body => "Body",
            Self::Assignees => "Assignees",
            Self::Labels => "Labels",
            Self::Projects => "Projects",
            Self::Milestone => "Milestone",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot field to request from the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupField {
    Id,
    Number,
    Title,
    Body,
    Url,
    Assignees,
    Labels,
    ProjectItems,
    Milestone,
}

/// Single-valued field edit (title, body, milestone).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarEdit {
    pub edited: bool,
    pub value: String,
    pub default: String,
}

impl ScalarEdit {
    /// The value to write: the edit when dirty, the current value otherwise.
    #[must_use]
    pub fn effective(&self) -> &str {
        if self.edited {
            &self.value
        } else {
            &self.default
        }
    }
}

/// Set-valued field edit (assignees, labels, projects).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetEdit {
    pub edited: bool,
    pub add: BTreeSet<String>,
    pub remove: BTreeSet<String>,
    pub default: BTreeSet<String>,
}

impl SetEdit {
    /// Final membership: `(default ∪ add) \ remove`.
    ///
    /// Names compare case-insensitively, as the tracker resolves them; the
    /// first spelling seen wins.
    #[must_use]
    pub fn resolved(&self) -> BTreeSet<String> {
        let mut resolved = BTreeSet::new();
        for value in self.default.iter().chain(&self.add) {
            if !contains_name(&self.remove, value) && !contains_name(&resolved, value) {
                resolved.insert(value.clone());
            }
        }
        resolved
    }

    /// Replace `add`/`remove` with the difference between `selected` and the
    /// current default.
    pub fn select(&mut self, selected: BTreeSet<String>) {
        self.add = selected
            .iter()
            .filter(|value| !contains_name(&self.default, value))
            .cloned()
            .collect();
        self.remove = self
            .default
            .iter()
            .filter(|value| !contains_name(&selected, value))
            .cloned()
            .collect();
    }

    /// Names added that are not already present.
    #[must_use]
    pub fn to_add(&self) -> Vec<&str> {
        self.add
            .iter()
            .filter(|value| {
                !contains_name(&self.default, value) && !contains_name(&self.remove, value)
            })
            .map(String::as_str)
            .collect()
    }

    /// Names removed that are actually present.
    #[must_use]
    pub fn to_remove(&self) -> Vec<&str> {
        self.remove
            .iter()
            .filter(|value| contains_name(&self.default, value))
            .map(String::as_str)
            .collect()
    }
}

fn contains_name(set: &BTreeSet<String>, name: &str) -> bool {
    set.iter().any(|value| value.eq_ignore_ascii_case(name))
}

/// Project membership edit.
///
/// `items` maps a project id to this entity's item id in that project; it is
/// filled from the snapshot and needed to remove the entity from a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectsEdit {
    #[serde(flatten)]
    pub names: SetEdit,
    pub items: BTreeMap<String, String>,
}

/// Description of what changes, independent of any entity.
///
/// One canonical spec is built from command input. Tasks never share it
/// mutably: each works on its own clone (see `edit::task::build_task`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSpec {
    pub title: ScalarEdit,
    pub body: ScalarEdit,
    pub assignees: SetEdit,
    pub labels: SetEdit,
    pub projects: ProjectsEdit,
    pub milestone: ScalarEdit,
}

impl EditSpec {
    #[must_use]
    pub const fn is_edited(&self, field: FieldName) -> bool {
        match field {
            FieldName::Title => self.title.edited,
            FieldName::Body => self.body.edited,
            FieldName::Assignees => self.assignees.edited,
            FieldName::Labels => self.labels.edited,
            FieldName::Projects => self.projects.names.edited,
            FieldName::Milestone => self.milestone.edited,
        }
    }

    pub const fn mark_edited(&mut self, field: FieldName) {
        match field {
            FieldName::Title => self.title.edited = true,
            FieldName::Body => self.body.edited = true,
            FieldName::Assignees => self.assignees.edited = true,
            FieldName::Labels => self.labels.edited = true,
            FieldName::Projects => self.projects.names.edited = true,
            FieldName::Milestone => self.milestone.edited = true,
        }
    }

    /// True if any field was specified.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        FieldName::ALL.iter().any(|field| self.is_edited(*field))
    }

    #[must_use]
    pub fn dirty_fields(&self) -> Vec<FieldName> {
        FieldName::ALL
            .into_iter()
            .filter(|field| self.is_edited(*field))
            .collect()
    }

    /// Snapshot fields needed to apply this edit.
    #[must_use]
    pub fn lookup_fields(&self) -> BTreeSet<LookupField> {
        let mut fields: BTreeSet<LookupField> = [
            LookupField::Id,
            LookupField::Number,
            LookupField::Title,
            LookupField::Body,
            LookupField::Url,
        ]
        .into_iter()
        .collect();

        if self.assignees.edited {
            fields.insert(LookupField::Assignees);
        }
        if self.labels.edited {
            fields.insert(LookupField::Labels);
        }
        if self.projects.names.edited {
            fields.insert(LookupField::ProjectItems);
        }
        if self.milestone.edited {
            fields.insert(LookupField::Milestone);
        }
        fields
    }
}

/// Issue or pull request; the update mutation differs between the two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    #[default]
    Issue,
    PullRequest,
}

/// One project an entity belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectItem {
    pub project_id: String,
    pub project_title: String,
    pub item_id: String,
}

/// Current remote state of one entity, read once per batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: String,
    pub number: u64,
    pub url: String,
    pub kind: EntityKind,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub project_items: Vec<ProjectItem>,
    #[serde(default)]
    pub milestone: Option<String>,
}

impl EntitySnapshot {
    #[must_use]
    pub const fn is_pull_request(&self) -> bool {
        matches!(self.kind, EntityKind::PullRequest)
    }
}

/// Repository that contains every entity of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repo {
    pub owner: String,
    pub name: String,
}

impl Repo {
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Owner and name compare case-insensitively on GitHub.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.owner.eq_ignore_ascii_case(&other.owner) && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for Repo {
    type Err = GhiError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_end_matches(".git");
        let parts: Vec<&str> = trimmed.split('/').collect();
        match parts.as_slice() {
            [owner, name] if !owner.is_empty() && !name.is_empty() => Ok(Self::new(*owner, *name)),
            _ => Err(GhiError::validation(
                "repo",
                format!("expected the \"OWNER/NAME\" format, got \"{s}\""),
            )),
        }
    }
}

/// A remote object addressable by id and human-readable name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: String,
    pub name: String,
}

impl NamedRef {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Repository metadata resolved once per batch and shared read-only by every
/// task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedOptions {
    /// Users that can be assigned; `name` is the login.
    pub assignable_users: Vec<NamedRef>,
    pub labels: Vec<NamedRef>,
    pub projects: Vec<NamedRef>,
    pub milestones: Vec<NamedRef>,
    /// Login of the authenticated user, for `@me`.
    pub viewer_login: Option<String>,
}

impl SharedOptions {
    /// Resolve label names to ids.
    ///
    /// # Errors
    ///
    /// Returns `UnknownName` for the first name the repository lacks.
    pub fn label_ids<'a, I>(&self, names: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .map(|name| lookup_id(&self.labels, "labels", name))
            .collect()
    }

    /// Resolve logins to user ids, expanding `@me` to the viewer.
    ///
    /// # Errors
    ///
    /// Returns `UnknownName` for a login that is not assignable.
    pub fn assignee_ids<'a, I>(&self, logins: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        logins
            .into_iter()
            .map(|login| {
                let login = self.expand_me(login);
                lookup_id(&self.assignable_users, "assignable users", login)
            })
            .collect()
    }

    /// Resolve project titles to ids.
    ///
    /// # Errors
    ///
    /// Returns `UnknownName` for a title no project carries.
    pub fn project_ids<'a, I>(&self, titles: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        titles
            .into_iter()
            .map(|title| lookup_id(&self.projects, "projects", title))
            .collect()
    }

    /// Resolve a milestone title; an empty title clears the milestone.
    ///
    /// # Errors
    ///
    /// Returns `UnknownName` if the milestone does not exist.
    pub fn milestone_id(&self, title: &str) -> Result<Option<String>> {
        if title.is_empty() {
            return Ok(None);
        }
        lookup_id(&self.milestones, "milestones", title).map(Some)
    }

    /// Map `@me` to the viewer's login.
    #[must_use]
    pub fn expand_me<'a>(&'a self, login: &'a str) -> &'a str {
        match (login, self.viewer_login.as_deref()) {
            ("@me", Some(viewer)) => viewer,
            _ => login,
        }
    }
}

fn lookup_id(refs: &[NamedRef], kind: &str, name: &str) -> Result<String> {
    refs.iter()
        .find(|candidate| candidate.name.eq_ignore_ascii_case(name))
        .map(|found| found.id.clone())
        .ok_or_else(|| GhiError::UnknownName {
            kind: kind.to_string(),
            name: name.to_string(),
            known: refs.iter().map(|r| r.name.clone()).collect(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn clean_spec_is_not_dirty() {
        let spec = EditSpec::default();
        assert!(!spec.is_dirty());
        assert!(spec.dirty_fields().is_empty());
    }

    #[test]
    fn mark_edited_makes_spec_dirty() {
        let mut spec = EditSpec::default();
        spec.mark_edited(FieldName::Projects);
        assert!(spec.is_dirty());
        assert!(spec.projects.names.edited);
        assert_eq!(spec.dirty_fields(), vec![FieldName::Projects]);
    }

    #[test]
    fn lookup_fields_follow_dirty_fields() {
        let mut spec = EditSpec::default();
        assert_eq!(spec.lookup_fields().len(), 5);

        spec.labels.edited = true;
        spec.milestone.edited = true;
        let fields = spec.lookup_fields();
        assert!(fields.contains(&LookupField::Labels));
        assert!(fields.contains(&LookupField::Milestone));
        assert!(!fields.contains(&LookupField::Assignees));
        assert!(!fields.contains(&LookupField::ProjectItems));
    }

    #[test]
    fn scalar_effective_prefers_edit() {
        let mut edit = ScalarEdit {
            edited: false,
            value: String::new(),
            default: "old".to_string(),
        };
        assert_eq!(edit.effective(), "old");
        edit.edited = true;
        edit.value = "new".to_string();
        assert_eq!(edit.effective(), "new");
    }

    #[test]
    fn set_resolved_applies_add_then_remove() {
        let edit = SetEdit {
            edited: true,
            add: set(&["bug", "p1"]),
            remove: set(&["triage", "p1"]),
            default: set(&["triage", "docs"]),
        };
        assert_eq!(edit.resolved(), set(&["bug", "docs"]));
        assert_eq!(edit.to_add(), vec!["bug"]);
        assert_eq!(edit.to_remove(), vec!["triage"]);
    }

    #[test]
    fn set_select_diffs_against_default() {
        let mut edit = SetEdit {
            default: set(&["a", "b"]),
            ..SetEdit::default()
        };
        edit.select(set(&["b", "c"]));
        assert_eq!(edit.add, set(&["c"]));
        assert_eq!(edit.remove, set(&["a"]));
    }

    #[test]
    fn set_diff_ignores_name_case() {
        let edit = SetEdit {
            edited: true,
            add: set(&["Docs", "BUG"]),
            remove: set(&["BUG", "Triage"]),
            default: set(&["triage", "docs"]),
        };
        assert_eq!(edit.to_remove(), vec!["Triage"]);
        assert!(edit.to_add().is_empty());
        assert_eq!(edit.resolved(), set(&["docs"]));

        let mut picked = SetEdit {
            default: set(&["bug"]),
            ..SetEdit::default()
        };
        picked.select(set(&["Bug"]));
        assert!(picked.add.is_empty());
        assert!(picked.remove.is_empty());
    }

    #[test]
    fn repo_parse_and_display() {
        let repo: Repo = "cli/cli".parse().unwrap();
        assert_eq!(repo, Repo::new("cli", "cli"));
        assert_eq!(repo.to_string(), "cli/cli");
        assert!(repo.same_as(&Repo::new("CLI", "Cli")));
        assert!("cli".parse::<Repo>().is_err());
        assert!("a/b/c".parse::<Repo>().is_err());
    }

    #[test]
    fn options_resolve_names_case_insensitively() {
        let options = SharedOptions {
            labels: vec![NamedRef::new("L1", "bug"), NamedRef::new("L2", "Docs")],
            ..SharedOptions::default()
        };
        assert_eq!(
            options.label_ids(["BUG", "docs"]).unwrap(),
            vec!["L1".to_string(), "L2".to_string()]
        );
        let err = options.label_ids(["nope"]).unwrap_err();
        assert!(matches!(err, GhiError::UnknownName { ref name, .. } if name == "nope"));
    }

    #[test]
    fn options_expand_me_to_viewer() {
        let options = SharedOptions {
            assignable_users: vec![NamedRef::new("U1", "monalisa")],
            viewer_login: Some("monalisa".to_string()),
            ..SharedOptions::default()
        };
        assert_eq!(options.assignee_ids(["@me"]).unwrap(), vec!["U1".to_string()]);
    }

    #[test]
    fn empty_milestone_clears() {
        let options = SharedOptions::default();
        assert_eq!(options.milestone_id("").unwrap(), None);
        assert!(options.milestone_id("v1").is_err());
    }
}
