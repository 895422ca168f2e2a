//! GraphQL client for the GitHub API.

use crate::api::{Fetcher, OptionsResolver, Updater};
use crate::error::{GhiError, Result};
use crate::model::{
    EditSpec, EntityKind, EntitySnapshot, LookupField, NamedRef, ProjectItem, Repo, SetEdit,
    SharedOptions,
};
use crate::util::selector::{ResolvedSelector, resolve_selectors};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument};

/// Page size for every connection; larger repositories are truncated.
const PAGE_SIZE: u32 = 100;

/// Entity lookups in flight at once while fetching a batch.
const MAX_CONCURRENT_LOOKUPS: usize = 8;

/// GitHub GraphQL client.
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: reqwest::Client,
    api_url: String,
    base_repo: Option<Repo>,
}

/// GraphQL request body
#[derive(Debug, Serialize)]
struct GraphQLRequest<'a, V: Serialize> {
    query: &'a str,
    variables: V,
}

/// GraphQL response wrapper
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQLError>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl GithubClient {
    /// Create a client for `api_url`.
    ///
    /// `base_repo` resolves bare issue numbers. Without a token no
    /// `Authorization` header is sent.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the token is not a valid header value, or
    /// `Transport` if the HTTP client cannot be built.
    pub fn new(
        api_url: &str,
        token: Option<String>,
        timeout: Duration,
        base_repo: Option<Repo>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|_| GhiError::Config("token contains invalid characters".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("ghi/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            base_repo,
        })
    }

    /// POST one query and decode the envelope without judging `errors`.
    async fn send<V: Serialize + Send, R: DeserializeOwned>(
        &self,
        query: &str,
        variables: V,
    ) -> Result<GraphQLResponse<R>> {
        let request = GraphQLRequest { query, variables };
        let response = self.client.post(&self.api_url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GhiError::Http {
                status: status.as_u16(),
                url: self.api_url.clone(),
                message: http_error_message(&body),
            });
        }

        Ok(response.json().await?)
    }

    /// Execute a query/mutation; any GraphQL error fails the call.
    async fn execute<V: Serialize + Send, R: DeserializeOwned>(
        &self,
        query: &str,
        variables: V,
    ) -> Result<R> {
        let response: GraphQLResponse<R> = self.send(query, variables).await?;
        if !response.errors.is_empty() {
            return Err(api_error(&response.errors));
        }
        response.data.ok_or_else(|| GhiError::Api {
            message: "response carried no data".to_string(),
        })
    }

    #[instrument(skip_all, fields(repo = %repo, number = selector.number))]
    async fn fetch_one(
        &self,
        repo: &Repo,
        selector: &ResolvedSelector,
        lookup: &BTreeSet<LookupField>,
    ) -> Result<EntitySnapshot> {
        #[derive(Serialize)]
        struct Variables<'a> {
            owner: &'a str,
            name: &'a str,
            number: u64,
        }

        #[derive(Deserialize)]
        struct Response {
            repository: Option<RepositoryNode>,
        }

        #[derive(Deserialize)]
        struct RepositoryNode {
            #[serde(rename = "issueOrPullRequest")]
            entity: Option<EntityNode>,
        }

        let query = lookup_query(lookup);
        let variables = Variables {
            owner: &repo.owner,
            name: &repo.name,
            number: selector.number,
        };
        let response: GraphQLResponse<Response> = self.send(&query, variables).await?;

        let not_found = || GhiError::EntityNotFound {
            selector: selector.raw.clone(),
        };
        if response
            .errors
            .iter()
            .any(|err| err.kind.as_deref() == Some("NOT_FOUND"))
        {
            return Err(not_found());
        }
        if !response.errors.is_empty() {
            return Err(api_error(&response.errors));
        }

        let node = response
            .data
            .and_then(|data| data.repository)
            .and_then(|repository| repository.entity)
            .ok_or_else(not_found)?;
        debug!(url = %node.url, "fetched entity");
        Ok(node.into_snapshot())
    }

    async fn mutate(&self, mutation: &str, input: Value) -> Result<()> {
        let _: Value = self.execute(mutation, json!({ "input": input })).await?;
        Ok(())
    }
}

#[async_trait]
impl Fetcher for GithubClient {
    #[instrument(skip_all, fields(count = selectors.len()))]
    async fn fetch_entities(
        &self,
        selectors: &[String],
        lookup: &BTreeSet<LookupField>,
    ) -> Result<(Vec<EntitySnapshot>, Repo)> {
        let (repo, resolved) = resolve_selectors(selectors, self.base_repo.as_ref())?;
        let total = resolved.len();
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_LOOKUPS));
        let lookup = Arc::new(lookup.clone());
        let mut join_set = JoinSet::new();

        for (index, selector) in resolved.into_iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .expect("lookup semaphore is never closed");
            let client = self.clone();
            let repo = repo.clone();
            let lookup = Arc::clone(&lookup);
            join_set.spawn(async move {
                let outcome = client.fetch_one(&repo, &selector, &lookup).await;
                drop(permit);
                (index, outcome)
            });
        }

        let mut fetched: Vec<Option<Result<EntitySnapshot>>> = (0..total).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            let (index, outcome) = joined.map_err(|err| GhiError::Other(err.into()))?;
            fetched[index] = Some(outcome);
        }

        // Every slot is filled; the first failing selector in argument order
        // decides the error.
        let snapshots = fetched.into_iter().flatten().collect::<Result<Vec<_>>>()?;
        Ok((snapshots, repo))
    }
}

#[async_trait]
impl OptionsResolver for GithubClient {
    #[instrument(skip_all, fields(repo = %repo))]
    async fn fetch_options(&self, repo: &Repo, spec: &EditSpec) -> Result<SharedOptions> {
        #[derive(Serialize)]
        struct Variables<'a> {
            owner: &'a str,
            name: &'a str,
        }

        #[derive(Deserialize)]
        struct Response {
            viewer: Option<LoginNode>,
            repository: Option<OptionsNode>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct OptionsNode {
            assignable_users: Option<Connection<UserNode>>,
            labels: Option<Connection<IdNameNode>>,
            #[serde(rename = "projectsV2")]
            projects: Option<Connection<ProjectNode>>,
            milestones: Option<Connection<MilestoneNode>>,
        }

        let Some(query) = options_query(spec) else {
            debug!("no repository metadata needed");
            return Ok(SharedOptions::default());
        };

        let response: Response = self
            .execute(
                &query,
                Variables {
                    owner: &repo.owner,
                    name: &repo.name,
                },
            )
            .await?;
        let repository = response.repository.ok_or_else(|| GhiError::Api {
            message: format!("Could not resolve to a Repository with the name '{repo}'"),
        })?;

        let options = SharedOptions {
            assignable_users: nodes(repository.assignable_users)
                .map(|u| NamedRef::new(u.id, u.login))
                .collect(),
            labels: nodes(repository.labels)
                .map(|l| NamedRef::new(l.id, l.name))
                .collect(),
            projects: nodes(repository.projects)
                .map(|p| NamedRef::new(p.id, p.title))
                .collect(),
            milestones: nodes(repository.milestones)
                .map(|m| NamedRef::new(m.id, m.title))
                .collect(),
            viewer_login: response.viewer.map(|v| v.login),
        };
        debug!(
            users = options.assignable_users.len(),
            labels = options.labels.len(),
            projects = options.projects.len(),
            milestones = options.milestones.len(),
            "resolved repository metadata"
        );
        Ok(options)
    }
}

#[async_trait]
impl Updater for GithubClient {
    #[instrument(skip(self, edit, options))]
    async fn update(
        &self,
        entity_id: &str,
        is_pull_request: bool,
        edit: &EditSpec,
        options: &SharedOptions,
    ) -> Result<()> {
        if let Some(input) = update_input(entity_id, edit, options)? {
            let mutation = if is_pull_request {
                UPDATE_PULL_REQUEST
            } else {
                UPDATE_ISSUE
            };
            self.mutate(mutation, input).await?;
        }

        if edit.labels.edited {
            let add = options.label_ids(edit.labels.to_add())?;
            if !add.is_empty() {
                self.mutate(
                    ADD_LABELS,
                    json!({ "labelableId": entity_id, "labelIds": add }),
                )
                .await?;
            }
            let remove = options.label_ids(edit.labels.to_remove())?;
            if !remove.is_empty() {
                self.mutate(
                    REMOVE_LABELS,
                    json!({ "labelableId": entity_id, "labelIds": remove }),
                )
                .await?;
            }
        }

        if edit.projects.names.edited {
            for project_id in options.project_ids(edit.projects.names.to_add())? {
                self.mutate(
                    ADD_PROJECT_ITEM,
                    json!({ "projectId": project_id, "contentId": entity_id }),
                )
                .await?;
            }
            for project_id in options.project_ids(edit.projects.names.to_remove())? {
                let Some(item_id) = edit.projects.items.get(&project_id) else {
                    debug!(project_id, "entity has no item in project; skipping");
                    continue;
                };
                self.mutate(
                    DELETE_PROJECT_ITEM,
                    json!({ "projectId": project_id, "itemId": item_id }),
                )
                .await?;
            }
        }

        Ok(())
    }
}

const UPDATE_ISSUE: &str = r"
    mutation IssueUpdate($input: UpdateIssueInput!) {
        updateIssue(input: $input) { __typename }
    }
";

const UPDATE_PULL_REQUEST: &str = r"
    mutation PullRequestUpdate($input: UpdatePullRequestInput!) {
        updatePullRequest(input: $input) { __typename }
    }
";

const ADD_LABELS: &str = r"
    mutation LabelAdd($input: AddLabelsToLabelableInput!) {
        addLabelsToLabelable(input: $input) { __typename }
    }
";

const REMOVE_LABELS: &str = r"
    mutation LabelRemove($input: RemoveLabelsFromLabelableInput!) {
        removeLabelsFromLabelable(input: $input) { __typename }
    }
";

const ADD_PROJECT_ITEM: &str = r"
    mutation ProjectItemAdd($input: AddProjectV2ItemByIdInput!) {
        addProjectV2ItemById(input: $input) { __typename }
    }
";

const DELETE_PROJECT_ITEM: &str = r"
    mutation ProjectItemDelete($input: DeleteProjectV2ItemInput!) {
        deleteProjectV2Item(input: $input) { __typename }
    }
";

/// Input for `updateIssue` / `updatePullRequest`, or `None` when no field
/// that mutation covers was edited.
fn update_input(entity_id: &str, edit: &EditSpec, options: &SharedOptions) -> Result<Option<Value>> {
    let mut input = Map::new();

    if edit.title.edited {
        input.insert("title".into(), Value::from(edit.title.value.clone()));
    }
    if edit.body.edited {
        input.insert("body".into(), Value::from(edit.body.value.clone()));
    }
    if edit.assignees.edited {
        // The mutation replaces the whole set; "@me" may appear on either side.
        let expand = |logins: &BTreeSet<String>| -> BTreeSet<String> {
            logins
                .iter()
                .map(|login| options.expand_me(login).to_string())
                .collect()
        };
        let assignees = SetEdit {
            edited: true,
            add: expand(&edit.assignees.add),
            remove: expand(&edit.assignees.remove),
            default: edit.assignees.default.clone(),
        };
        let ids = options.assignee_ids(assignees.resolved().iter().map(String::as_str))?;
        input.insert("assigneeIds".into(), json!(ids));
    }
    if edit.milestone.edited {
        let id = options.milestone_id(&edit.milestone.value)?;
        input.insert("milestoneId".into(), json!(id));
    }

    if input.is_empty() {
        return Ok(None);
    }
    input.insert("id".into(), Value::from(entity_id));
    Ok(Some(Value::Object(input)))
}

fn api_error(errors: &[GraphQLError]) -> GhiError {
    let messages: Vec<&str> = errors.iter().map(|err| err.message.as_str()).collect();
    GhiError::Api {
        message: messages.join("; "),
    }
}

fn http_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body).map_or_else(
        |_| body.trim().chars().take(200).collect(),
        |parsed| parsed.message,
    )
}

fn lookup_query(fields: &BTreeSet<LookupField>) -> String {
    let mut selection = String::from("id number title body url");
    for field in fields {
        match field {
            LookupField::Assignees => {
                let _ = write!(selection, " assignees(first: {PAGE_SIZE}) {{ nodes {{ login }} }}");
            }
            LookupField::Labels => {
                let _ = write!(selection, " labels(first: {PAGE_SIZE}) {{ nodes {{ name }} }}");
            }
            LookupField::ProjectItems => {
                let _ = write!(
                    selection,
                    " projectItems(first: {PAGE_SIZE}) {{ nodes {{ id project {{ id title }} }} }}"
                );
            }
            LookupField::Milestone => selection.push_str(" milestone { title }"),
            LookupField::Id
            | LookupField::Number
            | LookupField::Title
            | LookupField::Body
            | LookupField::Url => {}
        }
    }

    format!(
        "query EntityLookup($owner: String!, $name: String!, $number: Int!) {{
            repository(owner: $owner, name: $name) {{
                issueOrPullRequest(number: $number) {{
                    __typename
                    ... on Issue {{ {selection} }}
                    ... on PullRequest {{ {selection} }}
                }}
            }}
        }}"
    )
}

fn options_query(spec: &EditSpec) -> Option<String> {
    let mut selection = String::new();
    if spec.assignees.edited {
        let _ = write!(
            selection,
            " assignableUsers(first: {PAGE_SIZE}) {{ nodes {{ id login }} }}"
        );
    }
    if spec.labels.edited {
        let _ = write!(selection, " labels(first: {PAGE_SIZE}) {{ nodes {{ id name }} }}");
    }
    if spec.projects.names.edited {
        let _ = write!(selection, " projectsV2(first: {PAGE_SIZE}) {{ nodes {{ id title }} }}");
    }
    if spec.milestone.edited {
        let _ = write!(
            selection,
            " milestones(first: {PAGE_SIZE}, states: [OPEN]) {{ nodes {{ id title }} }}"
        );
    }
    if selection.is_empty() {
        return None;
    }

    let viewer = if spec.assignees.edited {
        "viewer { login }"
    } else {
        ""
    };
    Some(format!(
        "query RepositoryOptions($owner: String!, $name: String!) {{
            {viewer}
            repository(owner: $owner, name: $name) {{ {selection} }}
        }}"
    ))
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    nodes: Vec<Option<T>>,
}

fn nodes<T>(connection: Option<Connection<T>>) -> impl Iterator<Item = T> {
    connection
        .into_iter()
        .flat_map(|c| c.nodes)
        .flatten()
}

#[derive(Debug, Deserialize)]
struct LoginNode {
    login: String,
}

#[derive(Debug, Deserialize)]
struct UserNode {
    id: String,
    login: String,
}

#[derive(Debug, Deserialize)]
struct IdNameNode {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct NameNode {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ProjectNode {
    id: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct MilestoneNode {
    id: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct TitleNode {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ProjectItemNode {
    id: String,
    project: ProjectNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityNode {
    #[serde(rename = "__typename")]
    typename: String,
    id: String,
    number: u64,
    title: String,
    #[serde(default)]
    body: String,
    url: String,
    #[serde(default)]
    assignees: Option<Connection<LoginNode>>,
    #[serde(default)]
    labels: Option<Connection<NameNode>>,
    #[serde(default)]
    project_items: Option<Connection<ProjectItemNode>>,
    #[serde(default)]
    milestone: Option<TitleNode>,
}

impl EntityNode {
    fn into_snapshot(self) -> EntitySnapshot {
        EntitySnapshot {
            kind: if self.typename == "PullRequest" {
                EntityKind::PullRequest
            } else {
                EntityKind::Issue
            },
            id: self.id,
            number: self.number,
            url: self.url,
            title: self.title,
            body: self.body,
            assignees: nodes(self.assignees).map(|a| a.login).collect(),
            labels: nodes(self.labels).map(|l| l.name).collect(),
            project_items: nodes(self.project_items)
                .map(|item| ProjectItem {
                    project_id: item.project.id,
                    project_title: item.project.title,
                    item_id: item.id,
                })
                .collect(),
            milestone: self.milestone.map(|m| m.title),
        }
    }
}
