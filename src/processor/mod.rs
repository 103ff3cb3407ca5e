//! The document processor.
//!
//! `process` takes a request whose document was just fetched, records
//! the typed link graph on it, and derives the follow-up requests that
//! keep the crawl going. Handlers are resolved from the request type
//! (or its pagination shape), never from the document body.

mod events;
mod resources;

use crate::document::Document;
use crate::error::ProcessError;
use crate::kind::{EventKind, Kind};
use crate::request::{Context, Priority, Relation, Request, SkipOutcome};
use crate::store::Store;
use crate::urn::Urn;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// Current processor version. Documents stamped with an older version
/// are eligible for reprocessing.
pub const VERSION: u32 = 3;

#[derive(Clone, Debug)]
pub struct ProcessorOptions {
    /// Version stamped into `_metadata.version`.
    pub version: u32,
    /// Strip `files[].patch` from commits to bound storage.
    pub scrub_patches: bool,
    /// Concurrent store lookups during event discovery.
    pub lookup_concurrency: usize,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self { version: VERSION, scrub_patches: true, lookup_concurrency: 10 }
    }
}

pub struct Processor {
    store: Arc<dyn Store>,
    options: ProcessorOptions,
}

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
enum Route {
    Page(u32),
    Collection,
    Resource,
    Event(EventKind),
    EventTrigger,
    UpdateEvents,
}

impl Processor {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_options(store, ProcessorOptions::default())
    }

    pub fn with_options(store: Arc<dyn Store>, options: ProcessorOptions) -> Self {
        Self { store, options }
    }

    pub fn version(&self) -> u32 {
        self.options.version
    }

    /// Processes one fetched document: resolves a handler, records
    /// links, accumulates follow-up requests on the request's outbox,
    /// and stamps the metadata envelope. Skip markings are reported on
    /// the request, not as errors.
    pub async fn process(&self, request: &mut Request) -> Result<(), ProcessError> {
        let route = self.route(request)?;
        debug!(kind = %request.kind(), url = request.url(), ?route, "processing");

        if !self.policy_allows(request) {
            request.mark_skip(SkipOutcome::Excluded, "excluded by policy at this version");
            return Ok(());
        }

        // Event requests carry the full record from the events feed;
        // there was nothing to fetch.
        if matches!(route, Route::Event(_)) && request.document.is_none() {
            if let Some(payload) = request.payload.clone() {
                request.document = Some(Document::new(payload));
            }
        }

        match route {
            Route::Page(page) => self.page(page, request)?,
            Route::Collection => self.collection(request)?,
            Route::Resource => self.resource(request)?,
            Route::Event(kind) => self.event(kind, request)?,
            Route::EventTrigger => self.event_trigger(request)?,
            Route::UpdateEvents => self.update_events(request).await?,
        }

        if request.skipped().is_none() {
            if let Some(document) = request.document.as_mut() {
                document.metadata.version = Some(self.options.version);
                document.metadata.processed_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    fn policy_allows(&self, request: &Request) -> bool {
        let policy = request.policy.clone();
        policy.should_process(request, self.options.version)
    }

    /// Pagination shape wins over the declared type: a `page` query
    /// parameter routes to the page processor, a collection type to the
    /// collection processor, anything else to its per-type handler.
    fn route(&self, request: &Request) -> Result<Route, ProcessError> {
        let url = Url::parse(request.url())?;
        let page = url.query_pairs().find_map(|(key, value)| {
            (key == "page").then(|| value.into_owned())
        });
        if let Some(page) = page {
            let page = page.parse().map_err(|_| ProcessError::PageNumber(page))?;
            return Ok(Route::Page(page));
        }
        if request.is_collection_type() {
            return Ok(Route::Collection);
        }
        let route = match request.kind() {
            Kind::EventTrigger => Route::EventTrigger,
            Kind::UpdateEvents => Route::UpdateEvents,
            Kind::Event(kind) => Route::Event(kind),
            _ => Route::Resource,
        };
        Ok(route)
    }

    // pagination ------------------------------

    /// First page of a collection. Remaining pages go out on the `soon`
    /// lane before this page's elements are walked, so queue
    /// back-pressure is visible early.
    fn collection(&self, request: &mut Request) -> Result<(), ProcessError> {
        let link_header =
            request.response.as_ref().and_then(|r| r.link_header()).map(str::to_owned);
        if let Some(header) = link_header {
            let links = parse_link_header::parse_with_rel(&header)
                .map_err(|source| ProcessError::LinkHeader { header: header.clone(), source })?;
            if let Some(last) = links.get("last") {
                let last_page: u32 = last
                    .queries
                    .get("page")
                    .and_then(|page| page.parse().ok())
                    .ok_or_else(|| ProcessError::PageNumber(last.raw_uri.clone()))?;
                let base = {
                    let mut base = Url::parse(request.url())?;
                    base.set_query(None);
                    base
                };
                let pages = (2..=last_page)
                    .map(|page| {
                        Request::new(request.kind(), format!("{}?page={}&per_page=100", base, page))
                            .with_context(request.context.clone())
                            .with_policy(request.policy.clone())
                    })
                    .collect::<Vec<_>>();
                debug!(count = pages.len(), "queueing remaining pages");
                request.queue_requests(pages, Priority::Soon);
            }
        }
        self.page(1, request)
    }

    fn page(&self, page: u32, request: &mut Request) -> Result<(), ProcessError> {
        let qualifier = request.inherited_qualifier()?.clone();
        request.link_self(qualifier.join(request.kind()).join("page").join(page))?;

        let relation = request.context.relation.clone();
        let mut element_type = request.context.element_type;
        if let Some(relation) = &relation {
            self.process_relation(request, relation)?;
            element_type = Some(relation.element_type);
        }
        let element_type = element_type
            .or_else(|| request.kind().element_kind())
            .ok_or_else(|| ProcessError::MissingField {
                kind: request.kind(),
                field: "context.elementType".to_owned(),
            })?;

        let elements = request.document()?.elements().to_vec();
        for element in &elements {
            let url = element
                .get("url")
                .and_then(Value::as_str)
                .ok_or_else(|| ProcessError::MissingField {
                    kind: request.kind(),
                    field: "elements[].url".to_owned(),
                })?
                .to_owned();
            request.queue_collection_element(element_type, url, qualifier.clone());
        }
        Ok(())
    }

    // end: pagination ------------------------------

    // relations ------------------------------

    /// A page participating in a relation traversal. All pages of one
    /// traversal share the descriptor guid, so consumers can union the
    /// `unique` collections that carry it into a coherent snapshot.
    fn process_relation(
        &self,
        request: &mut Request,
        relation: &Relation,
    ) -> Result<(), ProcessError> {
        let qualifier = request.inherited_qualifier()?.clone();
        request.link_resource("origin", qualifier.clone())?;
        request.link_resource(relation.origin.as_str(), qualifier.clone())?;
        let pages = qualifier.join(&relation.name).join("pages");
        request.link_siblings(pages.clone())?;
        request.link_collection("unique", pages.join(relation.guid))?;

        let elements = request.document()?.elements().to_vec();
        let resources = elements
            .iter()
            .map(|element| {
                id_of(element)
                    .map(|id| Urn::root(relation.element_type, id))
                    .ok_or_else(|| ProcessError::MissingField {
                        kind: request.kind(),
                        field: "elements[].id".to_owned(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        request.link_resource("resources", resources)?;
        Ok(())
    }

    // end: relations ------------------------------

    // link helpers ------------------------------

    /// Singular reference to a globally keyed resource. Absent nested
    /// object with no overrides is a clean no-op.
    fn add_root(
        &self,
        request: &mut Request,
        name: &'static str,
        kind: Kind,
        overrides: Overrides,
    ) -> Result<(), ProcessError> {
        let nested = request.document()?.field(name).filter(|v| v.is_object()).cloned();
        if nested.is_none() && overrides.url.is_none() && overrides.urn.is_none() {
            return Ok(());
        }
        let urn = match overrides.urn {
            Some(urn) => urn,
            None => {
                let id = nested.as_ref().and_then(id_of).ok_or_else(|| {
                    ProcessError::MissingField {
                        kind: request.kind(),
                        field: format!("{}.id", name),
                    }
                })?;
                Urn::root(kind, id)
            }
        };
        let url = match overrides.url {
            Some(url) => url,
            None => nested.as_ref().and_then(url_of).ok_or_else(|| {
                ProcessError::MissingField { kind: request.kind(), field: format!("{}.url", name) }
            })?,
        };
        request.link_resource(name, urn)?;
        request.queue_root(kind, url);
        Ok(())
    }

    /// Singular reference to a child resource scoped under a qualifier.
    fn add_resource(
        &self,
        request: &mut Request,
        name: &'static str,
        kind: Kind,
        id: &str,
        overrides: Overrides,
    ) -> Result<(), ProcessError> {
        let qualifier = match overrides.qualifier {
            Some(qualifier) => qualifier,
            None => request.qualifier()?,
        };
        let urn = overrides.urn.unwrap_or_else(|| qualifier.child(name, id));
        let url = match overrides.url {
            Some(url) => url,
            None => self.url_field(request, name)?,
        };
        request.link_resource(name, urn)?;
        request.queue_child(kind, url, qualifier);
        Ok(())
    }

    /// Owned multi-resource set. Root element types produce root
    /// documents; everything else stays scoped under the qualifier.
    fn add_collection(
        &self,
        request: &mut Request,
        collection: Kind,
        element: Kind,
        overrides: Overrides,
    ) -> Result<(), ProcessError> {
        let name = collection.as_str();
        let qualifier = request.qualifier()?;
        let urn = overrides.urn.unwrap_or_else(|| qualifier.join(name));
        let url = match overrides.url {
            Some(url) => url,
            None => self.url_field(request, name)?,
        };
        request.link_collection(name, urn)?;
        let context = Context {
            qualifier: Some(qualifier),
            element_type: Some(element),
            repo_type: request.context.repo_type.clone(),
            ..Context::default()
        };
        if element.is_root() {
            request.queue_roots(collection, url, context);
        } else {
            request.queue_children(collection, url, context);
        }
        Ok(())
    }

    /// Non-owned association, traversed as one guid-branded snapshot.
    fn add_relation(
        &self,
        request: &mut Request,
        collection: Kind,
        element: Kind,
        overrides: Overrides,
    ) -> Result<(), ProcessError> {
        let name = collection.as_str();
        let qualifier = request.qualifier()?;
        let urn = overrides.urn.unwrap_or_else(|| qualifier.join(name));
        let url = match overrides.url {
            Some(url) => url,
            None => self.url_field(request, name)?,
        };
        let guid = Uuid::new_v4();
        request.link_relation(name, urn.join("pages").join(guid))?;
        let context = Context {
            qualifier: Some(qualifier),
            relation: Some(Relation {
                origin: request.kind(),
                name: name.to_owned(),
                element_type: element,
                guid,
            }),
            repo_type: request.context.repo_type.clone(),
            ..Context::default()
        };
        request.queue_roots(collection, url, context);
        Ok(())
    }

    fn url_field(&self, request: &Request, name: &str) -> Result<String, ProcessError> {
        let field = format!("{}_url", name);
        request
            .document()?
            .str_field(&field)
            .map(str::to_owned)
            .ok_or(ProcessError::MissingField { kind: request.kind(), field })
    }

    // end: link helpers ------------------------------
}

/// Optional URL/URN/qualifier overrides for the link helpers. A missing
/// nested field plus missing override is a well-defined no-op for root
/// references, never an exception.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    url: Option<String>,
    urn: Option<Urn>,
    qualifier: Option<Urn>,
}

impl Overrides {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self { url: Some(url.into()), ..Self::default() }
    }

    pub fn urn(urn: impl Into<Urn>) -> Self {
        Self { urn: Some(urn.into()), ..Self::default() }
    }

    pub fn and_urn(mut self, urn: impl Into<Urn>) -> Self {
        self.urn = Some(urn.into());
        self
    }

    pub fn and_qualifier(mut self, qualifier: impl Into<Urn>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }
}

fn id_of(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn url_of(value: &Value) -> Option<String> {
    value.get("url").and_then(Value::as_str).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Link, LinkTarget};
    use crate::policy::ProcessNothing;
    use crate::request::{Queued, ResponseInfo, SkipOutcome};
    use crate::store::MemoryStore;
    use serde_json::json;

    fn processor() -> Processor {
        Processor::new(Arc::new(MemoryStore::new()))
    }

    fn href(request: &Request, name: &str) -> String {
        match request.document().unwrap().link(name).unwrap() {
            Link::SelfLink { href }
            | Link::Siblings { href }
            | Link::Collection { href }
            | Link::Relation { href }
            | Link::Resource { href: LinkTarget::One(href) } => href.to_string(),
            Link::Resource { href: LinkTarget::Many(_) } => panic!("expected a single href"),
        }
    }

    fn queued_one<'a>(request: &'a Request, kind: Kind) -> &'a Queued {
        let mut matches = request.queued().iter().filter(|q| q.request.kind() == kind);
        let first = matches.next().expect("expected a queued request");
        assert!(matches.next().is_none(), "expected exactly one queued request");
        first
    }

    fn org_request() -> Request {
        Request::new(Kind::Org, "https://api.github.com/orgs/acme").with_document(Document::new(
            json!({
                "id": 7,
                "url": "https://api.github.com/orgs/acme",
                "repos_url": "https://api.github.com/orgs/acme/repos",
                "members_url": "https://api.github.com/orgs/acme/members{/member}",
            }),
        ))
    }

    // pagination (S1)

    #[tokio::test]
    async fn test_collection_queues_remaining_pages_soon() {
        let header = "<https://api.github.com/orgs/acme/repos?page=2&per_page=100>; rel=\"next\", \
                      <https://api.github.com/orgs/acme/repos?page=3&per_page=100>; rel=\"last\"";
        let mut request = Request::new(Kind::Repos, "https://api.github.com/orgs/acme/repos")
            .with_qualifier("urn:org:7")
            .with_response(ResponseInfo::with_link_header(header))
            .with_document(Document::new(json!([
                {"id": 1, "url": "https://api.github.com/repos/acme/widget"},
            ])));
        processor().process(&mut request).await.unwrap();

        // the current call processed page one
        assert_eq!("urn:org:7:repos:page:1", href(&request, "self"));

        // remaining pages went out first, on the soon lane
        let queued = request.queued();
        assert_eq!(Priority::Soon, queued[0].priority);
        assert_eq!(Priority::Soon, queued[1].priority);
        assert!(queued[0].request.url().ends_with("?page=2&per_page=100"));
        assert!(queued[1].request.url().ends_with("?page=3&per_page=100"));
        for page in &queued[..2] {
            assert_eq!(Kind::Repos, page.request.kind());
            assert_eq!(request.context, page.request.context);
        }

        // and the page elements after them
        let element = &queued[2];
        assert_eq!(Kind::Repo, element.request.kind());
        assert_eq!("https://api.github.com/repos/acme/widget", element.request.url());
        assert_eq!(Some(Urn::from("urn:org:7")), element.request.context.qualifier);
        assert_eq!(3, queued.len());
    }

    #[tokio::test]
    async fn test_collection_without_link_header_stays_single_page() {
        let mut request = Request::new(Kind::Repos, "https://api.github.com/orgs/acme/repos")
            .with_qualifier("urn:org:7")
            .with_document(Document::new(json!([])));
        processor().process(&mut request).await.unwrap();
        assert!(request.queued().is_empty());
        assert_eq!("urn:org:7:repos:page:1", href(&request, "self"));
    }

    // org (S2)

    #[tokio::test]
    async fn test_org_links_and_follow_ups() {
        let mut request = org_request();
        processor().process(&mut request).await.unwrap();

        assert_eq!("urn:org:7", href(&request, "self"));
        assert_eq!("urn:orgs", href(&request, "siblings"));
        assert_eq!("urn:user:7", href(&request, "user"));
        assert_eq!("urn:user:7:repos", href(&request, "repos"));

        // the org's user alias is fetched from the rewritten url
        let user = queued_one(&request, Kind::User);
        assert_eq!("https://api.github.com/users/acme", user.request.url());

        // repos is a root-producing collection scoped under the org
        let repos = queued_one(&request, Kind::Repos);
        assert_eq!("https://api.github.com/orgs/acme/repos", repos.request.url());
        assert_eq!(Some(Urn::from("urn:org:7")), repos.request.context.qualifier);
        assert_eq!(Some(Kind::Repo), repos.request.context.element_type);

        // members is a relation branded with a fresh guid
        let members = queued_one(&request, Kind::Members);
        assert_eq!("https://api.github.com/orgs/acme/members", members.request.url());
        let relation = members.request.context.relation.clone().unwrap();
        assert_eq!(Kind::Org, relation.origin);
        assert_eq!("members", relation.name);
        assert_eq!(Kind::User, relation.element_type);
        assert_eq!(
            format!("urn:org:7:members:pages:{}", relation.guid),
            href(&request, "members")
        );

        // metadata was stamped
        let metadata = &request.document().unwrap().metadata;
        assert_eq!(Some(VERSION), metadata.version);
        assert!(metadata.processed_at.is_some());
    }

    // commit (S3)

    #[tokio::test]
    async fn test_commit_keys_off_sha_and_scrubs_patches() {
        let mut request =
            Request::new(Kind::Commit, "https://api.github.com/repos/acme/widget/commits/abc")
                .with_qualifier("urn:repo:42")
                .with_document(Document::new(json!({
                    "sha": "abc",
                    "url": "https://api.github.com/repos/acme/widget/commits/abc",
                    "author": {"id": 1, "url": "https://api.github.com/users/a"},
                    "committer": {"id": 2, "url": "https://api.github.com/users/b"},
                    "files": [
                        {"filename": "a.rs", "patch": "@@ -1 +1 @@"},
                        {"filename": "b.rs", "patch": "@@ -2 +2 @@"},
                    ],
                })));
        processor().process(&mut request).await.unwrap();

        assert_eq!("urn:repo:42:commit:abc", href(&request, "self"));
        assert_eq!("urn:repo:42:commits", href(&request, "siblings"));
        // repo root keeps the qualifier as its urn, fetched from the trimmed url
        assert_eq!("urn:repo:42", href(&request, "repo"));
        let repo = queued_one(&request, Kind::Repo);
        assert_eq!("https://api.github.com/repos/acme/widget", repo.request.url());

        let files = request.document().unwrap().field("files").unwrap().as_array().unwrap();
        assert!(files.iter().all(|file| file.get("patch").is_none()));
    }

    #[tokio::test]
    async fn test_patch_scrubbing_is_a_toggle() {
        let options = ProcessorOptions { scrub_patches: false, ..ProcessorOptions::default() };
        let processor = Processor::with_options(Arc::new(MemoryStore::new()), options);
        let mut request =
            Request::new(Kind::Commit, "https://api.github.com/repos/acme/widget/commits/abc")
                .with_qualifier("urn:repo:42")
                .with_document(Document::new(json!({
                    "sha": "abc",
                    "url": "https://api.github.com/repos/acme/widget/commits/abc",
                    "files": [{"filename": "a.rs", "patch": "@@ -1 +1 @@"}],
                })));
        processor.process(&mut request).await.unwrap();
        let files = request.document().unwrap().field("files").unwrap().as_array().unwrap();
        assert!(files[0].get("patch").is_some());
    }

    // issue (S4)

    #[tokio::test]
    async fn test_issue_assignees_and_pull_request_twin() {
        let mut request =
            Request::new(Kind::Issue, "https://api.github.com/repos/acme/widget/issues/11")
                .with_qualifier("urn:repo:42")
                .with_document(Document::new(json!({
                    "id": 11,
                    "assignees": [{"id": 1}, {"id": 2}],
                    "repository_url": "https://api.github.com/repos/acme/widget",
                    "comments_url": "https://api.github.com/repos/acme/widget/issues/11/comments",
                    "pull_request": {"url": "https://api.github.com/repos/acme/widget/pulls/900"},
                })));
        processor().process(&mut request).await.unwrap();

        assert_eq!("urn:repo:42:issue:11", href(&request, "self"));
        assert_eq!("urn:repo:42:issues", href(&request, "siblings"));

        // one resource link carrying every assignee urn
        match request.document().unwrap().link("assignees").unwrap() {
            Link::Resource { href: LinkTarget::Many(urns) } => {
                assert_eq!(
                    vec![Urn::from("urn:user:1"), Urn::from("urn:user:2")],
                    urns.clone()
                );
            }
            other => panic!("expected an array resource link, was {:?}", other),
        }

        // the twin is keyed by the issue id, not the pull's own
        assert_eq!("urn:repo:42:pull_request:11", href(&request, "pull_request"));
        let pull = queued_one(&request, Kind::PullRequest);
        assert_eq!("https://api.github.com/repos/acme/widget/pulls/900", pull.request.url());
        assert_eq!(Some(Urn::from("urn:repo:42")), pull.request.context.qualifier);

        assert_eq!(
            "urn:repo:42:issue:11:issue_comments",
            href(&request, "issue_comments")
        );
    }

    // pull request

    #[tokio::test]
    async fn test_pull_request_sides_statuses_and_issue_twin() {
        let mut request =
            Request::new(Kind::PullRequest, "https://api.github.com/repos/acme/widget/pulls/100")
                .with_qualifier("urn:repo:42")
                .with_document(Document::new(json!({
                    "id": 100,
                    "user": {"id": 5, "url": "https://api.github.com/users/e"},
                    "head": {
                        "sha": "abc",
                        "repo": {"id": 43, "url": "https://api.github.com/repos/fork/widget"},
                    },
                    "base": {
                        "sha": "def",
                        "repo": {"id": 42, "url": "https://api.github.com/repos/acme/widget"},
                    },
                    "review_comments_url":
                        "https://api.github.com/repos/acme/widget/pulls/100/comments",
                    "statuses_url": "https://api.github.com/repos/acme/widget/statuses/abc",
                    "commits_url": "https://api.github.com/repos/acme/widget/pulls/100/commits",
                    "_links": {
                        "issue": {"href": "https://api.github.com/repos/acme/widget/issues/100"},
                        "comments": {
                            "href": "https://api.github.com/repos/acme/widget/issues/100/comments"
                        },
                    },
                })));
        processor().process(&mut request).await.unwrap();

        assert_eq!("urn:repo:42:pull_request:100", href(&request, "self"));
        assert_eq!("urn:repo:42:pull_requests", href(&request, "siblings"));
        assert_eq!("urn:repo:43", href(&request, "head"));
        assert_eq!("urn:repo:42", href(&request, "base"));
        // statuses pin their urn to the head commit
        assert_eq!("urn:repo:42:commit:abc:statuses", href(&request, "statuses"));
        assert_eq!(
            "urn:repo:42:issue:100:issue_comments",
            href(&request, "issue_comments")
        );
        assert_eq!("urn:repo:42:issue:100", href(&request, "issue"));

        let issue = queued_one(&request, Kind::Issue);
        assert_eq!("https://api.github.com/repos/acme/widget/issues/100", issue.request.url());
        // both sides queue root repo fetches
        let repos: Vec<_> = request
            .queued()
            .iter()
            .filter(|q| q.request.kind() == Kind::Repo)
            .map(|q| q.request.url())
            .collect();
        assert_eq!(
            vec![
                "https://api.github.com/repos/fork/widget",
                "https://api.github.com/repos/acme/widget",
            ],
            repos
        );
    }

    // relations

    #[tokio::test]
    async fn test_relation_pages_share_guid_and_siblings() {
        let mut org = org_request();
        processor().process(&mut org).await.unwrap();
        let members = queued_one(&org, Kind::Members).request.clone();
        let guid = members.context.relation.clone().unwrap().guid;

        let mut first = members.clone().with_document(Document::new(json!([
            {"id": 1, "url": "https://api.github.com/users/a"},
        ])));
        processor().process(&mut first).await.unwrap();

        let mut second = Request::new(
            Kind::Members,
            format!("{}?page=2&per_page=100", members.url()),
        )
        .with_context(members.context.clone())
        .with_document(Document::new(json!([
            {"id": 2, "url": "https://api.github.com/users/b"},
        ])));
        processor().process(&mut second).await.unwrap();

        assert_eq!("urn:org:7:members:page:1", href(&first, "self"));
        assert_eq!("urn:org:7:members:page:2", href(&second, "self"));
        // every page of one traversal shares the snapshot identity
        let unique = format!("urn:org:7:members:pages:{}", guid);
        assert_eq!(unique, href(&first, "unique"));
        assert_eq!(unique, href(&second, "unique"));
        assert_eq!("urn:org:7:members:pages", href(&first, "siblings"));
        assert_eq!(href(&first, "siblings"), href(&second, "siblings"));
        // origin links name the traversal qualifier both ways
        assert_eq!("urn:org:7", href(&first, "origin"));
        assert_eq!("urn:org:7", href(&first, "org"));

        match first.document().unwrap().link("resources").unwrap() {
            Link::Resource { href: LinkTarget::Many(urns) } => {
                assert_eq!(vec![Urn::from("urn:user:1")], urns.clone());
            }
            other => panic!("expected an array resource link, was {:?}", other),
        }
    }

    // policy gating

    #[tokio::test]
    async fn test_excluded_requests_stay_untouched() {
        let mut request = org_request().with_policy(Arc::new(ProcessNothing));
        processor().process(&mut request).await.unwrap();

        assert_eq!(SkipOutcome::Excluded, request.skipped().unwrap().outcome);
        assert!(request.queued().is_empty());
        let metadata = &request.document().unwrap().metadata;
        assert!(metadata.links.is_empty());
        assert_eq!(None, metadata.version);
    }

    // determinism

    #[tokio::test]
    async fn test_processing_is_deterministic() {
        let make = || {
            Request::new(Kind::User, "https://api.github.com/users/octocat").with_document(
                Document::new(json!({
                    "id": 9,
                    "url": "https://api.github.com/users/octocat",
                    "repos_url": "https://api.github.com/users/octocat/repos",
                })),
            )
        };
        let mut a = make();
        let mut b = make();
        processor().process(&mut a).await.unwrap();
        processor().process(&mut b).await.unwrap();

        assert_eq!(
            a.document().unwrap().metadata.links,
            b.document().unwrap().metadata.links
        );
        let shape = |request: &Request| {
            request
                .queued()
                .iter()
                .map(|q| {
                    (q.priority, q.request.kind(), q.request.url().to_owned(), q.request.context.clone())
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&a), shape(&b));
    }

    // failure semantics

    #[tokio::test]
    async fn test_missing_required_field_fails_loudly() {
        // org without members_url: no urn is fabricated
        let mut request = Request::new(Kind::Org, "https://api.github.com/orgs/acme")
            .with_document(Document::new(json!({
                "id": 7,
                "url": "https://api.github.com/orgs/acme",
                "repos_url": "https://api.github.com/orgs/acme/repos",
            })));
        let err = processor().process(&mut request).await.unwrap_err();
        assert_eq!("org document is missing required field `members_url`", err.to_string());
    }

    #[tokio::test]
    async fn test_missing_document_fails() {
        let mut request = Request::new(Kind::Org, "https://api.github.com/orgs/acme");
        let err = processor().process(&mut request).await.unwrap_err();
        assert!(matches!(err, ProcessError::NoDocument(Kind::Org)));
    }
}
