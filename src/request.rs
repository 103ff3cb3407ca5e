//! Crawl work items.
//!
//! A [`Request`] describes one fetch-and-process unit: what kind of
//! resource it is, where it came from, and the traversal state it
//! inherited. While a document is processed the request records typed
//! links on it and accumulates follow-up requests in its outbox; the
//! orchestrator drains the outbox into the crawl queues afterwards.

use crate::document::{Document, Link, LinkTarget};
use crate::error::ProcessError;
use crate::kind::Kind;
use crate::policy::{Policy, ProcessAlways};
use crate::urn::Urn;
use http::header::LINK;
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

// context ------------------------------

/// Traversal state inherited from the parent request.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
pub struct Context {
    /// URN prefix this traversal builds identities under. Event trigger
    /// requests reuse the slot for the `owner/name` (or org) slug.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<Urn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<Relation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<Kind>,
    /// Advisory visibility marker set while walking a private repo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_type: Option<String>,
}

/// Brands every page of one relation traversal so consumers can detect
/// a coherent snapshot.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Relation {
    pub origin: Kind,
    pub name: String,
    #[serde(rename = "type")]
    pub element_type: Kind,
    pub guid: Uuid,
}

// end: context ------------------------------

/// Queue lane a follow-up request is destined for.
#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Copy, Clone, Debug, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Immediate,
    Soon,
    #[default]
    Normal,
}

/// HTTP metadata the fetcher captured with the document. The processor
/// only ever reads the `link` header.
#[derive(Clone, Debug, Default)]
pub struct ResponseInfo {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
}

impl ResponseInfo {
    pub fn with_link_header(value: &str) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = value.parse() {
            headers.insert(LINK, value);
        }
        Self { status: None, headers }
    }

    pub fn link_header(&self) -> Option<&str> {
        self.headers.get(LINK).and_then(|value| value.to_str().ok())
    }
}

/// Why a request was set aside instead of processed.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum SkipOutcome {
    NoHandler,
    Excluded,
}

#[derive(PartialEq, Clone, Debug)]
pub struct Skip {
    pub outcome: SkipOutcome,
    pub reason: String,
}

/// A follow-up request with its destination lane.
#[derive(Clone, Debug)]
pub struct Queued {
    pub priority: Priority,
    pub request: Request,
}

#[derive(Clone, Debug)]
pub struct Request {
    kind: Kind,
    url: String,
    pub context: Context,
    pub policy: Arc<dyn Policy>,
    pub document: Option<Document>,
    pub response: Option<ResponseInfo>,
    /// Raw event attached by discovery; stands in for a fetch.
    pub payload: Option<Value>,
    skip: Option<Skip>,
    outbox: Vec<Queued>,
}

impl Request {
    pub fn new(kind: Kind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            context: Context::default(),
            policy: Arc::new(ProcessAlways),
            document: None,
            response: None,
            payload: None,
            skip: None,
            outbox: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<Urn>) -> Self {
        self.context.qualifier = Some(qualifier.into());
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn Policy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_response(mut self, response: ResponseInfo) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_collection_type(&self) -> bool {
        self.kind.is_collection()
    }

    pub fn is_root_type(&self, kind: Kind) -> bool {
        kind.is_root()
    }

    pub fn document(&self) -> Result<&Document, ProcessError> {
        self.document.as_ref().ok_or(ProcessError::NoDocument(self.kind))
    }

    pub fn document_mut(&mut self) -> Result<&mut Document, ProcessError> {
        self.document.as_mut().ok_or(ProcessError::NoDocument(self.kind))
    }

    // qualifiers ------------------------------

    /// The URN prefix new identities build on: the recorded `self` href
    /// once one exists, the inherited context qualifier otherwise.
    pub fn qualifier(&self) -> Result<Urn, ProcessError> {
        self.qualifier_opt().ok_or_else(|| ProcessError::MissingField {
            kind: self.kind,
            field: "context.qualifier".to_owned(),
        })
    }

    fn qualifier_opt(&self) -> Option<Urn> {
        self.document
            .as_ref()
            .and_then(Document::self_href)
            .cloned()
            .or_else(|| self.context.qualifier.clone())
    }

    /// The qualifier inherited from the parent, ignoring any identity
    /// recorded on this document.
    pub fn inherited_qualifier(&self) -> Result<&Urn, ProcessError> {
        self.context.qualifier.as_ref().ok_or_else(|| ProcessError::MissingField {
            kind: self.kind,
            field: "context.qualifier".to_owned(),
        })
    }

    // end: qualifiers ------------------------------

    // link recorder ------------------------------

    /// Records `self = <qualifier>:<kind>:<document[key]>`.
    pub fn add_self_link(&mut self, key: &str) -> Result<Urn, ProcessError> {
        let qualifier = self.inherited_qualifier()?.clone();
        let id = self.require_id(key)?;
        let href = qualifier.child(self.kind.as_str(), id);
        self.link_self(href.clone())?;
        Ok(href)
    }

    /// Records `self = urn:<kind>:<document.id>` for root resources.
    pub fn add_root_self_link(&mut self) -> Result<Urn, ProcessError> {
        let id = self.require_id("id")?;
        let href = Urn::root(self.kind, id);
        self.link_self(href.clone())?;
        Ok(href)
    }

    pub fn link_self(&mut self, href: Urn) -> Result<(), ProcessError> {
        self.document_mut()?.set_link("self", Link::SelfLink { href });
        Ok(())
    }

    pub fn link_siblings(&mut self, href: Urn) -> Result<(), ProcessError> {
        self.document_mut()?.set_link("siblings", Link::Siblings { href });
        Ok(())
    }

    pub fn link_resource(
        &mut self,
        name: impl Into<String>,
        target: impl Into<LinkTarget>,
    ) -> Result<(), ProcessError> {
        self.document_mut()?.set_link(name, Link::Resource { href: target.into() });
        Ok(())
    }

    pub fn link_collection(
        &mut self,
        name: impl Into<String>,
        href: Urn,
    ) -> Result<(), ProcessError> {
        self.document_mut()?.set_link(name, Link::Collection { href });
        Ok(())
    }

    pub fn link_relation(&mut self, name: impl Into<String>, href: Urn) -> Result<(), ProcessError> {
        self.document_mut()?.set_link(name, Link::Relation { href });
        Ok(())
    }

    /// Reads a required string field off the document.
    pub fn require_str(&self, key: &str) -> Result<String, ProcessError> {
        self.document()?
            .str_field(key)
            .map(str::to_owned)
            .ok_or_else(|| ProcessError::MissingField { kind: self.kind, field: key.to_owned() })
    }

    /// Reads a required identifier off the document.
    pub fn require_id(&self, key: &str) -> Result<String, ProcessError> {
        self.document()?
            .id_field(key)
            .ok_or_else(|| ProcessError::MissingField { kind: self.kind, field: key.to_owned() })
    }

    // end: link recorder ------------------------------

    // skip marking ------------------------------

    /// Sets this request aside. Not an error; the caller sees it on the
    /// request. The first marking wins.
    pub fn mark_skip(&mut self, outcome: SkipOutcome, reason: impl Into<String>) {
        if self.skip.is_none() {
            self.skip = Some(Skip { outcome, reason: reason.into() });
        }
    }

    pub fn skipped(&self) -> Option<&Skip> {
        self.skip.as_ref()
    }

    // end: skip marking ------------------------------

    // queueing ------------------------------

    /// Derives a follow-up fetch that inherits the current qualifier.
    pub fn queue(&mut self, kind: Kind, url: impl Into<String>) {
        let context = Context {
            qualifier: self.qualifier_opt(),
            repo_type: self.context.repo_type.clone(),
            ..Context::default()
        };
        self.queue_with(Priority::Normal, kind, url.into(), context);
    }

    /// Derives a fetch for a globally keyed resource; no inherited state.
    pub fn queue_root(&mut self, kind: Kind, url: impl Into<String>) {
        self.queue_with(Priority::Normal, kind, url.into(), Context::default());
    }

    /// Derives a root-producing collection fetch.
    pub fn queue_roots(&mut self, kind: Kind, url: impl Into<String>, context: Context) {
        self.queue_with(Priority::Normal, kind, url.into(), context);
    }

    /// Derives a child fetch scoped under `qualifier`.
    pub fn queue_child(&mut self, kind: Kind, url: impl Into<String>, qualifier: Urn) {
        let context = Context {
            qualifier: Some(qualifier),
            repo_type: self.context.repo_type.clone(),
            ..Context::default()
        };
        self.queue_with(Priority::Normal, kind, url.into(), context);
    }

    /// Derives a child-producing collection fetch.
    pub fn queue_children(&mut self, kind: Kind, url: impl Into<String>, context: Context) {
        self.queue_with(Priority::Normal, kind, url.into(), context);
    }

    /// Derives a fetch for one element of the page being processed.
    pub fn queue_collection_element(&mut self, kind: Kind, url: impl Into<String>, qualifier: Urn) {
        self.queue_child(kind, url, qualifier);
    }

    /// Appends fully formed requests to the outbox on the given lane.
    pub fn queue_requests(&mut self, requests: Vec<Request>, priority: Priority) {
        for request in requests {
            self.push(priority, request);
        }
    }

    pub fn queue_with(&mut self, priority: Priority, kind: Kind, url: String, context: Context) {
        let request =
            Request::new(kind, url).with_context(context).with_policy(self.policy.clone());
        self.push(priority, request);
    }

    fn push(&mut self, priority: Priority, request: Request) {
        trace!(kind = %request.kind, url = %request.url, ?priority, "queueing follow-up");
        self.outbox.push(Queued { priority, request });
    }

    pub fn queued(&self) -> &[Queued] {
        &self.outbox
    }

    pub fn take_queued(&mut self) -> Vec<Queued> {
        std::mem::take(&mut self.outbox)
    }

    // end: queueing ------------------------------
}
