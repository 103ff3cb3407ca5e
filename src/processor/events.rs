//! Event ingestion.
//!
//! The crawler is pull-based against the Events API: a trigger request
//! polls an org or repo feed, discovery filters the page down to events
//! the store has never seen, and each new event becomes a request of
//! its own whose payload stands in for a fetch.

use super::{id_of, url_of, Overrides, Processor};
use crate::error::ProcessError;
use crate::kind::{EventKind, Kind};
use crate::request::{Priority, Request};
use crate::templates;
use crate::urn::Urn;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::debug;

const API_BASE: &str = "https://api.github.com";

/// What every event carries: the repo id when repo-scoped, and the raw
/// payload to expand.
struct EventBasics {
    repo: Option<String>,
    payload: Value,
}

impl Processor {
    /// Synthesizes the events-feed poll for the org or `owner/name`
    /// slug in the qualifier slot and queues it ahead of everything.
    pub(super) fn event_trigger(&self, request: &mut Request) -> Result<(), ProcessError> {
        let slug = request.inherited_qualifier()?.as_str().to_owned();
        let url = if slug.contains('/') {
            format!("{}/repos/{}/events", API_BASE, slug)
        } else {
            format!("{}/orgs/{}/events", API_BASE, slug)
        };
        debug!(%slug, url, "triggering events poll");
        let poll = Request::new(Kind::UpdateEvents, url).with_policy(request.policy.clone());
        request.queue_requests(vec![poll], Priority::Immediate);
        Ok(())
    }

    /// One page of the events feed. Only events whose URL yields no
    /// etag from the store spawn processing requests; the rest were
    /// already ingested. Store lookups run concurrently but bounded,
    /// and the request is not complete until the sweep is.
    pub(super) async fn update_events(&self, request: &mut Request) -> Result<(), ProcessError> {
        let events = request.document()?.elements().to_vec();
        let sweep = stream::iter(events.into_iter().map(|event| {
            let store = self.store.clone();
            async move {
                let url = event.get("url").and_then(Value::as_str).map(str::to_owned).ok_or_else(
                    || ProcessError::MissingField {
                        kind: Kind::UpdateEvents,
                        field: "elements[].url".to_owned(),
                    },
                )?;
                let kind = match event.get("type").and_then(Value::as_str) {
                    Some(name) => match name.parse::<EventKind>() {
                        Ok(kind) => kind,
                        Err(_) => {
                            debug!(name, url, "dropping unknown event type");
                            return Ok(None);
                        }
                    },
                    None => {
                        return Err(ProcessError::MissingField {
                            kind: Kind::UpdateEvents,
                            field: "elements[].type".to_owned(),
                        })
                    }
                };
                let etag = store.etag(Kind::Event(kind), &url).await?;
                Ok::<_, ProcessError>(etag.is_none().then(|| (kind, url, event)))
            }
        }))
        .buffered(self.options.lookup_concurrency)
        .collect::<Vec<_>>()
        .await;

        let mut discovered = Vec::new();
        for outcome in sweep {
            if let Some((kind, url, event)) = outcome? {
                discovered.push(
                    Request::new(Kind::Event(kind), url)
                        .with_policy(request.policy.clone())
                        .with_payload(event),
                );
            }
        }
        debug!(count = discovered.len(), "discovered new events");
        request.queue_requests(discovered, Priority::Normal);
        Ok(())
    }

    pub(super) fn event(
        &self,
        kind: EventKind,
        request: &mut Request,
    ) -> Result<(), ProcessError> {
        use EventKind::*;
        match kind {
            Create | Delete | Gollum | Label | Public | Push => self.basic_event(request),
            CommitComment => self.commit_comment_event(request),
            Deployment => self.deployment_event(request),
            DeploymentStatus => self.deployment_status_event(request),
            Fork => self.fork_event(request),
            IssueComment => self.issue_comment_event(request),
            Issues => self.issues_event(request),
            Member => self.member_event(request),
            Membership => self.membership_event(request),
            Milestone => self.milestone_event(request),
            PageBuild => self.page_build_event(request),
            PullRequest => self.pull_request_event(request),
            PullRequestReview => self.pull_request_review_event(request),
            PullRequestReviewComment => self.pull_request_review_comment_event(request),
        }
    }

    /// Records identity and siblings under the event's repo (or org)
    /// scope and links the actors every event carries. The scope
    /// becomes the request qualifier so payload expansions inherit it.
    fn add_event_basics(&self, request: &mut Request) -> Result<EventBasics, ProcessError> {
        let repo = request.document()?.field("repo").and_then(id_of);
        let scope = match &repo {
            Some(repo) => Urn::root(Kind::Repo, repo),
            None => {
                let org = request.document()?.field("org").and_then(id_of).ok_or_else(|| {
                    ProcessError::MissingField {
                        kind: request.kind(),
                        field: "org.id".to_owned(),
                    }
                })?;
                Urn::root(Kind::Org, org)
            }
        };
        let id = request.require_id("id")?;
        request.link_self(scope.join(request.kind()).join(id))?;
        request.link_siblings(scope.join(request.kind()))?;
        request.context.qualifier = Some(scope);

        self.add_root(request, "actor", Kind::User, Overrides::none())?;
        self.add_root(request, "repo", Kind::Repo, Overrides::none())?;
        self.add_root(request, "org", Kind::Org, Overrides::none())?;

        let payload = request.document()?.field("payload").cloned().unwrap_or(Value::Null);
        Ok(EventBasics { repo, payload })
    }

    /// Links one payload resource and queues its fetch. Repo-scoped
    /// events key the resource under the repo; the rest key it by the
    /// target type alone.
    fn add_event_resource(
        &self,
        request: &mut Request,
        repo: Option<&str>,
        name: &'static str,
        kind: Kind,
    ) -> Result<(), ProcessError> {
        let id = payload_id(request, name)?;
        let urn = match repo {
            Some(repo) => Urn::root(Kind::Repo, repo).child(name, &id),
            None => Urn::root(kind, &id),
        };
        let url = payload_url(request, name)?;
        request.link_resource(name, urn)?;
        if kind.is_root() {
            request.queue_root(kind, url);
        } else {
            let qualifier = request.inherited_qualifier()?.clone();
            request.queue_child(kind, url, qualifier);
        }
        Ok(())
    }

    fn basic_event(&self, request: &mut Request) -> Result<(), ProcessError> {
        self.add_event_basics(request)?;
        Ok(())
    }

    fn commit_comment_event(&self, request: &mut Request) -> Result<(), ProcessError> {
        let basics = self.add_event_basics(request)?;
        self.add_event_resource(request, basics.repo.as_deref(), "comment", Kind::Comment)
    }

    fn deployment_event(&self, request: &mut Request) -> Result<(), ProcessError> {
        let basics = self.add_event_basics(request)?;
        self.add_event_resource(request, basics.repo.as_deref(), "deployment", Kind::Deployment)
    }

    fn deployment_status_event(&self, request: &mut Request) -> Result<(), ProcessError> {
        let basics = self.add_event_basics(request)?;
        let repo = require_repo(request, &basics)?;
        let deployment_id = payload_id(request, "deployment")?;
        let status_id = payload_id(request, "deployment_status")?;
        request.link_resource(
            "deployment_status",
            Urn::root(Kind::Repo, &repo)
                .child("deployment", deployment_id)
                .child("status", status_id),
        )?;
        self.add_event_resource(request, Some(&repo), "deployment", Kind::Deployment)
    }

    fn fork_event(&self, request: &mut Request) -> Result<(), ProcessError> {
        let basics = self.add_event_basics(request)?;
        self.add_event_resource(request, basics.repo.as_deref(), "forkee", Kind::Repo)
    }

    fn issue_comment_event(&self, request: &mut Request) -> Result<(), ProcessError> {
        let basics = self.add_event_basics(request)?;
        self.add_event_resource(request, basics.repo.as_deref(), "issue", Kind::Issue)?;
        self.add_event_resource(request, basics.repo.as_deref(), "comment", Kind::IssueComment)
    }

    fn issues_event(&self, request: &mut Request) -> Result<(), ProcessError> {
        let basics = self.add_event_basics(request)?;
        self.add_event_resource(request, basics.repo.as_deref(), "issue", Kind::Issue)
    }

    fn member_event(&self, request: &mut Request) -> Result<(), ProcessError> {
        let basics = self.add_event_basics(request)?;
        self.add_event_resource(request, basics.repo.as_deref(), "member", Kind::User)
    }

    /// Membership changes belong to a team, not the org feed they
    /// arrive on, so identity is rewritten team-scoped.
    fn membership_event(&self, request: &mut Request) -> Result<(), ProcessError> {
        self.add_event_basics(request)?;
        let team_id = payload_id(request, "team")?;
        let id = request.require_id("id")?;
        request.link_self(
            Urn::root(Kind::Team, team_id).join(request.kind()).join(id),
        )?;
        self.add_event_resource(request, None, "member", Kind::User)?;
        self.add_event_resource(request, None, "team", Kind::Team)?;
        self.add_event_resource(request, None, "organization", Kind::Org)
    }

    fn milestone_event(&self, request: &mut Request) -> Result<(), ProcessError> {
        let basics = self.add_event_basics(request)?;
        self.add_event_resource(request, basics.repo.as_deref(), "milestone", Kind::Milestone)
    }

    fn page_build_event(&self, request: &mut Request) -> Result<(), ProcessError> {
        let basics = self.add_event_basics(request)?;
        let repo = require_repo(request, &basics)?;
        let id = match basics.payload.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(ProcessError::MissingField {
                    kind: request.kind(),
                    field: "payload.id".to_owned(),
                })
            }
        };
        let url = basics
            .payload
            .get("build")
            .and_then(url_of)
            .ok_or_else(|| ProcessError::MissingField {
                kind: request.kind(),
                field: "payload.build.url".to_owned(),
            })?;
        request.link_resource("page_build", Urn::root(Kind::Repo, &repo).child("page_build", id))?;
        let qualifier = request.inherited_qualifier()?.clone();
        request.queue_child(Kind::PageBuild, url, qualifier);
        Ok(())
    }

    fn pull_request_event(&self, request: &mut Request) -> Result<(), ProcessError> {
        let basics = self.add_event_basics(request)?;
        self.add_event_resource(request, basics.repo.as_deref(), "pull_request", Kind::PullRequest)
    }

    fn pull_request_review_event(&self, request: &mut Request) -> Result<(), ProcessError> {
        let basics = self.add_event_basics(request)?;
        let repo = require_repo(request, &basics)?;
        let scope = Urn::root(Kind::Repo, &repo);
        let pull_id = payload_id(request, "pull_request")?;
        let review_id = payload_id(request, "review")?;
        request
            .link_resource("review", scope.child("pull", &pull_id).child("review", &review_id))?;
        let comments_url = basics
            .payload
            .get("pull_request")
            .and_then(|pull| pull.get("review_comment_url"))
            .and_then(Value::as_str)
            .ok_or_else(|| ProcessError::MissingField {
                kind: request.kind(),
                field: "payload.pull_request.review_comment_url".to_owned(),
            })?;
        request.queue_child(
            Kind::PullReview,
            templates::fill_number(comments_url, &review_id),
            scope.clone(),
        );
        request.link_resource("pull", scope.child("pull", &pull_id))?;
        let pull_url = payload_url(request, "pull_request")?;
        request.queue_child(Kind::Pull, pull_url, scope);
        Ok(())
    }

    fn pull_request_review_comment_event(
        &self,
        request: &mut Request,
    ) -> Result<(), ProcessError> {
        let basics = self.add_event_basics(request)?;
        let repo = require_repo(request, &basics)?;
        let scope = Urn::root(Kind::Repo, &repo);
        let pull_id = payload_id(request, "pull_request")?;
        let comment_id = payload_id(request, "comment")?;
        request
            .link_resource("comment", scope.child("pull", &pull_id).child("comment", comment_id))?;
        let comment_url = payload_url(request, "comment")?;
        request.queue_child(Kind::PullComment, comment_url, scope.clone());
        request.link_resource("pull", scope.child("pull", &pull_id))?;
        let pull_url = payload_url(request, "pull_request")?;
        request.queue_child(Kind::Pull, pull_url, scope);
        Ok(())
    }
}

fn require_repo(request: &Request, basics: &EventBasics) -> Result<String, ProcessError> {
    basics.repo.clone().ok_or_else(|| ProcessError::MissingField {
        kind: request.kind(),
        field: "repo.id".to_owned(),
    })
}

fn payload_value(request: &Request, name: &str) -> Result<Value, ProcessError> {
    request
        .document()?
        .field("payload")
        .and_then(|payload| payload.get(name))
        .cloned()
        .ok_or_else(|| ProcessError::MissingField {
            kind: request.kind(),
            field: format!("payload.{}", name),
        })
}

fn payload_id(request: &Request, name: &str) -> Result<String, ProcessError> {
    let value = payload_value(request, name)?;
    id_of(&value).ok_or_else(|| ProcessError::MissingField {
        kind: request.kind(),
        field: format!("payload.{}.id", name),
    })
}

fn payload_url(request: &Request, name: &str) -> Result<String, ProcessError> {
    let value = payload_value(request, name)?;
    url_of(&value).ok_or_else(|| ProcessError::MissingField {
        kind: request.kind(),
        field: format!("payload.{}.url", name),
    })
}
