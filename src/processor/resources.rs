//! Per-resource-type handlers.
//!
//! Every handler records identity (`self`) and `siblings` first, then
//! declares the document's outgoing references through the link helpers
//! in the parent module. Optional fields that are absent produce no
//! link and no fetch; required fields that are absent are an error.

use super::{id_of, url_of, Overrides, Processor};
use crate::error::ProcessError;
use crate::kind::Kind;
use crate::request::{Request, SkipOutcome};
use crate::templates;
use crate::urn::Urn;
use serde_json::Value;

impl Processor {
    pub(super) fn resource(&self, request: &mut Request) -> Result<(), ProcessError> {
        use Kind::*;
        match request.kind() {
            Org => self.org(request),
            User => self.user(request),
            Repo => self.repo(request),
            Team => self.team(request),
            Commit => self.commit(request),
            PullRequest | Pull => self.pull_request(request),
            Issue => self.issue(request),
            IssueComment => self.issue_comment(request),
            ReviewComment | PullComment => self.review_comment(request),
            PullReview => self.review(request),
            Comment => self.commit_comment(request),
            Deployment => self.deployment(request),
            Status => self.status(request),
            Milestone => self.milestone(request),
            PageBuild => self.page_build(request),
            other => {
                request.mark_skip(
                    SkipOutcome::NoHandler,
                    format!("no handler for request type `{}`", other),
                );
                Ok(())
            }
        }
    }

    fn org(&self, request: &mut Request) -> Result<(), ProcessError> {
        request.add_root_self_link()?;
        request.link_siblings(Urn::global(Kind::Orgs))?;
        let id = request.require_id("id")?;
        let url = request.require_str("url")?;
        let members_url = templates::strip(&request.require_str("members_url")?);
        // orgs are also users as far as the API is concerned
        self.add_root(
            request,
            "user",
            Kind::User,
            Overrides::url(url.replace("/orgs/", "/users/")).and_urn(Urn::root(Kind::User, &id)),
        )?;
        self.add_collection(
            request,
            Kind::Repos,
            Kind::Repo,
            Overrides::urn(Urn::root(Kind::User, &id).join("repos")),
        )?;
        self.add_relation(request, Kind::Members, Kind::User, Overrides::url(members_url))?;
        Ok(())
    }

    fn user(&self, request: &mut Request) -> Result<(), ProcessError> {
        request.add_root_self_link()?;
        request.link_siblings(Urn::global(Kind::Users))?;
        self.add_collection(request, Kind::Repos, Kind::Repo, Overrides::none())?;
        Ok(())
    }

    fn repo(&self, request: &mut Request) -> Result<(), ProcessError> {
        request.add_root_self_link()?;
        let owner_id = request
            .document()?
            .field("owner")
            .and_then(id_of)
            .ok_or_else(|| ProcessError::MissingField {
                kind: request.kind(),
                field: "owner.id".to_owned(),
            })?;
        request.link_siblings(Urn::root(Kind::User, owner_id).join("repos"))?;

        // advisory marker inherited by everything queued below
        if request.document()?.field("private") == Some(&Value::Bool(true)) {
            request.context.repo_type = Some("private".to_owned());
        }

        // pull requests arrive via issues and events, so the collection
        // link exists but nothing is queued for it
        let qualifier = request.qualifier()?;
        request.link_collection("pull_requests", qualifier.join("pull_requests"))?;

        self.add_root(request, "owner", Kind::User, Overrides::none())?;
        self.add_root(request, "organization", Kind::Org, Overrides::none())?;
        self.add_relation(request, Kind::Teams, Kind::Team, Overrides::none())?;
        let collaborators_url = templates::strip(&request.require_str("collaborators_url")?);
        self.add_relation(
            request,
            Kind::Collaborators,
            Kind::User,
            Overrides::url(collaborators_url),
        )?;
        self.add_relation(request, Kind::Contributors, Kind::User, Overrides::none())?;
        self.add_relation(request, Kind::Subscribers, Kind::User, Overrides::none())?;
        let issues_url = templates::strip(&request.require_str("issues_url")?);
        self.add_collection(request, Kind::Issues, Kind::Issue, Overrides::url(issues_url))?;
        let commits_url = templates::strip(&request.require_str("commits_url")?);
        self.add_collection(request, Kind::Commits, Kind::Commit, Overrides::url(commits_url))?;
        Ok(())
    }

    fn commit(&self, request: &mut Request) -> Result<(), ProcessError> {
        let qualifier = request.inherited_qualifier()?.clone();
        request.add_self_link("sha")?;
        request.link_siblings(qualifier.join("commits"))?;

        let url = request.require_str("url")?;
        let repo_url = match url.find("/commits/") {
            Some(at) => url[..at].to_owned(),
            None => url,
        };
        self.add_root(
            request,
            "repo",
            Kind::Repo,
            Overrides::url(repo_url).and_urn(qualifier.clone()),
        )?;
        self.add_root(request, "author", Kind::User, Overrides::none())?;
        self.add_root(request, "committer", Kind::User, Overrides::none())?;

        if self.options.scrub_patches {
            scrub_patches(request)?;
        }
        Ok(())
    }

    fn pull_request(&self, request: &mut Request) -> Result<(), ProcessError> {
        let qualifier = request.inherited_qualifier()?.clone();
        request.add_self_link("id")?;
        request.link_siblings(qualifier.join("pull_requests"))?;

        self.add_root(request, "user", Kind::User, Overrides::none())?;
        self.add_root(request, "merged_by", Kind::User, Overrides::none())?;
        self.add_root(request, "assignee", Kind::User, Overrides::none())?;

        // head and base point at repos, possibly gone ones
        for name in ["head", "base"] {
            let repo = request
                .document()?
                .field(name)
                .and_then(|side| side.get("repo"))
                .filter(|repo| repo.is_object())
                .cloned();
            if let Some(repo) = repo {
                let id = id_of(&repo).ok_or_else(|| ProcessError::MissingField {
                    kind: request.kind(),
                    field: format!("{}.repo.id", name),
                })?;
                let url = url_of(&repo).ok_or_else(|| ProcessError::MissingField {
                    kind: request.kind(),
                    field: format!("{}.repo.url", name),
                })?;
                request.link_resource(name, Urn::root(Kind::Repo, id))?;
                request.queue_root(Kind::Repo, url);
            }
        }

        if request.document()?.str_field("review_comments_url").is_some() {
            self.add_collection(
                request,
                Kind::ReviewComments,
                Kind::ReviewComment,
                Overrides::none(),
            )?;
        }
        if let Some(statuses_url) = request.document()?.str_field("statuses_url").map(str::to_owned)
        {
            let head_sha = request
                .document()?
                .field("head")
                .and_then(|head| head.get("sha"))
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| ProcessError::MissingField {
                    kind: request.kind(),
                    field: "head.sha".to_owned(),
                })?;
            self.add_collection(
                request,
                Kind::Statuses,
                Kind::Status,
                Overrides::url(statuses_url)
                    .and_urn(qualifier.child("commit", head_sha).join("statuses")),
            )?;
        }
        if request.document()?.str_field("commits_url").is_some() {
            self.add_collection(request, Kind::Commits, Kind::Commit, Overrides::none())?;
        }

        // every pull request has an issue twin carrying its comments
        let issue_href = request
            .document()?
            .field("_links")
            .and_then(|links| links.get("issue"))
            .and_then(|issue| issue.get("href"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        if let Some(issue_href) = issue_href {
            let comments_href = request
                .document()?
                .field("_links")
                .and_then(|links| links.get("comments"))
                .and_then(|comments| comments.get("href"))
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| ProcessError::MissingField {
                    kind: request.kind(),
                    field: "_links.comments.href".to_owned(),
                })?;
            let id = request.require_id("id")?;
            self.add_collection(
                request,
                Kind::IssueComments,
                Kind::IssueComment,
                Overrides::url(comments_href)
                    .and_urn(qualifier.child("issue", &id).join("issue_comments")),
            )?;
            self.add_resource(
                request,
                "issue",
                Kind::Issue,
                &id,
                Overrides::url(issue_href).and_qualifier(qualifier.clone()),
            )?;
        }
        Ok(())
    }

    fn issue(&self, request: &mut Request) -> Result<(), ProcessError> {
        let qualifier = request.inherited_qualifier()?.clone();
        request.add_self_link("id")?;
        request.link_siblings(qualifier.join("issues"))?;

        let assignees =
            request.document()?.field("assignees").and_then(Value::as_array).cloned().unwrap_or_default();
        if !assignees.is_empty() {
            let urns = assignees
                .iter()
                .map(|assignee| {
                    id_of(assignee).map(|id| Urn::root(Kind::User, id)).ok_or_else(|| {
                        ProcessError::MissingField {
                            kind: request.kind(),
                            field: "assignees[].id".to_owned(),
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            request.link_resource("assignees", urns)?;
        }

        self.add_root(request, "user", Kind::User, Overrides::none())?;
        self.add_root(request, "assignee", Kind::User, Overrides::none())?;
        self.add_root(request, "closed_by", Kind::User, Overrides::none())?;
        let repository_url = request.require_str("repository_url")?;
        self.add_root(
            request,
            "repo",
            Kind::Repo,
            Overrides::url(repository_url).and_urn(qualifier.clone()),
        )?;
        let comments_url = request.require_str("comments_url")?;
        self.add_collection(
            request,
            Kind::IssueComments,
            Kind::IssueComment,
            Overrides::url(comments_url),
        )?;

        // issues opened as pull requests carry a twin reference keyed
        // by the issue id, not the pull request's own
        let pull_url = request
            .document()?
            .field("pull_request")
            .and_then(url_of);
        if let Some(pull_url) = pull_url {
            let id = request.require_id("id")?;
            self.add_resource(
                request,
                "pull_request",
                Kind::PullRequest,
                &id,
                Overrides::url(pull_url).and_qualifier(qualifier.clone()),
            )?;
        }
        Ok(())
    }

    fn issue_comment(&self, request: &mut Request) -> Result<(), ProcessError> {
        let qualifier = request.inherited_qualifier()?.clone();
        request.add_self_link("id")?;
        request.link_siblings(qualifier.join("issue_comments"))?;
        self.add_root(request, "user", Kind::User, Overrides::none())?;
        Ok(())
    }

    fn review_comment(&self, request: &mut Request) -> Result<(), ProcessError> {
        let qualifier = request.inherited_qualifier()?.clone();
        request.add_self_link("id")?;
        request.link_siblings(qualifier.join("review_comments"))?;
        self.add_root(request, "user", Kind::User, Overrides::none())?;
        Ok(())
    }

    fn review(&self, request: &mut Request) -> Result<(), ProcessError> {
        let qualifier = request.inherited_qualifier()?.clone();
        request.add_self_link("id")?;
        request.link_siblings(qualifier.join("reviews"))?;
        self.add_root(request, "user", Kind::User, Overrides::none())?;
        Ok(())
    }

    fn commit_comment(&self, request: &mut Request) -> Result<(), ProcessError> {
        let qualifier = request.inherited_qualifier()?.clone();
        request.add_self_link("id")?;
        request.link_siblings(qualifier.join("comments"))?;
        self.add_root(request, "user", Kind::User, Overrides::none())?;
        Ok(())
    }

    fn deployment(&self, request: &mut Request) -> Result<(), ProcessError> {
        let qualifier = request.inherited_qualifier()?.clone();
        request.add_self_link("id")?;
        request.link_siblings(qualifier.join("deployments"))?;
        self.add_root(request, "creator", Kind::User, Overrides::none())?;
        Ok(())
    }

    fn status(&self, request: &mut Request) -> Result<(), ProcessError> {
        let qualifier = request.inherited_qualifier()?.clone();
        request.add_self_link("id")?;
        request.link_siblings(qualifier.join("statuses"))?;
        self.add_root(request, "creator", Kind::User, Overrides::none())?;
        Ok(())
    }

    fn milestone(&self, request: &mut Request) -> Result<(), ProcessError> {
        let qualifier = request.inherited_qualifier()?.clone();
        request.add_self_link("id")?;
        request.link_siblings(qualifier.join("milestones"))?;
        self.add_root(request, "creator", Kind::User, Overrides::none())?;
        Ok(())
    }

    fn page_build(&self, request: &mut Request) -> Result<(), ProcessError> {
        let qualifier = request.inherited_qualifier()?.clone();
        request.add_self_link("id")?;
        request.link_siblings(qualifier.join("page_builds"))?;
        self.add_root(request, "pusher", Kind::User, Overrides::none())?;
        Ok(())
    }

    fn team(&self, request: &mut Request) -> Result<(), ProcessError> {
        request.add_root_self_link()?;
        let org_id = request
            .document()?
            .field("organization")
            .and_then(id_of)
            .ok_or_else(|| ProcessError::MissingField {
                kind: request.kind(),
                field: "organization.id".to_owned(),
            })?;
        request.link_siblings(Urn::root(Kind::Org, org_id).join("teams"))?;
        self.add_root(request, "organization", Kind::Org, Overrides::none())?;
        let members_url = templates::strip(&request.require_str("members_url")?);
        self.add_relation(request, Kind::Members, Kind::User, Overrides::url(members_url))?;
        let repositories_url = request.require_str("repositories_url")?;
        self.add_relation(request, Kind::Repos, Kind::Repo, Overrides::url(repositories_url))?;
        Ok(())
    }
}

/// Drops the `patch` field from every entry in `files` so commit
/// documents stay bounded in storage.
fn scrub_patches(request: &mut Request) -> Result<(), ProcessError> {
    if let Some(files) = request.document_mut()?.field_mut("files").and_then(Value::as_array_mut) {
        for file in files {
            if let Some(file) = file.as_object_mut() {
                file.remove("patch");
            }
        }
    }
    Ok(())
}
