//! Resource and event type enumerations.
//!
//! Request dispatch in the original crawler keyed handlers by bare
//! strings. Both sets of names form closed enumerations, so they are
//! spelled out here and round-trip through their wire strings.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The type of resource a request fetches and processes.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum Kind {
    // roots, globally keyed by id
    Org,
    User,
    Repo,
    Team,
    // children, keyed under a qualifier
    Commit,
    PullRequest,
    Issue,
    IssueComment,
    ReviewComment,
    Comment,
    Deployment,
    Status,
    Milestone,
    PageBuild,
    Pull,
    PullComment,
    PullReview,
    // collections
    Orgs,
    Users,
    Repos,
    Teams,
    Commits,
    PullRequests,
    Issues,
    IssueComments,
    ReviewComments,
    Statuses,
    Members,
    Collaborators,
    Contributors,
    Subscribers,
    // event ingestion
    EventTrigger,
    UpdateEvents,
    Event(EventKind),
}

impl Kind {
    /// Root types have URNs keyed by their id alone.
    pub fn is_root(&self) -> bool {
        matches!(self, Kind::Org | Kind::User | Kind::Repo | Kind::Team)
    }

    /// Collection types fetch pages of elements rather than one resource.
    pub fn is_collection(&self) -> bool {
        use Kind::*;
        matches!(
            self,
            Orgs | Users
                | Repos
                | Teams
                | Commits
                | PullRequests
                | Issues
                | IssueComments
                | ReviewComments
                | Statuses
                | Members
                | Collaborators
                | Contributors
                | Subscribers
        )
    }

    /// The singular kind a collection's elements fetch as, when the
    /// collection itself determines it. Relation sets (members,
    /// collaborators, ...) carry their element type in context instead.
    pub fn element_kind(&self) -> Option<Kind> {
        use Kind::*;
        let kind = match self {
            Orgs => Org,
            Users => User,
            Repos => Repo,
            Teams => Team,
            Commits => Commit,
            PullRequests => PullRequest,
            Issues => Issue,
            IssueComments => IssueComment,
            ReviewComments => ReviewComment,
            Statuses => Status,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &'static str {
        use Kind::*;
        match self {
            Org => "org",
            User => "user",
            Repo => "repo",
            Team => "team",
            Commit => "commit",
            PullRequest => "pull_request",
            Issue => "issue",
            IssueComment => "issue_comment",
            ReviewComment => "review_comment",
            Comment => "comment",
            Deployment => "deployment",
            Status => "status",
            Milestone => "milestone",
            PageBuild => "page_build",
            Pull => "pull",
            PullComment => "pull_comment",
            PullReview => "pull_review",
            Orgs => "orgs",
            Users => "users",
            Repos => "repos",
            Teams => "teams",
            Commits => "commits",
            PullRequests => "pull_requests",
            Issues => "issues",
            IssueComments => "issue_comments",
            ReviewComments => "review_comments",
            Statuses => "statuses",
            Members => "members",
            Collaborators => "collaborators",
            Contributors => "contributors",
            Subscribers => "subscribers",
            EventTrigger => "event_trigger",
            UpdateEvents => "update_events",
            Event(kind) => kind.as_str(),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Kind::*;
        let kind = match s {
            "org" => Org,
            "user" => User,
            "repo" => Repo,
            "team" => Team,
            "commit" => Commit,
            "pull_request" => PullRequest,
            "issue" => Issue,
            "issue_comment" => IssueComment,
            "review_comment" => ReviewComment,
            "comment" => Comment,
            "deployment" => Deployment,
            "status" => Status,
            "milestone" => Milestone,
            "page_build" => PageBuild,
            "pull" => Pull,
            "pull_comment" => PullComment,
            "pull_review" => PullReview,
            "orgs" => Orgs,
            "users" => Users,
            "repos" => Repos,
            "teams" => Teams,
            "commits" => Commits,
            "pull_requests" => PullRequests,
            "issues" => Issues,
            "issue_comments" => IssueComments,
            "review_comments" => ReviewComments,
            "statuses" => Statuses,
            "members" => Members,
            "collaborators" => Collaborators,
            "contributors" => Contributors,
            "subscribers" => Subscribers,
            "event_trigger" => EventTrigger,
            "update_events" => UpdateEvents,
            _ => match s.parse::<EventKind>() {
                Ok(x) => Event(x),
                Err(_) => {
                    return Err(ParseKindError(format!("unknown resource type, was `{}`", s)))
                }
            },
        };
        Ok(kind)
    }
}

impl Serialize for Kind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Kind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ParseKindError(String /* message */);

/// The closed set of GitHub Events API record types.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum EventKind {
    CommitComment,
    Create,
    Delete,
    Deployment,
    DeploymentStatus,
    Fork,
    Gollum,
    IssueComment,
    Issues,
    Label,
    Member,
    Membership,
    Milestone,
    PageBuild,
    Public,
    PullRequest,
    PullRequestReview,
    PullRequestReviewComment,
    Push,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        use EventKind::*;
        match self {
            CommitComment => "CommitCommentEvent",
            Create => "CreateEvent",
            Delete => "DeleteEvent",
            Deployment => "DeploymentEvent",
            DeploymentStatus => "DeploymentStatusEvent",
            Fork => "ForkEvent",
            Gollum => "GollumEvent",
            IssueComment => "IssueCommentEvent",
            Issues => "IssuesEvent",
            Label => "LabelEvent",
            Member => "MemberEvent",
            Membership => "MembershipEvent",
            Milestone => "MilestoneEvent",
            PageBuild => "PageBuildEvent",
            Public => "PublicEvent",
            PullRequest => "PullRequestEvent",
            PullRequestReview => "PullRequestReviewEvent",
            PullRequestReviewComment => "PullRequestReviewCommentEvent",
            Push => "PushEvent",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use EventKind::*;
        let kind = match s {
            "CommitCommentEvent" => CommitComment,
            "CreateEvent" => Create,
            "DeleteEvent" => Delete,
            "DeploymentEvent" => Deployment,
            "DeploymentStatusEvent" => DeploymentStatus,
            "ForkEvent" => Fork,
            "GollumEvent" => Gollum,
            "IssueCommentEvent" => IssueComment,
            "IssuesEvent" => Issues,
            "LabelEvent" => Label,
            "MemberEvent" => Member,
            "MembershipEvent" => Membership,
            "MilestoneEvent" => Milestone,
            "PageBuildEvent" => PageBuild,
            "PublicEvent" => Public,
            "PullRequestEvent" => PullRequest,
            "PullRequestReviewEvent" => PullRequestReview,
            "PullRequestReviewCommentEvent" => PullRequestReviewComment,
            "PushEvent" => Push,
            _ => return Err(ParseKindError(format!("unknown event type, was `{}`", s))),
        };
        Ok(kind)
    }
}
