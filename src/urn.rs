//! Canonical identities for crawled resources.
//!
//! A URN is a `urn:`-prefixed, colon-delimited path built by
//! concatenation, e.g. `urn:repo:42:issue:7:issue_comments`. The prefix
//! inherited from a parent document is called the *qualifier*; children
//! append their own segments to it.

use crate::kind::Kind;
use anyhow::{bail, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Debug)]
#[serde(transparent)]
pub struct Urn(String);

impl Urn {
    /// Identity of a globally keyed resource, e.g. `urn:repo:42`.
    pub fn root(kind: Kind, id: impl fmt::Display) -> Self {
        Self(format!("urn:{}:{}", kind, id))
    }

    /// Identity of a global collection, e.g. `urn:orgs`.
    pub fn global(kind: Kind) -> Self {
        Self(format!("urn:{}", kind))
    }

    /// Appends a single segment, e.g. `urn:repo:42` -> `urn:repo:42:issues`.
    pub fn join(&self, segment: impl fmt::Display) -> Self {
        Self(format!("{}:{}", self.0, segment))
    }

    /// Appends a `<name>:<id>` pair, e.g. `urn:repo:42` -> `urn:repo:42:issue:7`.
    pub fn child(&self, name: &str, id: impl fmt::Display) -> Self {
        Self(format!("{}:{}:{}", self.0, name, id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The root kind this URN is keyed under, if it names one.
    pub fn root_kind(&self) -> Option<Kind> {
        let kind = self.0.strip_prefix("urn:")?.split(':').next()?;
        kind.parse().ok().filter(Kind::is_root)
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Urn {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Urn {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl FromStr for Urn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.starts_with("urn:") {
            bail!("Expecting a `urn:`-prefixed identity, but was `{}`.", s);
        }
        Ok(Self(s.to_owned()))
    }
}
