//! Document-processing core of a GitHub REST crawler.
//!
//! Fetched resources come in attached to a [`Request`]; [`Processor::process`]
//! stamps them with canonical URNs, records the typed link graph
//! between them, and accumulates the follow-up fetches that keep the
//! crawl going. Fetching, queue backends, and the document store are
//! collaborators behind the [`Store`], [`QueueSet`], and [`Policy`]
//! seams.

#![deny(rust_2018_idioms)]

mod document;
mod error;
mod kind;
mod policy;
mod processor;
mod queue;
mod request;
mod store;
mod templates;
mod urn;

pub use crate::document::{Document, Link, LinkTarget, Metadata};
pub use crate::error::ProcessError;
pub use crate::kind::{EventKind, Kind, ParseKindError};
pub use crate::policy::{Policy, ProcessAlways, ProcessNothing};
pub use crate::processor::{Processor, ProcessorOptions, VERSION};
pub use crate::queue::{MemoryQueueSet, QueueSet};
pub use crate::request::{
    Context, Priority, Queued, Relation, Request, ResponseInfo, Skip, SkipOutcome,
};
pub use crate::store::{MemoryStore, Store};
pub use crate::urn::Urn;
