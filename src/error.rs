use crate::kind::Kind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    /// A field the handler contract requires was absent. URNs are never
    /// fabricated from missing identifiers.
    #[error("{kind} document is missing required field `{field}`")]
    MissingField { kind: Kind, field: String },

    #[error("{0} request has no document to process")]
    NoDocument(Kind),

    #[error("malformed link header `{header}`")]
    LinkHeader {
        header: String,
        #[source]
        source: parse_link_header::Error,
    },

    #[error("invalid page number `{0}`")]
    PageNumber(String),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
