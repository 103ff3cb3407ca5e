//! GitHub URL-template handling.
//!
//! Resource documents embed a small, fixed set of RFC 6570-ish
//! templates (`{/member}`, `{/collaborator}`, `{/number}`, `{/sha}`).
//! Only that set is recognized; anything more general is out of scope.

use std::fmt;

/// Templates that may appear in fetched GitHub documents.
const RECOGNIZED: &[&str] = &["{/member}", "{/collaborator}", "{/number}", "{/sha}"];

/// Removes every recognized template from `url`.
pub fn strip(url: &str) -> String {
    let mut url = url.to_owned();
    for template in RECOGNIZED {
        if let Some(at) = url.find(template) {
            url.replace_range(at..at + template.len(), "");
        }
    }
    url
}

/// Substitutes `{/number}` with an explicit `/{id}` path segment.
pub fn fill_number(url: &str, id: impl fmt::Display) -> String {
    url.replace("{/number}", &format!("/{}", id))
}
