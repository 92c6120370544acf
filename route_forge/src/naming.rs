//! Name canonicalization for module ids, resource nouns and action verbs.
//!
//! Every name that ends up in a path or a handler key goes through
//! [`normalize`], so two definitions that spell the same intent differently
//! (`Bulk_Allocate`, `bulk allocate`, `bulkAllocate`) compile to the same
//! route.

use crate::error::{Error, Result};
use crate::schema::HttpMethod;
use heck::ToKebabCase;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;

/// A name that has passed [`normalize`]: non-empty, `[a-z0-9-]` only, no
/// leading, trailing or repeated hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NormalizedToken(String);

impl NormalizedToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for NormalizedToken {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<NormalizedToken> for String {
    fn from(token: NormalizedToken) -> Self {
        token.0
    }
}

/// Canonicalizes a raw name into kebab case.
///
/// Surrounding whitespace and trailing slashes are stripped, camelCase
/// boundaries, whitespace and underscores become single hyphens, and the
/// result is lowercased. Anything outside ASCII letters, digits, `-`, `_`
/// and whitespace is rejected rather than silently dropped.
pub fn normalize(raw: &str) -> Result<NormalizedToken> {
    let trimmed = raw.trim().trim_end_matches('/');

    if let Some(bad) = trimmed
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_' || c.is_whitespace()))
    {
        return Err(invalid(raw, format!("character `{bad}` is outside [a-z0-9-]")));
    }

    let token = trimmed.to_kebab_case();
    if token.is_empty() {
        return Err(invalid(raw, "name is empty"));
    }
    if !token
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(raw, format!("`{token}` is outside [a-z0-9-]")));
    }

    Ok(NormalizedToken(token))
}

fn invalid(raw: &str, reason: impl Into<String>) -> Error {
    Error::InvalidName {
        raw: raw.to_string(),
        reason: reason.into(),
    }
}

/// The canonical resource verbs, in the order the resource generator lays
/// them out.
pub const CANONICAL_VERBS: [&str; 5] = ["list", "detail", "create", "update", "delete"];

static VERB_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("index", "list"),
        ("all", "list"),
        ("browse", "list"),
        ("show", "detail"),
        ("get", "detail"),
        ("view", "detail"),
        ("read", "detail"),
        ("new", "create"),
        ("add", "create"),
        ("edit", "update"),
        ("modify", "update"),
        ("patch", "update"),
        ("remove", "delete"),
        ("destroy", "delete"),
        ("del", "delete"),
    ])
});

/// Maps resource sub-action synonyms onto the canonical verb vocabulary.
/// Tokens outside the vocabulary come back unchanged.
pub fn canonical_action(token: &NormalizedToken) -> NormalizedToken {
    match VERB_ALIASES.get(token.as_str()) {
        Some(canonical) => NormalizedToken((*canonical).to_string()),
        None => token.clone(),
    }
}

/// Like [`canonical_action`], but only when the action already has the
/// canonical verb's method and item addressing. `PUT /alerts/:id/read` keeps
/// `read`; `GET /alerts/:id` named `read` becomes `detail`.
pub fn canonical_action_for(token: &NormalizedToken, method: HttpMethod, needs_id: bool) -> NormalizedToken {
    let canonical = canonical_action(token);
    if canonical != *token && canonical_shape(&canonical) == Some((method, needs_id)) {
        canonical
    } else {
        token.clone()
    }
}

pub fn is_canonical_verb(action: &str) -> bool {
    CANONICAL_VERBS.contains(&action)
}

/// The fixed method and item addressing of a canonical verb.
pub fn canonical_shape(verb: &str) -> Option<(HttpMethod, bool)> {
    match verb {
        "list" => Some((HttpMethod::Get, false)),
        "detail" => Some((HttpMethod::Get, true)),
        "create" => Some((HttpMethod::Post, false)),
        "update" => Some((HttpMethod::Put, true)),
        "delete" => Some((HttpMethod::Delete, true)),
        _ => None,
    }
}

/// English plural of the last word of a kebab-case noun.
///
/// Words already ending in `s` are assumed plural, which keeps the function
/// idempotent.
pub fn plural_noun(token: &NormalizedToken) -> NormalizedToken {
    let (head, last) = match token.rsplit_once('-') {
        Some((head, last)) => (Some(head), last),
        None => (None, token.as_str()),
    };

    let plural = pluralize_word(last);
    NormalizedToken(match head {
        Some(head) => format!("{head}-{plural}"),
        None => plural,
    })
}

fn pluralize_word(word: &str) -> String {
    if ["ss", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        return format!("{word}es");
    }
    if word.ends_with('s') {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last();
        if matches!(before, Some(c) if !"aeiou".contains(c)) {
            return format!("{stem}ies");
        }
    }
    format!("{word}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str) -> String {
        normalize(raw).unwrap().into_string()
    }

    #[test]
    fn test_normalize_basic_forms() {
        assert_eq!(norm("bulk-allocate"), "bulk-allocate");
        assert_eq!(norm("Bulk_Allocate"), "bulk-allocate");
        assert_eq!(norm("bulk   allocate"), "bulk-allocate");
        assert_eq!(norm("bulkAllocate"), "bulk-allocate");
        assert_eq!(norm("bulk--allocate"), "bulk-allocate");
        assert_eq!(norm("  listings// "), "listings");
        assert_eq!(norm("ab-tests-v2"), "ab-tests-v2");
    }

    #[test]
    fn test_normalize_rejects_foreign_characters() {
        for raw in ["listings/detail", ":id", "price.rules", "在庫", "", "  /  ", "---"] {
            let err = normalize(raw).unwrap_err();
            assert!(
                matches!(err, Error::InvalidName { .. }),
                "expected InvalidName for {raw:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "Bulk_Allocate",
            "inventory auto reorder",
            "ABTests",
            "phase117Restock",
            "listings/",
            "HTTPServer",
            "a__b  c--d",
            "v2",
        ];
        for raw in samples {
            let once = normalize(raw).unwrap();
            let twice = normalize(&once).unwrap();
            assert_eq!(once, twice, "normalize is not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_canonical_action_vocabulary() {
        let canon = |s: &str| canonical_action(&normalize(s).unwrap()).into_string();
        assert_eq!(canon("show"), "detail");
        assert_eq!(canon("Edit"), "update");
        assert_eq!(canon("destroy"), "delete");
        assert_eq!(canon("index"), "list");
        assert_eq!(canon("bulk-allocate"), "bulk-allocate");
        assert_eq!(canon("list"), "list");
    }

    #[test]
    fn test_aliases_only_apply_to_matching_shapes() {
        let canon = |s: &str, method, needs_id| {
            canonical_action_for(&normalize(s).unwrap(), method, needs_id).into_string()
        };
        assert_eq!(canon("read", HttpMethod::Get, true), "detail");
        assert_eq!(canon("read", HttpMethod::Put, true), "read");
        assert_eq!(canon("read", HttpMethod::Post, true), "read");
        assert_eq!(canon("all", HttpMethod::Get, false), "list");
        assert_eq!(canon("all", HttpMethod::Get, true), "all");
        assert_eq!(canon("patch", HttpMethod::Put, true), "update");
        assert_eq!(canon("add", HttpMethod::Post, true), "add");
        assert_eq!(canon("remove", HttpMethod::Delete, true), "delete");
        assert_eq!(canon("sync", HttpMethod::Post, true), "sync");
    }

    #[test]
    fn test_plural_noun() {
        let plural = |s: &str| plural_noun(&normalize(s).unwrap()).into_string();
        assert_eq!(plural("listing"), "listings");
        assert_eq!(plural("category"), "categories");
        assert_eq!(plural("box"), "boxes");
        assert_eq!(plural("ad-group"), "ad-groups");
        assert_eq!(plural("key"), "keys");
        assert_eq!(plural("allocations"), "allocations");
        assert_eq!(plural(&plural("category")), "categories");
    }
}
