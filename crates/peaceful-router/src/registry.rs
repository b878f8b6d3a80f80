//! Parameter type registry.
//!
//! A [`TypeRegistry`] maps the `type` part of a `{name:type}` placeholder to
//! the expression its captured segment must satisfy. Ten tags are built in
//! and reserved; applications may add their own with
//! [`TypeRegistry::register`].
//!
//! Lookups never fail. A tag nobody registered resolves to the `string`
//! expression (any non-empty run of characters other than `/`), so a typo in
//! a template degrades to a permissive match instead of breaking startup.
//!
//! # Concurrency
//!
//! The registry is meant to be built once and shared as `Arc<TypeRegistry>`.
//! Custom tags live behind a readers-writer lock: any number of concurrent
//! lookups, one registration at a time, and registrations only ever add.

use std::collections::HashMap;

use parking_lot::RwLock;
use regex::Regex;

use crate::error::{RouterError, RouterResult};

/// Tag used when a placeholder declares no type, or an unknown one.
pub const DEFAULT_TAG: &str = "string";

/// Built-in tags and their expressions.
const BUILTIN_TYPES: [(&str, &str); 10] = [
    ("int", r"\d+"),
    ("float", r"\d+(\.\d+)?"),
    (
        "uuid",
        r"[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{12}",
    ),
    ("alphanumeric", r"[a-zA-Z0-9]+"),
    ("string", r"[^/]+"),
    ("slug", r"[a-z0-9]+(-[a-z0-9]+)*"),
    ("email", r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"),
    ("date", r"\d{4}-\d{2}-\d{2}"),
    ("ipv4", r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b"),
    ("ipv6", r"\b([a-fA-F0-9]{1,4}:){7}[a-fA-F0-9]{1,4}\b"),
];

/// Registry of parameter type tags.
///
/// # Example
///
/// ```
/// use peaceful_router::TypeRegistry;
///
/// let registry = TypeRegistry::new();
/// registry.register("hex", "[0-9a-f]+").unwrap();
///
/// assert_eq!(registry.resolve("hex"), "[0-9a-f]+");
/// assert_eq!(registry.resolve("int"), r"\d+");
/// // Unknown tags fall back to the `string` expression
/// assert_eq!(registry.resolve("nope"), "[^/]+");
///
/// assert!(registry.register("int", r"\d").is_err());
/// ```
#[derive(Debug, Default)]
pub struct TypeRegistry {
    custom: RwLock<HashMap<String, String>>,
}

impl TypeRegistry {
    /// Creates a registry holding only the built-in tags.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom tag.
    ///
    /// Fails with [`RouterError::DuplicateTag`] if the tag is built in or was
    /// registered before, with [`RouterError::InvalidPattern`] if the
    /// expression does not compile, with [`RouterError::NamedCapture`] if it
    /// declares a named group, and with [`RouterError::InvalidTag`] if the
    /// tag could never appear in a template. The registry is unchanged on
    /// failure.
    pub fn register(&self, tag: impl Into<String>, expression: impl Into<String>) -> RouterResult<()> {
        let tag = tag.into();
        let expression = expression.into();

        if !is_valid_tag(&tag) {
            return Err(RouterError::InvalidTag { tag });
        }
        if Self::is_builtin(&tag) {
            return Err(RouterError::duplicate_tag(tag));
        }
        let compiled = match Regex::new(&expression) {
            Ok(regex) => regex,
            Err(source) => return Err(RouterError::invalid_pattern(expression, source)),
        };
        if let Some(name) = compiled.capture_names().flatten().next() {
            let name = name.to_string();
            return Err(RouterError::NamedCapture {
                pattern: expression,
                name,
            });
        }

        let mut custom = self.custom.write();
        if custom.contains_key(&tag) {
            return Err(RouterError::duplicate_tag(tag));
        }
        tracing::debug!(tag = %tag, expression = %expression, "registered parameter type");
        custom.insert(tag, expression);
        Ok(())
    }

    /// Returns the expression for `tag`, or the `string` expression when the
    /// tag is unknown.
    #[must_use]
    pub fn resolve(&self, tag: &str) -> String {
        if let Some(expression) = builtin(tag) {
            return expression.to_string();
        }
        self.custom
            .read()
            .get(tag)
            .cloned()
            .unwrap_or_else(|| default_expression().to_string())
    }

    /// Returns true if `tag` resolves to its own expression rather than the
    /// fallback.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        Self::is_builtin(tag) || self.custom.read().contains_key(tag)
    }

    /// Returns true if `tag` is one of the reserved built-in tags.
    #[must_use]
    pub fn is_builtin(tag: &str) -> bool {
        builtin(tag).is_some()
    }

    /// Returns the custom tags registered so far, sorted.
    #[must_use]
    pub fn custom_tags(&self) -> Vec<String> {
        let mut tags: Vec<_> = self.custom.read().keys().cloned().collect();
        tags.sort();
        tags
    }
}

fn builtin(tag: &str) -> Option<&'static str> {
    BUILTIN_TYPES
        .iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, expression)| *expression)
}

fn default_expression() -> &'static str {
    builtin(DEFAULT_TAG).unwrap_or("[^/]+")
}

/// Tags must match the `type` part of the placeholder grammar.
pub(crate) fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty() && tag.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
