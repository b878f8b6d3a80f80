//! Registration-time errors.
//!
//! Everything in this module is raised while routes and parameter types are
//! being registered. Request-time misses are not errors: a path that matches
//! no route simply yields `None` from [`RouteTable::match_route`].
//!
//! [`RouteTable::match_route`]: crate::RouteTable::match_route

use thiserror::Error;

/// Result type alias using [`RouterError`].
pub type RouterResult<T> = Result<T, RouterError>;

/// Errors returned by the type registry and the pattern compiler.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The type tag is already registered (custom or built-in).
    #[error("a custom type with the name '{tag}' already exists")]
    DuplicateTag {
        /// The rejected tag.
        tag: String,
    },

    /// A match expression or a route template did not compile.
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The expression or template that failed to compile.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// A custom match expression declares a named capture group, which would
    /// collide when the type is used more than once in a template.
    #[error("invalid pattern '{pattern}': named capture group '{name}' is not allowed")]
    NamedCapture {
        /// The rejected expression.
        pattern: String,
        /// The first group name found.
        name: String,
    },

    /// The tag cannot be referenced from a route template.
    #[error("invalid type tag '{tag}': tags may only contain ASCII letters, digits and '_'")]
    InvalidTag {
        /// The rejected tag.
        tag: String,
    },
}

impl RouterError {
    /// Creates a duplicate tag error.
    #[must_use]
    pub fn duplicate_tag(tag: impl Into<String>) -> Self {
        Self::DuplicateTag { tag: tag.into() }
    }

    /// Creates an invalid pattern error.
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }
}
