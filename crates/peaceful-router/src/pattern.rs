//! Route template compilation.
//!
//! A template is a path in which `{name}` or `{name:type}` placeholders stand
//! for one captured value each. Everything between placeholders is literal
//! and must appear verbatim in the request path (case-sensitive). The
//! compiled matcher is anchored at both ends, so `/users/{id}` never matches
//! `/users/1/posts`.
//!
//! Each placeholder becomes a named capture group whose name encodes its
//! declaration index. Parameters are therefore read back by position in the
//! template, no matter how many groups the type expressions themselves open
//! (the built-in `float` and `slug` expressions both contain groups).
//!
//! Braces that do not form a valid placeholder (`{}`, `{a-b}`, `{x:}`) are
//! treated as literal text.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{RouterError, RouterResult};
use crate::params::Params;
use crate::registry::{TypeRegistry, DEFAULT_TAG};

/// Prefix of the capture groups generated for placeholders.
const CAPTURE_PREFIX: &str = "__peaceful_p";

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{([A-Za-z0-9_]+)(?::([A-Za-z0-9_]+))?\}").expect("placeholder grammar is valid")
    })
}

/// A compiled route template.
///
/// # Example
///
/// ```
/// use peaceful_router::{CompiledPattern, TypeRegistry};
///
/// let registry = TypeRegistry::new();
/// let pattern = CompiledPattern::compile("/users/{id:int}/posts/{slug:slug}", &registry).unwrap();
///
/// assert_eq!(pattern.param_names(), ["id", "slug"]);
///
/// let params = pattern.captures("/users/42/posts/hello-world").unwrap();
/// assert_eq!(params.get("id"), Some("42"));
/// assert_eq!(params.get("slug"), Some("hello-world"));
///
/// assert!(pattern.captures("/users/abc/posts/hello-world").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    template: String,
    regex: Regex,
    param_names: Vec<String>,
    /// Capture group index of each placeholder, in declaration order.
    group_indices: Vec<usize>,
}

impl CompiledPattern {
    /// Compiles `template`, resolving placeholder types through `registry`.
    ///
    /// An empty template compiles to an exact match for `/`.
    pub fn compile(template: &str, registry: &TypeRegistry) -> RouterResult<Self> {
        let template = if template.is_empty() { "/" } else { template };

        let mut source = String::with_capacity(template.len() * 2 + 2);
        source.push('^');

        let mut param_names = Vec::new();
        let mut last = 0;
        for caps in placeholder_regex().captures_iter(template) {
            let (Some(token), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let tag = caps.get(2).map_or(DEFAULT_TAG, |m| m.as_str());
            let expression = registry.resolve(tag);

            source.push_str(&regex::escape(&template[last..token.start()]));
            source.push_str(&format!(
                "(?P<{CAPTURE_PREFIX}{}>(?:{expression}))",
                param_names.len()
            ));

            param_names.push(name.as_str().to_string());
            last = token.end();
        }
        source.push_str(&regex::escape(&template[last..]));
        source.push('$');

        let regex =
            Regex::new(&source).map_err(|e| RouterError::invalid_pattern(template, e))?;
        let group_indices = Self::locate_groups(&regex, param_names.len());

        Ok(Self {
            template: template.to_string(),
            regex,
            param_names,
            group_indices,
        })
    }

    fn locate_groups(regex: &Regex, count: usize) -> Vec<usize> {
        let mut indices = vec![0; count];
        for (index, name) in regex.capture_names().enumerate() {
            let position = name
                .and_then(|n| n.strip_prefix(CAPTURE_PREFIX))
                .and_then(|n| n.parse::<usize>().ok());
            if let Some(position) = position.filter(|p| *p < count) {
                indices[position] = index;
            }
        }
        indices
    }

    /// Returns the template this pattern was compiled from.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the anchored expression the template compiled to.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Returns the parameter names in declaration order.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Returns true if `path` matches the whole pattern.
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches `path` and binds the captured values to parameter names.
    ///
    /// When a name is declared twice, the later placeholder's value is kept.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<Params> {
        let caps = self.regex.captures(path)?;
        let mut params = Params::with_capacity(self.param_names.len());
        for (name, index) in self.param_names.iter().zip(&self.group_indices) {
            let value = caps.get(*index).map_or("", |m| m.as_str());
            params.insert(name.as_str(), value);
        }
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(template: &str) -> CompiledPattern {
        CompiledPattern::compile(template, &TypeRegistry::new()).unwrap()
    }

    #[test]
    fn test_literal_template() {
        let pattern = compile("/health");
        assert!(pattern.param_names().is_empty());
        assert!(pattern.is_match("/health"));
        assert!(!pattern.is_match("/health/"));
        assert!(!pattern.is_match("/healthz"));
        assert!(!pattern.is_match("/Health"));
    }

    #[test]
    fn test_empty_template_is_root() {
        let pattern = compile("");
        assert_eq!(pattern.template(), "/");
        assert!(pattern.is_match("/"));
        assert!(!pattern.is_match(""));
        assert!(!pattern.is_match("/x"));
    }

    #[test]
    fn test_literal_text_is_escaped() {
        let pattern = compile("/files/report.pdf");
        assert!(pattern.is_match("/files/report.pdf"));
        assert!(!pattern.is_match("/files/reportXpdf"));

        let pattern = compile("/search+{term}");
        assert!(pattern.is_match("/search+rust"));
    }

    #[test]
    fn test_untyped_param_is_segment_scoped() {
        let pattern = compile("/users/{id}");
        assert_eq!(pattern.captures("/users/abc").unwrap().get("id"), Some("abc"));
        assert!(pattern.captures("/users/a/b").is_none());
        assert!(pattern.captures("/users/").is_none());
    }

    #[test]
    fn test_whole_path_anchoring() {
        let pattern = compile("/users/{id:int}");
        assert!(pattern.captures("/users/42").is_some());
        assert!(pattern.captures("/users/42/posts").is_none());
        assert!(pattern.captures("/api/users/42").is_none());
    }

    #[test]
    fn test_typed_params_bind_positionally() {
        let pattern = compile("/users/{id:int}/posts/{slug:slug}");
        let params = pattern.captures("/users/42/posts/hello-world").unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.get("slug"), Some("hello-world"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_type_mismatch_does_not_match() {
        let pattern = compile("/users/{id:int}");
        assert!(pattern.captures("/users/abc").is_none());
    }

    #[test]
    fn test_inner_groups_do_not_shift_params() {
        // `float` opens its own group before `unit` is declared
        let pattern = compile("/measure/{value:float}/{unit}");
        let params = pattern.captures("/measure/3.14/cm").unwrap();
        assert_eq!(params.get("value"), Some("3.14"));
        assert_eq!(params.get("unit"), Some("cm"));

        let pattern = compile("/{a:slug}/{b:slug}");
        let params = pattern.captures("/one-two/three-four").unwrap();
        assert_eq!(params.get("a"), Some("one-two"));
        assert_eq!(params.get("b"), Some("three-four"));
    }

    #[test]
    fn test_unknown_type_falls_back_to_string() {
        let pattern = compile("/items/{id:nosuchtype}");
        assert_eq!(
            pattern.captures("/items/anything").unwrap().get("id"),
            Some("anything")
        );
        assert!(pattern.captures("/items/a/b").is_none());
    }

    #[test]
    fn test_custom_type() {
        let registry = TypeRegistry::new();
        registry.register("hex", "[0-9a-f]+").unwrap();
        let pattern = CompiledPattern::compile("/colors/{c:hex}", &registry).unwrap();
        assert!(pattern.is_match("/colors/ff00aa"));
        assert!(!pattern.is_match("/colors/zz"));
    }

    #[test]
    fn test_duplicate_name_last_wins() {
        let pattern = compile("/{x}/{x}");
        let params = pattern.captures("/first/second").unwrap();
        assert_eq!(params.get("x"), Some("second"));
        assert_eq!(params.len(), 1);
        assert_eq!(pattern.param_names(), ["x", "x"]);
    }

    #[test]
    fn test_params_within_a_segment() {
        let pattern = compile("/archive/{year:int}-{month:int}");
        let params = pattern.captures("/archive/2024-05").unwrap();
        assert_eq!(params.get("year"), Some("2024"));
        assert_eq!(params.get("month"), Some("05"));
    }

    #[test]
    fn test_malformed_braces_are_literal() {
        let pattern = compile("/odd/{not-a-param}");
        assert!(pattern.param_names().is_empty());
        assert!(pattern.is_match("/odd/{not-a-param}"));
    }

    #[test]
    fn test_builtin_types() {
        let cases = [
            ("uuid", "550e8400-e29b-41d4-a716-446655440000", "not-a-uuid"),
            ("alphanumeric", "abc123", "abc-123"),
            ("email", "alice@example.com", "alice.example.com"),
            ("date", "2024-01-31", "2024-1-31"),
            ("ipv4", "192.168.0.1", "192.168.0"),
            ("ipv6", "2001:0db8:85a3:0000:0000:8a2e:0370:7334", "2001:db8::1"),
        ];
        for (tag, good, bad) in cases {
            let pattern = compile(&format!("/t/{{v:{tag}}}"));
            assert!(pattern.is_match(&format!("/t/{good}")), "{tag} rejected {good}");
            assert!(!pattern.is_match(&format!("/t/{bad}")), "{tag} accepted {bad}");
        }
    }
}
