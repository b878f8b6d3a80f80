//! Integration and property tests for template matching.

use std::sync::Arc;

use http::Method;
use peaceful_router::{CompiledPattern, RouteTable, RouterError, TypeRegistry};
use proptest::prelude::*;

#[test]
fn test_typed_params_bind_in_declaration_order() {
    let mut table = RouteTable::new();
    table
        .insert(Method::GET, "/users/{id:int}/posts/{slug:slug}", "post")
        .unwrap();

    let m = table
        .match_route(&Method::GET, "/users/42/posts/hello-world")
        .unwrap();
    let pairs: Vec<_> = m.params.iter().collect();
    assert_eq!(pairs, vec![("id", "42"), ("slug", "hello-world")]);
}

#[test]
fn test_type_mismatch_is_not_found() {
    let mut table = RouteTable::new();
    table.insert(Method::GET, "/users/{id:int}", "user").unwrap();

    assert!(table.match_route(&Method::GET, "/users/abc").is_none());
}

#[test]
fn test_overlapping_routes_prefer_registration_order() {
    let mut table = RouteTable::new();
    table.insert(Method::GET, "/files/{name}", "any").unwrap();
    table.insert(Method::GET, "/files/readme", "readme").unwrap();

    let m = table.match_route(&Method::GET, "/files/readme").unwrap();
    assert_eq!(*m.endpoint(), "any");
}

#[test]
fn test_custom_type_visible_to_later_routes() {
    let registry = Arc::new(TypeRegistry::new());
    let mut table = RouteTable::with_registry(Arc::clone(&registry));

    registry.register("sku", "[A-Z]{3}-[0-9]{4}").unwrap();
    table.insert(Method::GET, "/products/{sku:sku}", "product").unwrap();

    assert!(table.match_route(&Method::GET, "/products/ABC-1234").is_some());
    assert!(table.match_route(&Method::GET, "/products/abc-1234").is_none());
}

#[test]
fn test_duplicate_registration_leaves_registry_unchanged() {
    let registry = TypeRegistry::new();
    registry.register("sku", "[A-Z]{3}").unwrap();

    let err = registry.register("sku", ".*").unwrap_err();
    assert!(matches!(err, RouterError::DuplicateTag { .. }));
    assert_eq!(registry.resolve("sku"), "[A-Z]{3}");
}

#[test]
fn test_custom_type_used_twice_in_one_template() {
    let registry = Arc::new(TypeRegistry::new());
    let mut table = RouteTable::with_registry(Arc::clone(&registry));

    let err = registry.register("pair", r"(?P<left>\d+)-\d+").unwrap_err();
    assert!(matches!(err, RouterError::NamedCapture { .. }));

    registry.register("pair", r"(\d+)-\d+").unwrap();
    table
        .insert(Method::GET, "/a/{x:pair}/{y:pair}", "pairs")
        .unwrap();

    let m = table.match_route(&Method::GET, "/a/1-2/30-40").unwrap();
    assert_eq!(m.params.get("x"), Some("1-2"));
    assert_eq!(m.params.get("y"), Some("30-40"));
}

#[test]
fn test_raw_path_is_not_decoded() {
    let mut table = RouteTable::new();
    table.insert(Method::GET, "/tags/{tag}", "tag").unwrap();

    let m = table.match_route(&Method::GET, "/tags/a%2Fb").unwrap();
    assert_eq!(m.params.get("tag"), Some("a%2Fb"));
}

fn literal_segment() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,8}").unwrap()
}

proptest! {
    /// Any non-negative integer binds verbatim to an `int` placeholder.
    #[test]
    fn proptest_int_param_roundtrip(id in any::<u64>(), prefix in literal_segment()) {
        let registry = TypeRegistry::new();
        let pattern = CompiledPattern::compile(&format!("/{prefix}/{{id:int}}"), &registry).unwrap();

        let value = id.to_string();
        let params = pattern.captures(&format!("/{prefix}/{value}")).unwrap();
        prop_assert_eq!(params.get("id"), Some(value.as_str()));
    }

    /// A literal template only ever matches itself.
    #[test]
    fn proptest_literal_only_matches_itself(a in literal_segment(), b in literal_segment()) {
        let registry = TypeRegistry::new();
        let pattern = CompiledPattern::compile(&format!("/{a}"), &registry).unwrap();

        let same = format!("/{a}");
        let other = format!("/{b}");
        let nested = format!("/{a}/{b}");

        prop_assert!(pattern.is_match(&same));
        prop_assert_eq!(pattern.is_match(&other), a == b);
        prop_assert!(!pattern.is_match(&nested));
    }

    /// Untyped placeholders never swallow a slash.
    #[test]
    fn proptest_string_param_is_one_segment(a in literal_segment(), b in literal_segment()) {
        let registry = TypeRegistry::new();
        let pattern = CompiledPattern::compile("/x/{name}", &registry).unwrap();

        let single = format!("/x/{a}");
        let nested = format!("/x/{a}/{b}");

        prop_assert!(pattern.is_match(&single));
        prop_assert!(!pattern.is_match(&nested));
    }
}
