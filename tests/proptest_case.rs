//! Property-based tests for display-name to record-key conversion.
//!
//! Uses proptest to verify that:
//! - Keys never contain separators
//! - Whitespace, `-` and `_` are interchangeable separators
//! - Converting a key again leaves it unchanged

use proptest::prelude::*;
use tracing::info;

use ticket_bridge::util::to_camel_case;

/// Initialize test logging for proptest
fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

fn words() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Za-z][A-Za-z0-9]{0,7}", 1..6)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        ..Default::default()
    })]

    /// Property: output never contains a separator character
    #[test]
    fn keys_have_no_separators(name in "[A-Za-z0-9 _\\-\t]{0,40}") {
        init_test_logging();
        let key = to_camel_case(&name);
        info!("proptest_no_separators: name={name:?} key={key}");

        prop_assert!(
            !key.chars().any(|c| c.is_whitespace() || c == '-' || c == '_'),
            "separator left in {key:?}"
        );
    }

    /// Property: conversion is deterministic
    #[test]
    fn conversion_is_deterministic(name in "\\PC{0,40}") {
        init_test_logging();
        prop_assert_eq!(to_camel_case(&name), to_camel_case(&name));
    }

    /// Property: the first character of a key is lowercase
    #[test]
    fn first_character_is_lowercase(words in words()) {
        init_test_logging();
        let key = to_camel_case(&words.join(" "));
        let first = key.chars().next();
        prop_assert!(
            first.is_some_and(|c| c.is_ascii_lowercase()),
            "key {key:?} from {words:?}"
        );
    }

    /// Property: the separator used between words does not matter
    #[test]
    fn separators_are_interchangeable(words in words()) {
        init_test_logging();
        let spaced = to_camel_case(&words.join(" "));
        prop_assert_eq!(&spaced, &to_camel_case(&words.join("_")));
        prop_assert_eq!(&spaced, &to_camel_case(&words.join("-")));
        prop_assert_eq!(&spaced, &to_camel_case(&words.join("  \t ")));
    }

    /// Property: a key converts to itself
    #[test]
    fn conversion_is_idempotent(words in words()) {
        init_test_logging();
        let key = to_camel_case(&words.join(" "));
        info!("proptest_idempotent: words={words:?} key={key}");
        prop_assert_eq!(to_camel_case(&key), key);
    }
}

#[test]
fn reserved_display_names() {
    assert_eq!(to_camel_case("External Linking ID"), "externalLinkingId");
    assert_eq!(to_camel_case("Parent Link"), "parentLink");
    assert_eq!(to_camel_case("Dependant Issues"), "dependantIssues");
    assert_eq!(to_camel_case("Issue Key"), "issueKey");
    assert_eq!(to_camel_case("Project Key"), "projectKey");
}
