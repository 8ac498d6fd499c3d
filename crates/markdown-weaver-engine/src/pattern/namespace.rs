//! Render names and namespaced patterns.
//!
//! Every renderer pattern is rewritten so that its named groups live under
//! the renderer's own namespace before it is merged with other patterns:
//! `(?P<code>.*)` registered by `jupyter__fenced_code` becomes
//! `(?P<jupyter__fenced_code>(?P<jupyter__fenced_code___code>.*))`.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::error::{EngineError, Result};

/// Divides a namespaced group name into the namespace and the real name.
pub const SEPARATOR: &str = "___";

const JOIN: &str = "__";
const RENDER_PREFIX: &str = "render_";

static GROUP_DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\?P?<([A-Za-z_][A-Za-z0-9_]*)>").expect("static pattern")
});

static GROUP_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\?P=([A-Za-z_][A-Za-z0-9_]*)\)").expect("static pattern")
});

/// Derive the render name of a render function.
///
/// `<type>[__<instance>]__<function>`, where the type name is lower-cased,
/// the instance name is only included when it differs from the type name and
/// a leading `render_` is dropped from the function name.
pub fn render_name(type_name: &str, instance_name: Option<&str>, function: &str) -> String {
    let type_name = type_name.to_lowercase();
    let mut parts = vec![type_name.clone()];
    if let Some(name) = instance_name.filter(|name| *name != type_name) {
        parts.push(name.to_string());
    }
    parts.push(
        function
            .strip_prefix(RENDER_PREFIX)
            .unwrap_or(function)
            .to_string(),
    );
    parts.join(JOIN)
}

/// Check that `namespace` can be used as a group name and a prefix.
pub fn validate_namespace(namespace: &str) -> Result<()> {
    let mut chars = namespace.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_start || !valid_rest || namespace.contains(SEPARATOR) {
        return Err(EngineError::InvalidNamespace(namespace.to_string()));
    }
    Ok(())
}

/// Rewrite every named group of `pattern` into `namespace` and wrap the
/// result in an outer group named `namespace`.
pub fn rename_pattern(pattern: &str, namespace: &str) -> String {
    let renamed = GROUP_DEFINITION.replace_all(pattern, |caps: &Captures| {
        format!("(?P<{namespace}{SEPARATOR}{}>", &caps[1])
    });
    let renamed = GROUP_REFERENCE.replace_all(&renamed, |caps: &Captures| {
        format!("(?P={namespace}{SEPARATOR}{})", &caps[1])
    });
    format!("(?P<{namespace}>{renamed})")
}

/// Names of the groups defined in `pattern`, in order of appearance.
pub fn group_names(pattern: &str) -> Vec<&str> {
    GROUP_DEFINITION
        .captures_iter(pattern)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("Jupyter", None, "render_fenced_code", "jupyter__fenced_code")]
    #[case("Jupyter", Some("jupyter"), "render_inline_code", "jupyter__inline_code")]
    #[case("Number", Some("figures"), "render_header", "number__figures__header")]
    #[case("Linker", None, "reference", "linker__reference")]
    fn test_render_name(
        #[case] type_name: &str,
        #[case] instance: Option<&str>,
        #[case] function: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(render_name(type_name, instance, function), expected);
    }

    #[test]
    fn test_rename_pattern() {
        let pattern = r"(?P<mark>#+) (?<title>.+)";
        assert_eq!(
            rename_pattern(pattern, "number__header"),
            r"(?P<number__header>(?P<number__header___mark>#+) (?P<number__header___title>.+))"
        );
    }

    #[test]
    fn test_rename_pattern_rewrites_back_references() {
        let pattern = r"(?P<fence>`{3,})(?P<code>.*)(?P=fence)";
        assert_eq!(
            rename_pattern(pattern, "a__b"),
            r"(?P<a__b>(?P<a__b___fence>`{3,})(?P<a__b___code>.*)(?P=a__b___fence))"
        );
    }

    #[test]
    fn test_rename_pattern_without_groups_is_wrapped() {
        assert_eq!(rename_pattern("abc", "x__y"), "(?P<x__y>abc)");
    }

    #[test]
    fn test_rename_pattern_ignores_unnamed_groups() {
        assert_eq!(
            rename_pattern(r"(?:a|b)(c)(?i)d", "n"),
            r"(?P<n>(?:a|b)(c)(?i)d)"
        );
    }

    #[test]
    fn test_renamed_pattern_compiles() {
        let renamed = rename_pattern(r"(?P<word>\w+)", "t__w");
        let regex = Regex::new(&renamed).unwrap();
        let caps = regex.captures("hello").unwrap();
        assert_eq!(&caps["t__w___word"], "hello");
        assert_eq!(&caps["t__w"], "hello");
    }

    #[test]
    fn test_group_names() {
        assert_eq!(
            group_names(r"(?P<a>x)(?:y)(?<b>z)(?P=a)"),
            vec!["a", "b"]
        );
    }

    #[rstest]
    #[case("jupyter__fenced_code", true)]
    #[case("_private", true)]
    #[case("bad___name", false)]
    #[case("", false)]
    #[case("1abc", false)]
    #[case("has-dash", false)]
    fn test_validate_namespace(#[case] namespace: &str, #[case] valid: bool) {
        assert_eq!(validate_namespace(namespace).is_ok(), valid);
    }
}
