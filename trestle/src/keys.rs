//! Namespaced key composition.

use std::fmt::Display;

pub const KEY_SEPARATOR: &str = ":";

/// Join `parts` with [`KEY_SEPARATOR`].
///
/// Parts are rendered through `Display`, so ids and numbers can be passed
/// directly. Nothing is escaped: a part containing `:` can collide with a
/// key built from more parts.
pub fn generate_key<I>(parts: I) -> String
where
    I: IntoIterator,
    I::Item: Display,
{
    parts
        .into_iter()
        .map(|part| part.to_string())
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joins_parts_in_order() {
        assert_eq!(generate_key(["a", "b", "c"]), "a:b:c");
        assert_eq!(generate_key(["a"]), "a");
    }

    #[test]
    fn test_is_deterministic() {
        let first = generate_key(["project", "42", "stats"]);
        let second = generate_key(["project", "42", "stats"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_stringifies_non_string_parts() {
        let project_id = 42u64;
        assert_eq!(
            generate_key([&"project" as &dyn Display, &project_id, &"payments"]),
            "project:42:payments"
        );
        assert_eq!(generate_key(vec![1, 2, 3]), "1:2:3");
    }

    #[test]
    fn test_empty_input_gives_empty_key() {
        assert_eq!(generate_key(Vec::<String>::new()), "");
    }

    #[test]
    fn test_separator_is_not_escaped() {
        assert_eq!(generate_key(["a:b", "c"]), generate_key(["a", "b", "c"]));
    }
}
