/// Computes the default JSON name for a proto field name: underscores are
/// removed and the following letter is capitalized. This is the protoc
/// algorithm and is intentionally lossy.
pub(crate) fn to_json_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut ucase_next = false;
    for ch in name.chars() {
        if ch == '_' {
            ucase_next = true;
        } else if ucase_next {
            result.push(ch.to_ascii_uppercase());
            ucase_next = false;
        } else {
            result.push(ch);
        }
    }
    result
}

/// Converts a snake_case path segment to camelCase, or `None` when the
/// original spelling could not be recovered from the result.
///
/// Field mask paths must survive both directions, so the lossy
/// [`to_json_name`] conversion is only accepted here when mapping it back
/// reproduces the input. This rejects segments that already contain
/// uppercase letters, and underscores followed by anything but a letter.
pub(crate) fn camel_case_segment(segment: &str) -> Option<String> {
    let camel = to_json_name(segment);
    match snake_case_segment(&camel) {
        Some(snake) if snake == segment => Some(camel),
        _ => None,
    }
}

/// Converts a camelCase path segment back to snake_case, or `None` when the
/// segment is not valid camelCase (it contains an underscore).
pub(crate) fn snake_case_segment(segment: &str) -> Option<String> {
    let mut result = String::with_capacity(segment.len() + 2);
    for ch in segment.chars() {
        if ch == '_' {
            return None;
        }
        if ch.is_ascii_uppercase() {
            result.push('_');
            result.push(ch.to_ascii_lowercase());
        } else {
            result.push(ch);
        }
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn json_name() {
        assert_eq!(to_json_name("foo"), "foo");
        assert_eq!(to_json_name("foo_bar"), "fooBar");
        assert_eq!(to_json_name("foo_bar_baz"), "fooBarBaz");
        assert_eq!(to_json_name("foo_3_bar"), "foo3Bar");
        assert_eq!(to_json_name("foo__bar"), "fooBar");
    }

    #[test]
    fn reversible_segments_convert() {
        for (snake, camel) in [
            ("", ""),
            ("foo", "foo"),
            ("foo_bar", "fooBar"),
            ("foo_bar_baz", "fooBarBaz"),
            ("_foo", "Foo"),
            ("v1", "v1"),
        ] {
            assert_eq!(camel_case_segment(snake).as_deref(), Some(camel));
            assert_eq!(snake_case_segment(camel).as_deref(), Some(snake));
        }
    }

    #[test]
    fn irreversible_segments_are_rejected() {
        for segment in ["fooBar", "foo_3_bar", "foo__bar", "foo_"] {
            assert_eq!(camel_case_segment(segment), None, "segment {:?}", segment);
        }
        assert_eq!(snake_case_segment("foo_bar"), None);
    }

    proptest! {
        #[test]
        fn segment_roundtrip(snake in "[a-z0-9_]*") {
            if let Some(camel) = camel_case_segment(&snake) {
                let roundtrip = snake_case_segment(&camel);
                prop_assert_eq!(roundtrip.as_deref(), Some(snake.as_str()));
            }
        }
    }
}
