/// Resolves backslash escapes in grammar attribute values. Pin patterns and
/// token texts arrive with grammar-file escaping; `\n` and `\t` map to their
/// control characters, any other escaped character maps to itself, and a
/// trailing lone backslash is dropped.
pub fn unescape(input: &str) -> String {
    let mut res = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            res.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => res.push('\n'),
            Some('t') => res.push('\t'),
            Some(escaped) => res.push(escaped),
            None => {}
        }
    }
    res
}

/// Returns the segment of a dot-qualified name after the last dot, or the
/// whole name if it is unqualified.
pub fn short_name(qualified: &str) -> &str {
    match qualified.rfind('.') {
        Some(index) => &qualified[index + 1..],
        None => qualified,
    }
}

/// Returns the portion of a dot-qualified name before the last dot, or the
/// empty string if it is unqualified.
pub fn package_name(qualified: &str) -> &str {
    match qualified.rfind('.') {
        Some(index) => &qualified[..index],
        None => "",
    }
}

/// Converts an underscore-separated name into PascalCase, dropping empty
/// segments.
pub fn pascal_case(name: &str) -> String {
    let mut res = String::new();
    for segment in name.split('_') {
        if segment.is_empty() {
            continue;
        }

        let mut chars = segment.chars();
        let first = chars.next().unwrap();
        res.extend(first.to_uppercase());
        res.push_str(&chars.as_str().to_lowercase());
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_resolves_pin_pattern_escapes() {
        //verify
        assert_eq!(unescape("\\'if\\' cond .*"), "'if' cond .*");
        assert_eq!(unescape("\\\\d+ rule"), "\\d+ rule");
        assert_eq!(unescape("stmt\\nbody\\ttail"), "stmt\nbody\ttail");
    }

    #[test]
    fn unescape_leaves_plain_rule_text_alone() {
        //verify
        assert_eq!(unescape("expr ('+' expr)*"), "expr ('+' expr)*");
        assert_eq!(unescape(""), "");
    }

    #[test]
    fn unescape_drops_a_trailing_backslash() {
        //verify
        assert_eq!(unescape("stmt_end\\"), "stmt_end");
    }

    #[test]
    fn short_and_package_names() {
        //verify
        assert_eq!(short_name("generated.psi.impl.FooImpl"), "FooImpl");
        assert_eq!(short_name("Foo"), "Foo");
        assert_eq!(package_name("generated.psi.Foo"), "generated.psi");
        assert_eq!(package_name("Foo"), "");
    }

    #[test]
    fn pascal_case_segments() {
        //verify
        assert_eq!(pascal_case("if_stmt"), "IfStmt");
        assert_eq!(pascal_case("expr"), "Expr");
        assert_eq!(pascal_case("__weird__NAME"), "WeirdName");
        assert_eq!(pascal_case(""), "");
    }
}
