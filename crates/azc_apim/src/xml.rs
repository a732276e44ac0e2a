//! XML escaping over deferred values.

use azc_output::Output;

/// Escape text content.
pub fn escape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a double-quoted attribute value.
pub fn escape_attr(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Deferred attribute value, escaped once it resolves.
pub fn attr(value: &Output<String>) -> Output<String> {
    value.map(|v| escape_attr(&v))
}

/// Deferred text content, escaped once it resolves.
pub fn text(value: &Output<String>) -> Output<String> {
    value.map(|v| escape_text(&v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_attr() {
        assert_eq!(
            escape_attr(r#"a >= 1 && b == "x""#),
            "a &gt;= 1 &amp;&amp; b == &quot;x&quot;"
        );
    }

    #[test]
    fn test_escape_text_keeps_quotes() {
        assert_eq!(escape_text(r#"@("Bearer " + t)"#), r#"@("Bearer " + t)"#);
        assert_eq!(escape_text("<b>"), "&lt;b&gt;");
    }
}
