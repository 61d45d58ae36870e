/// Collapse runs of whitespace into a single space and trim.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

/// Split rendered document text into its fragments: one per line, in order,
/// whitespace-normalized. Blank lines are kept since layouts anchor on them.
pub fn fragments(rendered: &str) -> Vec<String> {
    let body = rendered.strip_suffix('\n').unwrap_or(rendered);
    body.split('\n').map(normalize_ws).collect()
}

/// Group digits in thousands with `.` as the es-AR locale does.
pub fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize_ws("  Fisica \t I \u{a0} "), "Fisica I");
    }

    #[test]
    fn fragments_keep_blank_lines() {
        let f = fragments("\nRECEIPT HEADER\n12.345-6   Jane Doe\n");
        assert_eq!(f, vec!["", "RECEIPT HEADER", "12.345-6 Jane Doe"]);
    }

    #[test]
    fn handles_crlf() {
        let f = fragments("a\r\nb");
        assert_eq!(f, vec!["a", "b"]);
    }

    #[test]
    fn thousands() {
        assert_eq!(group_thousands("1"), "1");
        assert_eq!(group_thousands("123"), "123");
        assert_eq!(group_thousands("1234"), "1.234");
        assert_eq!(group_thousands("123456"), "123.456");
        assert_eq!(group_thousands("1234567"), "1.234.567");
    }
}
