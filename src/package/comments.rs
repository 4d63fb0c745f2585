//! Comment stripping for JSON-with-comments manifests.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    InString { escaped: bool },
    LineComment,
    BlockComment,
}

/// Remove `//` line comments and `/* */` block comments from JSON text.
///
/// Quoted strings are copied verbatim, including escape sequences, so a `//`
/// inside a URL value survives. Newlines ending a line comment are kept so
/// parse errors still report the right line.
#[must_use]
pub fn strip_json_comments(content: &str) -> String {
    let mut output = String::with_capacity(content.len());
    let mut state = ScanState::Code;
    let mut chars = content.chars().peekable();

    while let Some(current) = chars.next() {
        state = match state {
            ScanState::LineComment => {
                if current == '\n' {
                    output.push(current);
                    ScanState::Code
                } else {
                    ScanState::LineComment
                }
            }
            ScanState::BlockComment => {
                if current == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    ScanState::Code
                } else {
                    ScanState::BlockComment
                }
            }
            ScanState::InString { escaped } => {
                output.push(current);
                if escaped {
                    ScanState::InString { escaped: false }
                } else if current == '\\' {
                    ScanState::InString { escaped: true }
                } else if current == '"' {
                    ScanState::Code
                } else {
                    ScanState::InString { escaped: false }
                }
            }
            ScanState::Code => match (current, chars.peek()) {
                ('"', _) => {
                    output.push(current);
                    ScanState::InString { escaped: false }
                }
                ('/', Some('/')) => {
                    chars.next();
                    ScanState::LineComment
                }
                ('/', Some('*')) => {
                    chars.next();
                    ScanState::BlockComment
                }
                _ => {
                    output.push(current);
                    ScanState::Code
                }
            },
        };
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_line_and_block_comments() {
        let input = "{\n  // the name\n  \"name\": \"x\", /* inline */ \"v\": 1\n}";
        let stripped = strip_json_comments(input);
        let value: serde_json::Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(value["name"], "x");
        assert_eq!(value["v"], 1);
        assert_eq!(stripped.lines().count(), input.lines().count());
    }

    #[test]
    fn test_keeps_comment_markers_inside_strings() {
        let input = r#"{"url": "https://example.com/a//b", "glob": "src/**/*.js", "q": "say \"//hi\""}"#;
        assert_eq!(strip_json_comments(input), input);
    }

    #[test]
    fn test_escaped_backslash_ends_string() {
        // The string is `C:\`; the comment after it must be stripped
        let input = r#"{"dir": "C:\\"} // trailing"#;
        assert_eq!(strip_json_comments(input), r#"{"dir": "C:\\"} "#);
    }

    #[test]
    fn test_unterminated_block_comment_drops_rest() {
        assert_eq!(strip_json_comments("{} /* open"), "{} ");
    }
}
