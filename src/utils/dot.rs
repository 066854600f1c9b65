//! DOT format helpers for graph dumps.
//!
//! Output is meant for Graphviz.

/// Escapes a string for use inside a quoted DOT label.
///
/// Backslashes, quotes, newlines and angle brackets (record-label syntax) are
/// escaped; carriage returns are dropped.
///
/// # Examples
///
/// ```rust
/// use cilflow::utils::escape_dot;
///
/// assert_eq!(escape_dot("ldstr \"hi\""), "ldstr \\\"hi\\\"");
/// assert_eq!(escape_dot("List<T>"), "List\\<T\\>");
/// ```
#[must_use]
pub fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "")
        .replace('<', "\\<")
        .replace('>', "\\>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_plain_mnemonic() {
        assert_eq!(escape_dot("ldarg.0"), "ldarg.0");
    }

    #[test]
    fn test_escape_multiline_label() {
        assert_eq!(escape_dot("IL_0000: nop\r\nIL_0001: ret"), "IL_0000: nop\\nIL_0001: ret");
    }

    #[test]
    fn test_escape_backslash_before_quote() {
        assert_eq!(escape_dot("a\\\"b"), "a\\\\\\\"b");
    }
}
