pub mod str {
    /// Escape `& < > " '` so the text is safe inside HTML element content
    /// and quoted attribute values.
    ///
    /// Escaping is not content-aware: already escaped text is escaped again.
    pub fn escape_html(s: &str) -> String {
        let mut output = String::with_capacity(s.len());
        for c in s.chars() {
            match c {
                '&' => output.push_str("&amp;"),
                '<' => output.push_str("&lt;"),
                '>' => output.push_str("&gt;"),
                '"' => output.push_str("&quot;"),
                '\'' => output.push_str("&#039;"),
                _ => output.push(c),
            }
        }
        output
    }

    /// Whether `s` holds a character that could break out of an HTML
    /// attribute value.
    pub(crate) fn has_unsafe_attr_char(s: &str) -> bool {
        s.chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '<' | '>' | '`'))
    }

    #[cfg(test)]
    mod test {
        use super::{escape_html, has_unsafe_attr_char};

        #[test]
        fn test_escape_html() {
            assert_eq!(escape_html("<b>&\"'"), "&lt;b&gt;&amp;&quot;&#039;");
            assert_eq!(escape_html("plain text, 你好"), "plain text, 你好");
            assert_eq!(escape_html(""), "");
        }

        #[test]
        fn test_escape_is_applied_again() {
            let once = escape_html("<a>");
            assert_eq!(once, "&lt;a&gt;");
            assert_eq!(escape_html(&once), "&amp;lt;a&amp;gt;");
        }

        #[test]
        fn test_unsafe_attr_char() {
            assert!(!has_unsafe_attr_char("/assets/img/logo.png"));
            assert!(has_unsafe_attr_char("/assets/x.png\" onerror=\"alert(1)"));
            assert!(has_unsafe_attr_char("/assets/a b.png"));
            assert!(has_unsafe_attr_char("/assets/x\n.png"));
        }
    }
}
