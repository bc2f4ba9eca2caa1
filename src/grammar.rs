use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub(crate) struct MustacheParser;

#[cfg(test)]
mod test {
    use super::{MustacheParser, Rule};
    use pest::Parser;

    macro_rules! assert_rule {
        ($rule:expr, $in:expr) => {
            assert_eq!(
                MustacheParser::parse($rule, $in)
                    .unwrap()
                    .last()
                    .unwrap()
                    .as_span()
                    .end(),
                $in.len()
            );
        };
    }

    macro_rules! assert_not_rule {
        ($rule:expr, $in:expr) => {
            assert!(
                MustacheParser::parse($rule, $in).is_err()
                    || MustacheParser::parse($rule, $in)
                        .unwrap()
                        .last()
                        .unwrap()
                        .as_span()
                        .end()
                        != $in.len()
            );
        };
    }

    #[test]
    fn test_path() {
        let s = vec!["a", "abc", "a.b", "a.b.c", "some-name", "items.0.title", "_x"];
        for i in s.iter() {
            assert_rule!(Rule::path, i);
        }

        let n = vec!["a..b", ".a", "a b", "@a"];
        for i in n.iter() {
            assert_not_rule!(Rule::path, i);
        }
    }

    #[test]
    fn test_expressions() {
        assert_rule!(Rule::expression, "{{title}}");
        assert_rule!(Rule::expression, "{{ article.title }}");
        assert_rule!(Rule::raw_expression, "{{{csrf}}}");
        assert_rule!(Rule::raw_expression, "{{{ csrf }}}");
        assert_not_rule!(Rule::expression, "{{ two words }}");
    }

    #[test]
    fn test_blocks() {
        assert_rule!(Rule::each_open, "{{#each items}}");
        assert_rule!(Rule::each_open, "{{#each  items }}");
        assert_rule!(Rule::section_open, "{{#flag}}");
        assert_rule!(Rule::section_open, "{{# flag }}");
        assert_rule!(Rule::inverted_open, "{{^flag}}");
        assert_rule!(Rule::close, "{{/flag}}");
        assert_rule!(Rule::close, "{{/ each }}");
        assert_not_rule!(Rule::each_open, "{{#eachitem}}");
    }

    #[test]
    fn test_partial() {
        let s = vec![
            "{{> component:foo/bar}}",
            "{{>component:foo}}",
            "{{> @widget }}",
            "{{> component:@widget}}",
            "{{> partials/nav}}",
        ];
        for i in s.iter() {
            assert_rule!(Rule::partial, i);
        }
    }

    #[test]
    fn test_text() {
        assert_rule!(Rule::text, "<h1>hello</h1>");
        assert_rule!(Rule::text, "{");
        assert_rule!(Rule::template, "a { b } {{ not a directive }} c");
        assert_rule!(Rule::template, "{{#a}}{{/b}}");
        assert_rule!(Rule::template, "");
    }
}
