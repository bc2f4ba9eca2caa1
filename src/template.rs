use std::borrow::Cow;

use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest::Parser;

use crate::error::{TemplateError, TemplateErrorReason};
use crate::grammar::{MustacheParser, Rule};
use crate::json::path::Path;

use self::TemplateElement::*;

/// Old-style partial references and the prefix they map to.
const LEGACY_DIRECTORIES: &[(&str, &str)] = &[
    ("components/", "component"),
    ("partials/", "partial"),
    ("pages/", "page"),
    ("layouts/", "layout"),
];

#[derive(PartialEq, Clone, Debug)]
pub struct TemplateMapping(pub usize, pub usize);

/// A compiled template: a tree of literal text, interpolations, blocks and
/// partial inclusions.
#[derive(PartialEq, Clone, Debug, Default)]
pub struct Template {
    pub name: Option<String>,
    pub elements: Vec<TemplateElement>,
    pub mapping: Vec<TemplateMapping>,
}

/// Target of a `{{> ref}}` directive.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum PartialRef {
    /// `{{> component:nav}}`
    Static(String),
    /// `{{> @key}}` or `{{> prefix:@key}}`, resolved against the data in scope
    Dynamic { prefix: Option<String>, key: Path },
}

/// One `{{> ref}}` directive.
///
/// `index` is the directive's position among all partials of the enclosing
/// template in document order, nested blocks included; it is the position
/// of its entry in [`Template::partials`].
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct PartialInclude {
    pub index: usize,
    pub target: PartialRef,
}

/// The body of a `{{#x}}`, `{{^x}}` or `{{#each x}}` block.
#[derive(PartialEq, Clone, Debug)]
pub struct BlockTemplate {
    pub path: Path,
    pub template: Template,
}

#[derive(PartialEq, Clone, Debug)]
pub enum TemplateElement {
    RawString(String),
    Expression(Path),
    HtmlExpression(Path),
    Section(Box<BlockTemplate>),
    InvertedSection(Box<BlockTemplate>),
    Each(Box<BlockTemplate>),
    Partial(PartialInclude),
}

#[derive(PartialEq, Clone, Copy, Debug)]
enum BlockKind {
    Section,
    Inverted,
    Each,
}

struct OpenBlock {
    kind: BlockKind,
    path: Path,
    template: Template,
    line_no: usize,
    column_no: usize,
}

impl OpenBlock {
    /// The key the matching `{{/...}}` tag has to name.
    fn closing_name(&self) -> &str {
        match self.kind {
            BlockKind::Each => "each",
            BlockKind::Section | BlockKind::Inverted => self.path.raw(),
        }
    }

    fn into_element(self) -> TemplateElement {
        let block = Box::new(BlockTemplate {
            path: self.path,
            template: self.template,
        });
        match self.kind {
            BlockKind::Section => Section(block),
            BlockKind::Inverted => InvertedSection(block),
            BlockKind::Each => Each(block),
        }
    }
}

impl PartialRef {
    pub fn parse(raw: &str) -> PartialRef {
        let raw = raw.trim();
        if let Some(key) = raw.strip_prefix('@') {
            return PartialRef::Dynamic {
                prefix: None,
                key: Path::parse(key),
            };
        }
        if let Some((prefix, rest)) = raw.split_once(':') {
            if let Some(key) = rest.strip_prefix('@') {
                return PartialRef::Dynamic {
                    prefix: Some(prefix.to_owned()),
                    key: Path::parse(key),
                };
            }
        }
        PartialRef::Static(rewrite_legacy_name(raw).into_owned())
    }
}

/// Rewrite `components/foo` style references into `component:foo`.
///
/// Names that already carry a prefix, or that don't start with a known
/// directory, are returned unchanged.
pub fn rewrite_legacy_name(name: &str) -> Cow<'_, str> {
    if name.contains(':') {
        return Cow::Borrowed(name);
    }
    for &(dir, prefix) in LEGACY_DIRECTORIES {
        if let Some(rest) = name.strip_prefix(dir) {
            return Cow::Owned(format!("{}:{}", prefix, rest));
        }
    }
    Cow::Borrowed(name)
}

fn inner_str<'i>(pair: Pair<'i, Rule>) -> &'i str {
    pair.into_inner().next().map(|p| p.as_str()).unwrap_or("")
}

impl Template {
    pub fn new() -> Template {
        Template::default()
    }

    fn push_element(&mut self, e: TemplateElement, line: usize, col: usize) {
        // adjacent text runs come from unmatched braces, keep them as one string
        if let RawString(ref s) = e {
            if let Some(RawString(ref mut last)) = self.elements.last_mut() {
                last.push_str(s);
                return;
            }
        }
        self.elements.push(e);
        self.mapping.push(TemplateMapping(line, col));
    }

    pub fn compile(source: &str) -> Result<Template, TemplateError> {
        Template::compile2(source, None)
    }

    pub fn compile_with_name<S: AsRef<str>>(
        source: S,
        name: String,
    ) -> Result<Template, TemplateError> {
        Template::compile2(source.as_ref(), Some(name))
    }

    fn compile2(source: &str, name: Option<String>) -> Result<Template, TemplateError> {
        let mut parser_queue = MustacheParser::parse(Rule::template, source).map_err(|e| {
            let (line_no, column_no) = match e.line_col {
                LineColLocation::Pos(line_col) => line_col,
                LineColLocation::Span(line_col, _) => line_col,
            };
            TemplateError::of(TemplateErrorReason::InvalidSyntax)
                .at(source, line_no, column_no)
                .in_template(name.clone())
        })?;

        let mut root = Template {
            name: name.clone(),
            ..Template::default()
        };
        let mut block_stack: Vec<OpenBlock> = Vec::new();
        let mut partial_count = 0;

        let pairs = match parser_queue.next() {
            Some(p) => p.into_inner(),
            None => return Ok(root),
        };

        for pair in pairs {
            let (line_no, column_no) = pair.as_span().start_pos().line_col();
            let current = match block_stack.last_mut() {
                Some(block) => &mut block.template,
                None => &mut root,
            };

            match pair.as_rule() {
                Rule::text => {
                    current.push_element(RawString(pair.as_str().to_owned()), line_no, column_no);
                }
                Rule::expression => {
                    let path = Path::parse(inner_str(pair));
                    current.push_element(Expression(path), line_no, column_no);
                }
                Rule::raw_expression => {
                    let path = Path::parse(inner_str(pair));
                    current.push_element(HtmlExpression(path), line_no, column_no);
                }
                Rule::partial => {
                    let include = PartialInclude {
                        index: partial_count,
                        target: PartialRef::parse(inner_str(pair)),
                    };
                    partial_count += 1;
                    current.push_element(Partial(include), line_no, column_no);
                }
                Rule::section_open | Rule::inverted_open | Rule::each_open => {
                    let kind = match pair.as_rule() {
                        Rule::section_open => BlockKind::Section,
                        Rule::inverted_open => BlockKind::Inverted,
                        _ => BlockKind::Each,
                    };
                    block_stack.push(OpenBlock {
                        kind,
                        path: Path::parse(inner_str(pair)),
                        template: Template::new(),
                        line_no,
                        column_no,
                    });
                }
                Rule::close => {
                    let closed = inner_str(pair);
                    let block = block_stack.pop().ok_or_else(|| {
                        TemplateError::of(TemplateErrorReason::UnexpectedClose(closed.to_owned()))
                            .at(source, line_no, column_no)
                            .in_template(name.clone())
                    })?;
                    if block.closing_name() != closed {
                        return Err(TemplateError::of(
                            TemplateErrorReason::MismatchingClosedSection(
                                block.closing_name().to_owned(),
                                closed.to_owned(),
                            ),
                        )
                        .at(source, line_no, column_no)
                        .in_template(name));
                    }
                    let (open_line, open_col) = (block.line_no, block.column_no);
                    let parent = match block_stack.last_mut() {
                        Some(b) => &mut b.template,
                        None => &mut root,
                    };
                    parent.push_element(block.into_element(), open_line, open_col);
                }
                _ => {}
            }
        }

        if let Some(block) = block_stack.pop() {
            return Err(TemplateError::of(TemplateErrorReason::UnclosedSection(
                block.closing_name().to_owned(),
            ))
            .at(source, block.line_no, block.column_no)
            .in_template(name));
        }

        Ok(root)
    }

    /// Every partial directive of this template with its position, nested
    /// blocks included, in document order.
    pub fn partials(&self) -> Vec<(&PartialInclude, &TemplateMapping)> {
        let mut found = Vec::new();
        self.collect_partials(&mut found);
        found
    }

    fn collect_partials<'a>(&'a self, found: &mut Vec<(&'a PartialInclude, &'a TemplateMapping)>) {
        for (e, m) in self.elements.iter().zip(self.mapping.iter()) {
            match *e {
                Partial(ref p) => found.push((p, m)),
                Section(ref b) | InvertedSection(ref b) | Each(ref b) => {
                    b.template.collect_partials(found)
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn path(p: &str) -> Path {
        Path::parse(p)
    }

    #[test]
    fn test_parse_template() {
        let source = "<h1>{{title}} 你好</h1> {{{content}}}
{{#published}}<p>live</p>{{/published}}{{^published}}<p>draft</p>{{/published}}
{{#each tags}}<span>{{name}}</span>{{/each}}{{> component:footer}}";
        let t = Template::compile(source).unwrap();

        assert_eq!(t.elements.len(), 10);
        assert_eq!(t.elements.len(), t.mapping.len());

        assert_eq!(t.elements[0], RawString("<h1>".to_owned()));
        assert_eq!(t.elements[1], Expression(path("title")));
        assert_eq!(t.elements[2], RawString(" 你好</h1> ".to_owned()));
        assert_eq!(t.elements[3], HtmlExpression(path("content")));

        match t.elements[5] {
            Section(ref b) => {
                assert_eq!(b.path, path("published"));
                assert_eq!(b.template.elements, vec![RawString("<p>live</p>".to_owned())]);
            }
            _ => panic!("Section expected"),
        }
        match t.elements[6] {
            InvertedSection(ref b) => {
                assert_eq!(b.template.elements, vec![RawString("<p>draft</p>".to_owned())]);
            }
            _ => panic!("Inverted section expected"),
        }
        match t.elements[8] {
            Each(ref b) => {
                assert_eq!(b.path, path("tags"));
                assert_eq!(b.template.elements.len(), 3);
                assert_eq!(b.template.elements[1], Expression(path("name")));
            }
            _ => panic!("Each expected"),
        }
        assert_eq!(
            t.elements[9],
            Partial(PartialInclude {
                index: 0,
                target: PartialRef::Static("component:footer".to_owned())
            })
        );
    }

    #[test]
    fn test_whitespace_inside_tags() {
        let t = Template::compile("{{# flag }}{{ a.b }}{{{ c }}}{{/ flag }}").unwrap();
        match t.elements[0] {
            Section(ref b) => {
                assert_eq!(b.template.elements[0], Expression(path("a.b")));
                assert_eq!(b.template.elements[1], HtmlExpression(path("c")));
            }
            _ => panic!("Section expected"),
        }
    }

    #[test]
    fn test_nested_same_name_sections() {
        let t = Template::compile("{{#a}}1{{#a}}2{{/a}}3{{/a}}").unwrap();
        assert_eq!(t.elements.len(), 1);
        match t.elements[0] {
            Section(ref outer) => {
                assert_eq!(outer.template.elements.len(), 3);
                match outer.template.elements[1] {
                    Section(ref inner) => {
                        assert_eq!(inner.template.elements, vec![RawString("2".to_owned())])
                    }
                    _ => panic!("nested section expected"),
                }
            }
            _ => panic!("Section expected"),
        }
    }

    #[test]
    fn test_literal_text_is_preserved() {
        let sources = [
            "plain <b>html</b>",
            "a { b } c",
            "{{ two words }}",
            "{{}}",
            "{{#}}",
            "unclosed {{title",
            "",
        ];
        for s in sources.iter() {
            let t = Template::compile(s).unwrap();
            let text: String = t
                .elements
                .iter()
                .map(|e| match e {
                    RawString(ref s) => s.clone(),
                    _ => panic!("only text expected in {:?}", s),
                })
                .collect();
            assert_eq!(&text, s);
        }
    }

    #[test]
    fn test_mismatching_close() {
        let e = Template::compile_with_name("<p>\n{{#a}}x{{/b}}", "page:t".to_owned())
            .unwrap_err();
        assert_eq!(
            e.reason,
            TemplateErrorReason::MismatchingClosedSection("a".to_owned(), "b".to_owned())
        );
        assert_eq!(e.template_name, Some("page:t".to_owned()));
        assert_eq!(e.line_no, Some(2));
        assert_eq!(e.column_no, Some(8));

        let e = Template::compile("{{#each items}}x{{/items}}").unwrap_err();
        assert_eq!(
            e.reason,
            TemplateErrorReason::MismatchingClosedSection("each".to_owned(), "items".to_owned())
        );
    }

    #[test]
    fn test_unexpected_and_unclosed() {
        let e = Template::compile("x{{/a}}").unwrap_err();
        assert_eq!(e.reason, TemplateErrorReason::UnexpectedClose("a".to_owned()));

        let e = Template::compile("{{#a}}\n{{^b}}{{/b}}").unwrap_err();
        assert_eq!(e.reason, TemplateErrorReason::UnclosedSection("a".to_owned()));
        assert_eq!(e.line_no, Some(1));
        assert_eq!(e.column_no, Some(1));
    }

    #[test]
    fn test_each_without_path_is_a_section() {
        let t = Template::compile("{{#each}}x{{/each}}").unwrap();
        match t.elements[0] {
            Section(ref b) => assert_eq!(b.path, path("each")),
            _ => panic!("Section expected"),
        }
    }

    #[test]
    fn test_partial_refs() {
        assert_eq!(
            PartialRef::parse("component:foo/bar"),
            PartialRef::Static("component:foo/bar".to_owned())
        );
        assert_eq!(
            PartialRef::parse("@component"),
            PartialRef::Dynamic {
                prefix: None,
                key: path("component")
            }
        );
        assert_eq!(
            PartialRef::parse("component:@widget.name"),
            PartialRef::Dynamic {
                prefix: Some("component".to_owned()),
                key: path("widget.name")
            }
        );
        assert_eq!(
            PartialRef::parse("components/article/card"),
            PartialRef::Static("component:article/card".to_owned())
        );
        assert_eq!(
            PartialRef::parse("partials/nav"),
            PartialRef::Static("partial:nav".to_owned())
        );
    }

    #[test]
    fn test_rewrite_legacy_name() {
        assert_eq!(rewrite_legacy_name("pages/home"), "page:home");
        assert_eq!(rewrite_legacy_name("layouts/main"), "layout:main");
        assert_eq!(rewrite_legacy_name("home"), "home");
        assert_eq!(rewrite_legacy_name("page:components/x"), "page:components/x");
    }

    #[test]
    fn test_collect_partials() {
        let t = Template::compile("{{> a}}{{#x}}{{#each y}}{{> @b}}{{/each}}{{/x}}\n{{^z}}{{> c}}{{/z}}")
            .unwrap();
        let partials = t.partials();
        assert_eq!(partials.len(), 3);
        for (pos, &(include, _)) in partials.iter().enumerate() {
            assert_eq!(include.index, pos);
        }
        assert_eq!(partials[0].0.target, PartialRef::Static("a".to_owned()));
        assert_eq!(
            partials[1].0.target,
            PartialRef::Dynamic {
                prefix: None,
                key: path("b")
            }
        );
        assert_eq!(partials[1].1, &TemplateMapping(1, 25));
        assert_eq!(partials[2].0.target, PartialRef::Static("c".to_owned()));
        assert_eq!(partials[2].1, &TemplateMapping(2, 7));
    }
}
