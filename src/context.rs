use serde::Serialize;
use serde_json::value::{to_value, Value as Json};

use crate::error::RenderError;
use crate::json::path::Path;

/// The context wrap data you render on your templates.
///
/// Any `Serialize` value can be wrapped: maps and structs both become JSON
/// objects, so a dotted path reaches map keys and struct fields alike.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    data: Json,
}

/// The scope of one `{{#each}}` iteration: where its item lives in the
/// context data, as object keys and array indices from the root.
///
/// Items are never copied out of the context. A name is looked up in the
/// innermost item first and falls back to the enclosing items, then to the
/// root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockContext {
    base_path: Vec<String>,
}

impl BlockContext {
    pub fn new(base_path: Vec<String>) -> BlockContext {
        BlockContext { base_path }
    }

    pub fn base_path(&self) -> &[String] {
        &self.base_path
    }
}

fn child_value<'a>(data: &'a Json, seg: &str) -> Option<&'a Json> {
    match *data {
        Json::Object(ref m) => m.get(seg),
        Json::Array(ref l) => seg.parse::<usize>().ok().and_then(|idx| l.get(idx)),
        _ => None,
    }
}

/// Walk `segs` down from `start`. A `this` segment that names nothing stays
/// on the current value. Segments actually descended are appended to
/// `trail`.
fn walk<'a>(
    start: &'a Json,
    segs: &[String],
    mut trail: Option<&mut Vec<String>>,
) -> Option<&'a Json> {
    let mut data = start;
    for p in segs {
        match child_value(data, p) {
            Some(v) => {
                data = v;
                if let Some(t) = trail.as_mut() {
                    t.push(p.clone());
                }
            }
            None if p == "this" => {}
            None => return None,
        }
    }
    Some(data)
}

impl Context {
    /// Create a context with null data
    pub fn null() -> Context {
        Context { data: Json::Null }
    }

    /// Create a context with given data
    pub fn wraps<T: Serialize>(e: T) -> Result<Context, RenderError> {
        to_value(e)
            .map_err(RenderError::from)
            .map(|d| Context { data: d })
    }

    /// Walk `path` from the root of this context.
    ///
    /// Object segments are looked up by key, array segments by index. The
    /// first miss yields `None`. A `this` segment stays on the current value
    /// unless that value is an object with a `this` key of its own.
    pub fn navigate(&self, path: &Path) -> Option<&Json> {
        walk(&self.data, path.segs(), None)
    }

    /// Parse and navigate a dotted path in one go.
    pub fn lookup(&self, path: &str) -> Option<&Json> {
        self.navigate(&Path::parse(path))
    }

    fn value_at(&self, base_path: &[String]) -> Option<&Json> {
        base_path
            .iter()
            .try_fold(&self.data, |data, seg| child_value(data, seg))
    }

    fn scoped<'a>(
        &'a self,
        blocks: &[BlockContext],
        path: &Path,
        mut trail: Option<&mut Vec<String>>,
    ) -> Option<&'a Json> {
        let segs = path.segs();
        for block in blocks.iter().rev() {
            let item = match self.value_at(block.base_path()) {
                Some(item) => item,
                None => continue,
            };
            // the first segment decides which scope a path belongs to
            let owned = match segs.first() {
                None => true,
                Some(first) if first == "this" => true,
                Some(first) => item
                    .as_object()
                    .map(|m| m.contains_key(first))
                    .unwrap_or(false),
            };
            if owned {
                if let Some(t) = trail.as_mut() {
                    t.extend_from_slice(block.base_path());
                }
                return walk(item, segs, trail);
            }
        }
        walk(&self.data, segs, trail)
    }

    /// Look `path` up inside nested `{{#each}}` scopes, innermost first.
    ///
    /// The fields of an object item shadow those of enclosing items and of
    /// the root, and `this` names the item itself.
    pub fn navigate_in(&self, blocks: &[BlockContext], path: &Path) -> Option<&Json> {
        self.scoped(blocks, path, None)
    }

    /// Like `navigate_in`, also returning where the value lives in the data.
    pub(crate) fn resolve_in(
        &self,
        blocks: &[BlockContext],
        path: &Path,
    ) -> Option<(Vec<String>, &Json)> {
        let mut trail = Vec::new();
        let value = self.scoped(blocks, path, Some(&mut trail))?;
        Some((trail, value))
    }

    pub fn data(&self) -> &Json {
        &self.data
    }
}

impl From<Json> for Context {
    fn from(data: Json) -> Context {
        Context { data }
    }
}

#[cfg(test)]
mod test {
    use super::{BlockContext, Context};
    use crate::json::path::Path;
    use crate::json::value::JsonRender;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Serialize)]
    struct Address {
        city: String,
        country: String,
    }

    #[derive(Serialize)]
    struct Person {
        name: String,
        age: i16,
        addr: Address,
        titles: Vec<String>,
    }

    fn person() -> Person {
        Person {
            name: "Ning Sun".to_string(),
            age: 27,
            addr: Address {
                city: "Beijing".to_string(),
                country: "China".to_string(),
            },
            titles: vec!["programmer".to_string(), "cartographier".to_string()],
        }
    }

    fn block(segs: &[&str]) -> BlockContext {
        BlockContext::new(segs.iter().map(|s| s.to_string()).collect())
    }

    fn render_in(ctx: &Context, blocks: &[BlockContext], path: &str) -> Option<String> {
        ctx.navigate_in(blocks, &Path::parse(path))
            .map(JsonRender::render)
    }

    #[test]
    fn test_navigation() {
        let ctx = Context::wraps(&person()).unwrap();
        assert_eq!(ctx.lookup("name").unwrap().render(), "Ning Sun");
        assert_eq!(ctx.lookup("addr.country").unwrap().render(), "China");
        assert_eq!(ctx.lookup("titles.0").unwrap().render(), "programmer");
        assert_eq!(ctx.lookup("age").unwrap().render(), "27");
    }

    #[test]
    fn test_missing_keys_short_circuit() {
        let ctx = Context::wraps(&person()).unwrap();
        assert_eq!(ctx.lookup("nope"), None);
        assert_eq!(ctx.lookup("addr.street"), None);
        assert_eq!(ctx.lookup("addr.city.length"), None);
        assert_eq!(ctx.lookup("titles.9"), None);
        assert_eq!(ctx.lookup("titles.first"), None);
        assert_eq!(ctx.lookup("name.first.second"), None);
    }

    #[test]
    fn test_this() {
        let ctx = Context::wraps(json!({"this": "hello", "age": 5})).unwrap();
        assert_eq!(ctx.lookup("this").unwrap().render(), "hello");

        let ctx = Context::wraps(json!({"age": 4})).unwrap();
        assert_eq!(ctx.lookup("this").unwrap().render(), "[object]");
        assert_eq!(ctx.lookup("this.age").unwrap().render(), "4");

        let ctx = Context::wraps("plain").unwrap();
        assert_eq!(ctx.lookup("this").unwrap().render(), "plain");
        assert_eq!(ctx.lookup("").unwrap().render(), "plain");
    }

    #[test]
    fn test_block_shadows_parent() {
        let ctx = Context::wraps(json!({
            "outer": "O",
            "name": "root",
            "items": [{"name": "a"}, {"name": "b", "outer": "B"}, "tag"]
        }))
        .unwrap();

        let first = [block(&["items", "0"])];
        assert_eq!(render_in(&ctx, &first, "name").unwrap(), "a");
        assert_eq!(render_in(&ctx, &first, "outer").unwrap(), "O");

        let second = [block(&["items", "1"])];
        assert_eq!(render_in(&ctx, &second, "outer").unwrap(), "B");

        let scalar = [block(&["items", "2"])];
        assert_eq!(render_in(&ctx, &scalar, "this").unwrap(), "tag");
        assert_eq!(render_in(&ctx, &scalar, "name").unwrap(), "root");
        assert_eq!(render_in(&ctx, &scalar, "missing"), None);

        // no blocks is plain navigation
        assert_eq!(render_in(&ctx, &[], "this.name").unwrap(), "root");
    }

    #[test]
    fn test_shadowing_is_decided_by_first_segment() {
        let ctx = Context::wraps(json!({
            "user": {"name": "root", "mail": "r@x"},
            "items": [{"user": {"name": "a"}}]
        }))
        .unwrap();
        let blocks = [block(&["items", "0"])];
        assert_eq!(render_in(&ctx, &blocks, "user.name").unwrap(), "a");
        // the item owns `user`, so the root's mail is not reached
        assert_eq!(render_in(&ctx, &blocks, "user.mail"), None);
    }

    #[test]
    fn test_nested_blocks() {
        let ctx = Context::wraps(json!({
            "title": "T",
            "groups": {"g1": {"name": "g1", "members": [{"id": 7}]}}
        }))
        .unwrap();
        let blocks = [
            block(&["groups", "g1"]),
            block(&["groups", "g1", "members", "0"]),
        ];
        assert_eq!(render_in(&ctx, &blocks, "id").unwrap(), "7");
        assert_eq!(render_in(&ctx, &blocks, "name").unwrap(), "g1");
        assert_eq!(render_in(&ctx, &blocks, "title").unwrap(), "T");
    }

    #[test]
    fn test_resolve_in_reports_location() {
        let ctx = Context::wraps(json!({
            "groups": [{"members": ["x", "y"]}],
            "rows": [[1, 2]]
        }))
        .unwrap();

        let (at, value) = ctx.resolve_in(&[], &Path::parse("groups")).unwrap();
        assert_eq!(at, vec!["groups".to_owned()]);
        assert!(value.is_array());

        let blocks = [block(&["groups", "0"])];
        let (at, _) = ctx.resolve_in(&blocks, &Path::parse("members")).unwrap();
        assert_eq!(at, vec!["groups", "0", "members"]);

        let blocks = [block(&["rows", "0"])];
        let (at, value) = ctx.resolve_in(&blocks, &Path::parse("this")).unwrap();
        assert_eq!(at, vec!["rows", "0"]);
        assert_eq!(value, &json!([1, 2]));

        assert!(ctx.resolve_in(&blocks, &Path::parse("nope")).is_none());
    }

    use serde::ser::Error as SerdeError;
    use serde::Serializer;

    struct UnserializableType {}

    impl Serialize for UnserializableType {
        fn serialize<S>(&self, _: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            Err(SerdeError::custom("test"))
        }
    }

    #[test]
    fn test_serialize_error() {
        let d = UnserializableType {};
        assert!(Context::wraps(&d).is_err());
    }
}
